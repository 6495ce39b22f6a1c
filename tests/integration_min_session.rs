// Drives the compiled binary through a PTY, covering the real event loop
// and crossterm input handling.
//
// Needs a pseudo terminal, so it is Unix-only and ignored by default:
// `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn zen_session_finishes_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("keypace");
    let cmd = format!("{} --mode zen --no-ghost --user pty-smoke", bin.display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("the quick")?;
    std::thread::sleep(Duration::from_millis(200));

    // first escape finishes the zen test, the second leaves the results screen
    p.send("\x1b")?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("\x1b")?;

    p.expect(Eof)?;
    Ok(())
}

#[test]
fn export_without_tty_writes_csv() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("results.csv");
    assert_cmd::Command::cargo_bin("keypace")?
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .args(["--user", "csv-smoke", "--export"])
        .arg(&out)
        .assert()
        .success();

    let written = std::fs::read_to_string(&out)?;
    assert!(written.is_empty() || written.starts_with("date,"));
    Ok(())
}
