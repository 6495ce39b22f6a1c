use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use keypace::input::action_for_key;
use keypace::runtime::{AppEvent, ChannelEvents, Runner};
use keypace::session::Applied;
use keypace::{Session, SessionConfig};

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

// Drives a session through the runtime loop without a TTY, the same way
// the binary does, and checks it finishes on the final character.
#[test]
fn headless_typing_flow_completes() {
    let words = vec!["hi".to_string(), "yo".to_string()];
    let mut session = Session::new(SessionConfig::words(2), words);

    let (tx, rx) = mpsc::channel();
    let mut runner = Runner::new(ChannelEvents::new(rx), Duration::from_millis(5));
    for c in ['h', 'i', ' ', 'y', 'o'] {
        tx.send(key(c)).unwrap();
    }

    let mut finished = false;
    for _ in 0..100u32 {
        let now = Instant::now();
        match runner.step() {
            AppEvent::Tick => {
                if session.tick_at(now) {
                    finished = true;
                    break;
                }
            }
            AppEvent::Resize => {}
            AppEvent::Key(ev) => {
                let Some(action) = action_for_key(ev) else {
                    continue;
                };
                let applied = session.apply_at(action, now);
                if applied == Applied::FinishRequested || session.is_complete_at(now) {
                    finished = true;
                    break;
                }
            }
        }
    }

    assert!(finished, "session should complete on the last character");
    assert_eq!(session.cursor(), (1, 2));
    assert_eq!(session.counters().correct, 4);
    assert_eq!(session.counters().errors(), 0);
}

#[test]
fn headless_timed_flow_ends_on_ticks() {
    let mut session = Session::new(SessionConfig::time(1), vec!["word".to_string(); 20]);
    let (tx, rx) = mpsc::channel();
    let mut runner = Runner::new(ChannelEvents::new(rx), Duration::from_millis(10));
    tx.send(key('w')).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut done = false;
    while Instant::now() < deadline {
        let now = Instant::now();
        match runner.step() {
            AppEvent::Key(ev) => {
                if let Some(action) = action_for_key(ev) {
                    session.apply_at(action, now);
                }
            }
            AppEvent::Tick => {
                if session.tick_at(now) {
                    done = true;
                    break;
                }
            }
            AppEvent::Resize => {}
        }
    }

    assert!(done, "a one second test should end by the deadline");
    assert_eq!(session.samples().len(), 1);
    assert_eq!(session.samples()[0].t, 1.0);
}

// Wires race progress into the same loop: each tick publishes the latest
// progress, and the other end folds it into a roster.
#[test]
fn headless_race_progress_reaches_roster() {
    use keypace::race::{ProgressBroadcaster, ProgressUpdate, Roster, RosterEntry};

    let mut session = Session::new(SessionConfig::words(2), vec!["hi".to_string(); 2]);
    let (tx, rx) = mpsc::channel();
    let mut runner = Runner::new(ChannelEvents::new(rx), Duration::from_millis(5));
    let (progress_tx, progress_rx) = mpsc::channel::<ProgressUpdate>();
    let mut broadcaster = ProgressBroadcaster::new(progress_tx);

    for c in ['h', 'i', ' ', 'h'] {
        tx.send(key(c)).unwrap();
    }
    let mut ticks = 0;
    while ticks < 5 {
        let now = Instant::now();
        match runner.step() {
            AppEvent::Key(ev) => {
                if let Some(action) = action_for_key(ev) {
                    session.apply_at(action, now);
                }
            }
            AppEvent::Tick => {
                session.tick_at(now);
                broadcaster.on_tick(&session, now);
                ticks += 1;
            }
            AppEvent::Resize => {}
        }
    }

    let latest = progress_rx.try_iter().last().expect("at least one update");
    assert_eq!(latest.progress_percent, 75);
    assert_eq!(broadcaster.last_sent(), Some(latest));

    let mut roster = Roster::new();
    roster.apply(RosterEntry {
        user_id: "me".to_string(),
        progress: latest.progress_percent,
        wpm: latest.wpm,
        finished_at: None,
    });
    assert_eq!(roster.get("me").map(|e| e.progress), Some(75));
}
