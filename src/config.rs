use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::StoreError;
use crate::session::{SessionConfig, TestMode};
use crate::words::WordOptions;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: TestMode,
    pub duration_secs: u32,
    pub word_count: usize,
    pub punctuation: bool,
    pub numbers: bool,
    pub ghost: bool,
    pub user_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: TestMode::Time,
            duration_secs: 30,
            word_count: 25,
            punctuation: false,
            numbers: false,
            ghost: true,
            user_id: "local".to_string(),
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        match self.mode {
            TestMode::Time => SessionConfig::time(self.duration_secs.max(1)),
            TestMode::Words => SessionConfig::words(self.word_count.max(1)),
            TestMode::Quote => SessionConfig::quote(0),
            TestMode::Zen => SessionConfig::zen(),
        }
    }

    pub fn word_options(&self) -> WordOptions {
        WordOptions {
            include_punctuation: self.punctuation,
            include_numbers: self.numbers,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("keypace_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults.
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|e| {
                log::warn!("ignoring malformed config at {}: {e}", self.path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            mode: TestMode::Words,
            duration_secs: 60,
            word_count: 50,
            punctuation: true,
            numbers: true,
            ghost: false,
            user_id: "ada".into(),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "mode": "zen" }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.mode, TestMode::Zen);
        assert_eq!(cfg.word_count, 25);
    }

    #[test]
    fn garbage_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn session_config_follows_mode() {
        let mut cfg = Config::default();
        assert_eq!(cfg.session_config(), SessionConfig::time(30));
        cfg.mode = TestMode::Words;
        assert_eq!(cfg.session_config(), SessionConfig::words(25));
        cfg.punctuation = true;
        assert!(cfg.word_options().include_punctuation);
        assert!(!cfg.word_options().include_numbers);
    }
}
