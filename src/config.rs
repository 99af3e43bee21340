use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::error::ConfigError;
use crate::lang::Difficulty;
use crate::session::SessionConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub number_of_words: usize,
    /// Hand-edited files may say anything here; unknown names load as medium.
    #[serde(deserialize_with = "lenient_difficulty")]
    pub difficulty: Difficulty,
    /// Seconds; 0 disables the deadline.
    pub time_limit_secs: u64,
    pub show_wpm: bool,
    pub show_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            number_of_words: 20,
            difficulty: Difficulty::Medium,
            time_limit_secs: 60,
            show_wpm: true,
            show_errors: true,
        }
    }
}

fn lenient_difficulty<'de, D: Deserializer<'de>>(d: D) -> Result<Difficulty, D::Error> {
    let name = String::deserialize(d)?;
    Ok(Difficulty::parse_lenient(&name))
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            time_limit: match self.time_limit_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typerace_config.json"));
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
    /// Missing or unreadable files yield the defaults.
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("ignoring invalid config {}: {}", self.path.display(), e);
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}
