use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const MAX_HEARTBEAT_SECS: u64 = 24 * 60 * 60;
const MAX_WAKE_SLACK_MS: u64 = 60 * 1000;
const MAX_EVENT_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// chrono strftime format used for every timestamp that gets printed
    pub time_format: String,
    pub prompt: String,
    /// how often a display thread prints the alarms it holds
    pub heartbeat_secs: u64,
    /// added to every wake up so an expiry is really in the past when we look
    pub wake_slack_ms: u64,
    /// events nobody claimed are dropped after this long
    pub event_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%Y-%m-%d %H:%M:%S".to_string(),
            prompt: "Alarm > ".to_string(),
            heartbeat_secs: 5,
            wake_slack_ms: 50,
            event_ttl_secs: 30,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&config)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// same as [`Self::load`] but a missing file just means defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, config).map_err(io_err)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = directories::ProjectDirs::from("", "", "alarm_pool")
            .ok_or(ConfigError::NoHomeDir)?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// rejects values that would make the display threads spin or the
    /// printer fail on every line
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat_secs == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_secs must be at least 1".to_string(),
            ));
        }
        for (name, value, max) in [
            ("heartbeat_secs", self.heartbeat_secs, MAX_HEARTBEAT_SECS),
            ("wake_slack_ms", self.wake_slack_ms, MAX_WAKE_SLACK_MS),
            ("event_ttl_secs", self.event_ttl_secs, MAX_EVENT_TTL_SECS),
        ] {
            if value > max {
                return Err(ConfigError::Invalid(format!(
                    "{name} is {value}, at most {max} is allowed"
                )));
            }
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "`{}` is not a valid time format",
                self.time_format
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn timing(&self) -> Timing {
        Timing {
            heartbeat: Duration::from_secs(self.heartbeat_secs),
            wake_slack: Duration::from_millis(self.wake_slack_ms),
            event_ttl: Duration::from_secs(self.event_ttl_secs),
        }
    }
}

/// The wake up cadence of the display threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub heartbeat: Duration,
    pub wake_slack: Duration,
    pub event_ttl: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Config::default().timing()
    }
}
