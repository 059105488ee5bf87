//! Error types for the alarm pool

use std::path::PathBuf;

use thiserror::Error;

use crate::alarm::{AlarmId, MAX_MESSAGE_LEN};

/// Errors raised while applying a command to the alarm list
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("Alarm({0}) already exists")]
    DuplicateId(AlarmId),

    #[error("Alarm({0}) is not a valid ID")]
    NotFound(AlarmId),

    #[error("Alarm({0}) is already suspended")]
    AlreadySuspended(AlarmId),

    #[error("message is {len} bytes, at most {MAX_MESSAGE_LEN} are allowed")]
    MessageTooLong { len: usize },

    #[error("couldn't start display thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl AlarmError {
    /// fatal errors leave the process without a way to keep serving alarms
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::WorkerSpawn(_))
    }
}

/// Errors raised by the command line parser
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Bad command")]
    Unrecognized,

    #[error("number {0} is out of range")]
    NumberOutOfRange(String),

    #[error("message is {len} bytes, at most {MAX_MESSAGE_LEN} are allowed")]
    MessageTooLong { len: usize },
}

/// Errors raised while reading or writing the config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("couldn't find a home directory for the config file")]
    NoHomeDir,

    #[error("invalid config: {0}")]
    Invalid(String),
}
