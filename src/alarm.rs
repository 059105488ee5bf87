use std::fmt;

use chrono::{DateTime, Duration, Local};

/// longest message (in bytes) an alarm can carry
pub const MAX_MESSAGE_LEN: usize = 127;

pub type AlarmId = u32;

/// lets a keyed collection pull the key out of the value it stores
pub trait GetId<T> {
    fn get_id(&self) -> &T;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlarmStatus {
    #[default]
    Active,
    Suspended,
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
        }
    }
}

/// represents an alarm
/// the expiration time is always `creation_time + duration_secs`,
/// creation time never moves once the alarm exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub id: AlarmId,
    duration_secs: u32,
    message: String,
    pub status: AlarmStatus,
    creation_time: DateTime<Local>,
    expiration_time: DateTime<Local>,
}

impl GetId<AlarmId> for Alarm {
    fn get_id(&self) -> &AlarmId {
        &self.id
    }
}

impl Alarm {
    /// creates an active alarm that starts counting now
    #[must_use]
    pub fn new(id: AlarmId, duration_secs: u32, message: String) -> Self {
        Self::created_at(id, duration_secs, message, Local::now())
    }

    #[must_use]
    pub fn created_at(
        id: AlarmId,
        duration_secs: u32,
        message: String,
        creation_time: DateTime<Local>,
    ) -> Self {
        Self {
            id,
            duration_secs,
            message,
            status: AlarmStatus::Active,
            creation_time,
            expiration_time: creation_time + Duration::seconds(i64::from(duration_secs)),
        }
    }

    /// replaces duration and message, expiration is recomputed from the
    /// original creation time and not from now
    pub fn change(&mut self, duration_secs: u32, message: String) {
        self.duration_secs = duration_secs;
        self.message = message;
        self.expiration_time = self.creation_time + Duration::seconds(i64::from(duration_secs));
    }

    #[must_use]
    pub const fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn creation_time(&self) -> DateTime<Local> {
        self.creation_time
    }

    #[must_use]
    pub const fn expiration_time(&self) -> DateTime<Local> {
        self.expiration_time
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AlarmStatus::Active
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        self.expiration_time <= now
    }
}
