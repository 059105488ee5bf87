#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! An alarm coordinator: the main thread takes commands and keeps the alarm
//! list, display threads holding up to two alarms each print them until they
//! expire.

pub mod alarm;
pub mod command;
/// events for the display threads and notices for the user
pub mod communication;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pool;
pub mod registry;
pub mod worker;

pub use alarm::{Alarm, AlarmId, AlarmStatus};
pub use command::{Command, CommandParser};
pub use communication::Notice;
pub use config::{Config, Timing};
pub use coordinator::{Context, Coordinator};
pub use error::{AlarmError, ConfigError, ParseError};
