//! User commands and the line parser that produces them.

use regex::Regex;

use crate::{
    alarm::{AlarmId, MAX_MESSAGE_LEN},
    error::{AlarmError, ParseError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartAlarm {
        id: AlarmId,
        duration_secs: u32,
        message: String,
    },
    ChangeAlarm {
        id: AlarmId,
        duration_secs: u32,
        message: String,
    },
    CancelAlarm(AlarmId),
    SuspendAlarm(AlarmId),
    ReactivateAlarm(AlarmId),
    ViewAlarms,
}

impl Command {
    /// checks the limits the parser enforces, for commands built by hand
    pub fn validate(&self) -> Result<(), AlarmError> {
        match self {
            Self::StartAlarm { message, .. } | Self::ChangeAlarm { message, .. }
                if message.len() > MAX_MESSAGE_LEN =>
            {
                Err(AlarmError::MessageTooLong { len: message.len() })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Form {
    Start,
    Change,
    Cancel,
    Suspend,
    Reactivate,
    View,
}

/// Turns lines like `Start_Alarm(3): 10 tea is ready` into [`Command`]s.
#[derive(Debug)]
pub struct CommandParser {
    forms: Vec<(Form, Regex)>,
}

impl CommandParser {
    pub fn new() -> Result<Self, regex::Error> {
        let forms = [
            (Form::Start, r"^Start_Alarm\(([0-9]+)\):\s([0-9]+)\s(.*)$"),
            (Form::Change, r"^Change_Alarm\(([0-9]+)\):\s([0-9]+)\s(.*)$"),
            (Form::Cancel, r"^Cancel_Alarm\(([0-9]+)\)$"),
            (Form::Suspend, r"^Suspend_Alarm\(([0-9]+)\)$"),
            (Form::Reactivate, r"^Reactivate_Alarm\(([0-9]+)\)$"),
            (Form::View, r"^View_Alarms$"),
        ]
        .into_iter()
        .map(|(form, pattern)| Ok((form, Regex::new(pattern)?)))
        .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { forms })
    }

    /// Parses one input line, the trailing newline and leading blanks are
    /// ignored.
    pub fn parse(&self, line: &str) -> Result<Command, ParseError> {
        let line = line.trim_end_matches(['\n', '\r']).trim_start();
        let (form, captures) = self
            .forms
            .iter()
            .find_map(|(form, regex)| regex.captures(line).map(|caps| (*form, caps)))
            .ok_or(ParseError::Unrecognized)?;

        let number = |index: usize| -> Result<u32, ParseError> {
            let text = captures.get(index).map_or("", |m| m.as_str());
            text.parse()
                .map_err(|_| ParseError::NumberOutOfRange(text.to_string()))
        };
        let message = || -> Result<String, ParseError> {
            let text = captures.get(3).map_or("", |m| m.as_str());
            if text.len() > MAX_MESSAGE_LEN {
                return Err(ParseError::MessageTooLong { len: text.len() });
            }
            Ok(text.to_string())
        };

        Ok(match form {
            Form::Start => Command::StartAlarm {
                id: number(1)?,
                duration_secs: number(2)?,
                message: message()?,
            },
            Form::Change => Command::ChangeAlarm {
                id: number(1)?,
                duration_secs: number(2)?,
                message: message()?,
            },
            Form::Cancel => Command::CancelAlarm(number(1)?),
            Form::Suspend => Command::SuspendAlarm(number(1)?),
            Form::Reactivate => Command::ReactivateAlarm(number(1)?),
            Form::View => Command::ViewAlarms,
        })
    }
}
