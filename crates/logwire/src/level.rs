//! Log level type shared by both roles.
//!
//! Levels are ordered from most to least verbose and travel on the wire as a
//! small integer in `[0, 3]`. An agent transmits a record only if its level
//! is at or above the agent's current filter threshold.

use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;

/// Severity of a log record, and the unit of the filter threshold.
///
/// The discriminants are the wire encoding: `Set Log Level=2` selects
/// [`LogLevel::Error`]. Ordering follows the discriminants, so
/// `LogLevel::Debug < LogLevel::Critical`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Lowest severity; the default threshold, admitting everything.
    #[default]
    Debug = 0,
    Warning = 1,
    Error = 2,
    Critical = 3,
}

impl LogLevel {
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Debug,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Wire name, as it appears in a formatted record line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Wire integer in `[0, 3]`.
    #[must_use]
    pub fn as_wire(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, ParseError> {
        match value {
            0 => Ok(LogLevel::Debug),
            1 => Ok(LogLevel::Warning),
            2 => Ok(LogLevel::Error),
            3 => Ok(LogLevel::Critical),
            other => Err(ParseError::LevelOutOfRange(i64::from(other))),
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(ParseError::UnknownLevelName(other.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
