//! The level-command wire entity.
//!
//! A collector pushes a runtime threshold change to an agent as the datagram
//! `Set Log Level=<digit>` with the digit in `[0, 3]`. Commands share the
//! agent's socket with any other traffic, so a payload that does not match
//! the command shape is not a protocol violation; it decodes to
//! [`ParseError::NotACommand`] and callers ignore it silently.

use crate::errors::ParseError;
use crate::level::LogLevel;

const COMMAND_PREFIX: &str = "Set Log Level=";

/// A request to replace an agent's filter threshold. Transient, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelCommand {
    pub level: LogLevel,
}

impl LevelCommand {
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        LevelCommand { level }
    }

    /// Encodes the command as its wire payload.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}{}", COMMAND_PREFIX, self.level.as_wire())
    }

    /// Decodes a datagram payload as a level command.
    ///
    /// Trailing NUL bytes and whitespace are tolerated: the original sender
    /// of this format included the C string terminator in the datagram. A
    /// matching prefix with an out-of-range value is
    /// [`ParseError::LevelOutOfRange`]; anything else is
    /// [`ParseError::NotACommand`].
    pub fn decode(payload: &[u8]) -> Result<LevelCommand, ParseError> {
        let text = std::str::from_utf8(payload).map_err(|_| ParseError::NotACommand)?;
        let text = text.trim_end_matches(['\0', ' ', '\n', '\r', '\t']);
        let value = text
            .strip_prefix(COMMAND_PREFIX)
            .ok_or(ParseError::NotACommand)?;
        let value: i64 = value.parse().map_err(|_| ParseError::NotACommand)?;
        let level = u8::try_from(value)
            .ok()
            .and_then(|v| LogLevel::try_from(v).ok())
            .ok_or(ParseError::LevelOutOfRange(value))?;
        Ok(LevelCommand { level })
    }
}
