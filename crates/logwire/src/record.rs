//! The log-record wire entity and its line format.
//!
//! A record travels as one UTF-8 datagram holding a single line:
//!
//! ```text
//! <YYYY-MM-DD HH:MM:SS> <LEVELNAME> <program>: <function>: <line> <message>\n
//! ```
//!
//! Formatting truncates rather than rejects: a line longer than
//! [`MAX_DATAGRAM_SIZE`] bytes is cut at a UTF-8 boundary, keeping the
//! trailing newline. The collector persists received bytes as-is; parsing is
//! only needed by tests and tooling that read the sink back.

use chrono::{Local, NaiveDateTime};

use crate::errors::ParseError;
use crate::level::LogLevel;
use crate::MAX_DATAGRAM_SIZE;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIMESTAMP_LEN: usize = 19;

/// One leveled log record. Immutable once constructed; duplicates are not
/// deduplicated, a record has no identity beyond its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Local wall-clock time at emission, second precision.
    pub timestamp: NaiveDateTime,
    pub level: LogLevel,
    /// Name of the emitting program.
    pub program: String,
    /// Name of the emitting function.
    pub function: String,
    /// Source line number at the emission site.
    pub line: u32,
    pub message: String,
}

impl LogRecord {
    /// Builds a record stamped with the current local time.
    #[must_use]
    pub fn now(
        level: LogLevel,
        program: impl Into<String>,
        function: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        LogRecord {
            timestamp: Local::now().naive_local(),
            level,
            program: program.into(),
            function: function.into(),
            line,
            message: message.into(),
        }
    }

    /// Formats the record as its single-line wire representation, truncated
    /// to [`MAX_DATAGRAM_SIZE`] bytes with the trailing newline preserved.
    #[must_use]
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "{} {} {}: {}: {} {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.program,
            self.function,
            self.line,
            self.message,
        );
        if line.len() >= MAX_DATAGRAM_SIZE {
            let mut cut = MAX_DATAGRAM_SIZE - 1;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
        }
        line.push('\n');
        line
    }

    /// Parses one formatted line back into a record.
    ///
    /// Lossless for program/function/message free of embedded newlines,
    /// provided program and function do not themselves contain the `": "`
    /// field separator.
    pub fn parse(input: &str) -> Result<LogRecord, ParseError> {
        let line = input.strip_suffix('\n').unwrap_or(input);
        let malformed = || ParseError::MalformedRecord(line.to_string());

        // get() rather than split_at(): arbitrary input may put a multi-byte
        // code point across the timestamp boundary
        let ts = line.get(..TIMESTAMP_LEN).ok_or_else(malformed)?;
        let rest = &line[TIMESTAMP_LEN..];
        let timestamp = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
            .map_err(|_| malformed())?;

        let rest = rest.strip_prefix(' ').ok_or_else(malformed)?;
        let (level_name, rest) = rest.split_once(' ').ok_or_else(malformed)?;
        let level: LogLevel = level_name.parse()?;

        let (program, rest) = rest.split_once(": ").ok_or_else(malformed)?;
        let (function, rest) = rest.split_once(": ").ok_or_else(malformed)?;
        let (line_no, message) = match rest.split_once(' ') {
            Some((n, msg)) => (n, msg),
            None => (rest, ""),
        };
        let line_no: u32 = line_no.parse().map_err(|_| malformed())?;

        Ok(LogRecord {
            timestamp,
            level,
            program: program.to_string(),
            function: function.to_string(),
            line: line_no,
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn fixed_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(13, 4, 5)
            .unwrap()
    }

    fn sample(level: LogLevel, message: &str) -> LogRecord {
        LogRecord {
            timestamp: fixed_timestamp(),
            level,
            program: "app".to_string(),
            function: "main".to_string(),
            line: 11,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_format_matches_wire_shape() {
        let record = sample(LogLevel::Error, "boom");
        assert_eq!(
            record.format_line(),
            "2024-05-17 13:04:05 ERROR app: main: 11 boom\n"
        );
    }

    #[test]
    fn test_parse_round_trip() {
        let record = sample(LogLevel::Warning, "disk is getting full");
        let parsed = LogRecord::parse(&record.format_line()).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_long_message_truncated_not_rejected() {
        let record = sample(LogLevel::Debug, &"x".repeat(4096));
        let line = record.format_line();
        assert_eq!(line.len(), MAX_DATAGRAM_SIZE);
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let record = sample(LogLevel::Debug, &"é".repeat(2048));
        let line = record.format_line();
        assert!(line.len() <= MAX_DATAGRAM_SIZE);
        assert!(line.ends_with('\n'));
        // would panic in from_utf8 if we cut inside a code point
        assert!(std::str::from_utf8(line.as_bytes()).is_ok());
    }

    #[test]
    fn test_empty_message_parses() {
        let parsed = LogRecord::parse("2024-05-17 13:04:05 DEBUG app: main: 7 \n").unwrap();
        assert_eq!(parsed.message, "");
        assert_eq!(parsed.line, 7);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            LogRecord::parse("Set Log Level=2"),
            Err(ParseError::MalformedRecord(_))
        ));
        assert!(LogRecord::parse("").is_err());
        assert!(LogRecord::parse("2024-05-17 13:04:05 NOISE app: main: 1 x").is_err());
        // multi-byte code point straddling the timestamp boundary
        assert!(LogRecord::parse(&"é".repeat(30)).is_err());
    }

    proptest! {
        #[test]
        fn prop_round_trip_is_lossless(
            program in "[a-zA-Z][a-zA-Z0-9_.-]{0,20}",
            function in "[a-zA-Z][a-zA-Z0-9_]{0,20}",
            line in 0u32..100_000,
            message in "[^\n\r]{0,200}",
            level_idx in 0usize..4,
        ) {
            let record = LogRecord {
                timestamp: fixed_timestamp(),
                level: LogLevel::ALL[level_idx],
                program,
                function,
                line,
                message,
            };
            let parsed = LogRecord::parse(&record.format_line()).unwrap();
            prop_assert_eq!(parsed, record);
        }
    }
}
