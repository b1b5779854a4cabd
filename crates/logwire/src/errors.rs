//! Error taxonomy for the transport.
//!
//! Three concerns, three types: [`TransportError`] covers resource failures
//! that are fatal at startup (socket create/bind), [`ParseError`] covers
//! recoverable protocol failures on received datagrams, and [`EmitError`]
//! covers send-path failures whose handling is policy-driven.

use std::net::AddrParseError;

/// Resource errors raised while opening or tearing down an endpoint.
///
/// These are always fatal to the caller: an endpoint that failed to bind
/// cannot fulfill the transport contract, so there is no retry path.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid socket address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        source: AddrParseError,
    },

    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to open durable sink at {path}: {source}")]
    SinkOpen {
        path: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Protocol errors on received payloads. Recovered locally: the triggering
/// datagram is logged (or silently ignored) and has no further effect.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// The payload does not match the level-command shape. Not a protocol
    /// violation: record and command traffic may share a port, so a
    /// non-matching payload is expected and silently ignored.
    #[error("payload is not a level command")]
    NotACommand,

    #[error("log level {0} is outside the valid range [0, 3]")]
    LevelOutOfRange(i64),

    #[error("unknown log level name '{0}'")]
    UnknownLevelName(String),

    #[error("malformed record line: {0}")]
    MalformedRecord(String),
}

/// Send-path failures from the emitter or controller.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("failed to send datagram to {target}: {source}")]
    Send {
        target: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("send to {target} still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        target: std::net::SocketAddr,
        attempts: u32,
        source: std::io::Error,
    },
}
