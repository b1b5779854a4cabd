//! Datagram dispatch: what a role does with each received payload.
//!
//! The receiver loop is polymorphic over a [`DatagramHandler`]; the role
//! picks the variant at construction. Agents install
//! [`LevelCommandHandler`], collectors install [`LogRecordHandler`]. The
//! handler runs while the endpoint's state mutex is held, so every
//! threshold update and every sink append is serialized with sends on the
//! same endpoint.

use std::net::SocketAddr;

use async_trait::async_trait;
use tracing::{error, info, trace};

use crate::command::LevelCommand;
use crate::errors::ParseError;
use crate::level::LogLevel;
use crate::sink::DurableSink;

/// One received datagram's worth of work, applied to the role's shared
/// state `S` under the endpoint mutex.
#[async_trait]
pub trait DatagramHandler<S>: Send + Sync + 'static {
    async fn handle(&self, payload: &[u8], peer: SocketAddr, state: &mut S);
}

/// Agent-side handler: applies in-band level commands to the filter
/// threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelCommandHandler;

#[async_trait]
impl DatagramHandler<LogLevel> for LevelCommandHandler {
    async fn handle(&self, payload: &[u8], peer: SocketAddr, threshold: &mut LogLevel) {
        match LevelCommand::decode(payload) {
            Ok(command) => {
                *threshold = command.level;
                info!("log level updated to {} by {}", command.level, peer);
            }
            Err(ParseError::LevelOutOfRange(value)) => {
                error!(
                    "received invalid log level {} from {}; keeping {}",
                    value, peer, threshold
                );
            }
            // Record and command traffic may share a port; a payload that
            // is not a command is expected, not a protocol error.
            Err(_) => trace!("ignoring non-command payload from {}", peer),
        }
    }
}

/// Collector-side handler: appends each record payload to the durable sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRecordHandler;

#[async_trait]
impl DatagramHandler<DurableSink> for LogRecordHandler {
    async fn handle(&self, payload: &[u8], peer: SocketAddr, sink: &mut DurableSink) {
        if let Err(e) = sink.append(payload).await {
            error!("failed to persist record from {}: {}", peer, e);
        } else {
            trace!("persisted {} bytes from {}", payload.len(), peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tracing_test::traced_test;

    fn peer() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 40000)
    }

    #[tokio::test]
    async fn test_valid_command_replaces_threshold() {
        let mut threshold = LogLevel::Debug;
        LevelCommandHandler
            .handle(b"Set Log Level=3", peer(), &mut threshold)
            .await;
        assert_eq!(threshold, LogLevel::Critical);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_out_of_range_command_keeps_threshold_and_reports() {
        let mut threshold = LogLevel::Warning;
        LevelCommandHandler
            .handle(b"Set Log Level=7", peer(), &mut threshold)
            .await;
        assert_eq!(threshold, LogLevel::Warning);
        assert!(logs_contain("received invalid log level 7"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_non_command_payload_silently_ignored() {
        let mut threshold = LogLevel::Error;
        LevelCommandHandler
            .handle(b"2024-05-17 13:04:05 ERROR app: main: 11 boom\n", peer(), &mut threshold)
            .await;
        assert_eq!(threshold, LogLevel::Error);
        assert!(!logs_contain("invalid log level"));
    }

    #[tokio::test]
    async fn test_record_handler_appends_to_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DurableSink::open(dir.path().join("collected.log"))
            .await
            .unwrap();

        LogRecordHandler
            .handle(b"2024-05-17 13:04:05 ERROR app: main: 11 boom\n", peer(), &mut sink)
            .await;

        assert_eq!(
            sink.dump().await.unwrap(),
            "2024-05-17 13:04:05 ERROR app: main: 11 boom\n"
        );
    }
}
