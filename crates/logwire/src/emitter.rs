//! Agent-side record emission.
//!
//! The emitter is the admission-control point of the whole pipeline: a
//! record below the agent's current filter threshold is dropped before any
//! formatting or I/O. Everything admitted is formatted as one line and sent
//! as one datagram to the collector.
//!
//! The threshold read and the send are deliberately not atomic with respect
//! to a concurrent threshold update; a record may occasionally go out under
//! a threshold that changes right after the check. That staleness is
//! accepted by the transport contract.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, trace, warn};

use crate::endpoint::Endpoint;
use crate::errors::EmitError;
use crate::level::LogLevel;
use crate::record::LogRecord;

/// What to do when a send fails.
///
/// The reference behavior for this transport was process-fatal sends;
/// `FailFast` keeps that available by surfacing the error for the caller to
/// act on, while `LogAndContinue` (the default) preserves availability of
/// the process being instrumented — one dropped log line is not worth a
/// crash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendPolicy {
    /// Surface the first send error to the caller.
    FailFast,
    /// Log the failure and report success; the record is lost.
    #[default]
    LogAndContinue,
    /// Retry up to `attempts` times with a fixed backoff between tries,
    /// then surface the last error.
    Retry { attempts: u32, backoff: Duration },
}

/// Formats and sends leveled records to the collector.
pub struct Emitter {
    endpoint: Arc<Endpoint<LogLevel>>,
    collector: SocketAddr,
    policy: SendPolicy,
}

impl Emitter {
    #[must_use]
    pub fn new(endpoint: Arc<Endpoint<LogLevel>>, collector: SocketAddr, policy: SendPolicy) -> Self {
        Emitter {
            endpoint,
            collector,
            policy,
        }
    }

    /// Address record traffic is sent to.
    #[must_use]
    pub fn collector_addr(&self) -> SocketAddr {
        self.collector
    }

    /// Emits one record, unless its level is below the current threshold.
    ///
    /// The datagram goes out under the endpoint's state mutex, serialized
    /// with threshold updates applied by the receiver task.
    pub async fn emit(
        &self,
        level: LogLevel,
        program: &str,
        function: &str,
        line: u32,
        message: &str,
    ) -> Result<(), EmitError> {
        {
            let threshold = self.endpoint.state().lock().await;
            if level < *threshold {
                trace!("dropping {} record below threshold {}", level, *threshold);
                return Ok(());
            }
        }

        let record = LogRecord::now(level, program, function, line, message);
        self.send(record.format_line().as_bytes()).await
    }

    async fn send(&self, payload: &[u8]) -> Result<(), EmitError> {
        match self.policy {
            SendPolicy::FailFast => {
                self.endpoint
                    .send_to(payload, self.collector)
                    .await
                    .map_err(|source| EmitError::Send {
                        target: self.collector,
                        source,
                    })?;
                Ok(())
            }
            SendPolicy::LogAndContinue => {
                if let Err(e) = self.endpoint.send_to(payload, self.collector).await {
                    error!("failed to send record to {}: {}", self.collector, e);
                }
                Ok(())
            }
            SendPolicy::Retry { attempts, backoff } => {
                let attempts = attempts.max(1);
                let mut attempt = 0;
                loop {
                    attempt += 1;
                    match self.endpoint.send_to(payload, self.collector).await {
                        Ok(_) => return Ok(()),
                        Err(e) => {
                            warn!(
                                "send to {} failed (attempt {}/{}): {}",
                                self.collector, attempt, attempts, e
                            );
                            if attempt >= attempts {
                                return Err(EmitError::RetriesExhausted {
                                    target: self.collector,
                                    attempts,
                                    source: e,
                                });
                            }
                            sleep(backoff).await;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointConfig;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    async fn emitter_with_threshold(
        threshold: LogLevel,
    ) -> (Emitter, UdpSocket) {
        let collector_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let endpoint = Arc::new(
            Endpoint::bind(&EndpointConfig::new("127.0.0.1", 0), threshold)
                .await
                .unwrap(),
        );
        let emitter = Emitter::new(
            endpoint,
            collector_socket.local_addr().unwrap(),
            SendPolicy::default(),
        );
        (emitter, collector_socket)
    }

    #[tokio::test]
    async fn test_below_threshold_sends_nothing() {
        let (emitter, collector) = emitter_with_threshold(LogLevel::Warning).await;

        emitter
            .emit(LogLevel::Debug, "app", "main", 10, "hello")
            .await
            .unwrap();

        let mut buf = [0u8; 64];
        let received = timeout(Duration::from_millis(300), collector.recv_from(&mut buf)).await;
        assert!(received.is_err(), "no datagram should have been sent");
    }

    #[tokio::test]
    async fn test_at_or_above_threshold_sends_one_matching_datagram() {
        let (emitter, collector) = emitter_with_threshold(LogLevel::Warning).await;

        emitter
            .emit(LogLevel::Error, "app", "main", 11, "boom")
            .await
            .unwrap();

        let mut buf = [0u8; crate::MAX_DATAGRAM_SIZE];
        let (len, _) = timeout(Duration::from_secs(5), collector.recv_from(&mut buf))
            .await
            .expect("datagram never arrived")
            .unwrap();

        let text = std::str::from_utf8(&buf[..len]).unwrap();
        let record = LogRecord::parse(text).unwrap();
        assert_eq!(record.level, LogLevel::Error);
        assert_eq!(record.program, "app");
        assert_eq!(record.function, "main");
        assert_eq!(record.line, 11);
        assert_eq!(record.message, "boom");
        assert!(text.ends_with("ERROR app: main: 11 boom\n"));
    }

    #[tokio::test]
    async fn test_equal_level_is_admitted() {
        let (emitter, collector) = emitter_with_threshold(LogLevel::Critical).await;

        emitter
            .emit(LogLevel::Critical, "app", "worker", 42, "down")
            .await
            .unwrap();

        let mut buf = [0u8; crate::MAX_DATAGRAM_SIZE];
        let (len, _) = timeout(Duration::from_secs(5), collector.recv_from(&mut buf))
            .await
            .expect("datagram never arrived")
            .unwrap();
        assert!(std::str::from_utf8(&buf[..len]).unwrap().contains("CRITICAL"));
    }
}
