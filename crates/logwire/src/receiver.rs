//! The background receive loop.
//!
//! One receiver task runs per endpoint, started when the role starts and
//! stopped by the endpoint's cancellation token. The loop waits for socket
//! readiness rather than polling on a fixed sleep; cancellation is observed
//! concurrently with the wait, so shutdown latency does not depend on
//! traffic arriving. A receive error is logged and the loop continues after
//! a fixed backoff — a single spurious datagram or transient socket failure
//! must never bring down the transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, trace};

use crate::endpoint::Endpoint;
use crate::handler::DatagramHandler;
use crate::MAX_DATAGRAM_SIZE;

/// Backoff after a failed receive, so a persistently broken socket cannot
/// spin the loop hot.
const RECV_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// The per-endpoint background receive task.
pub struct Receiver<S, H> {
    endpoint: Arc<Endpoint<S>>,
    handler: H,
}

impl<S, H> Receiver<S, H>
where
    S: Send + 'static,
    H: DatagramHandler<S>,
{
    #[must_use]
    pub fn new(endpoint: Arc<Endpoint<S>>, handler: H) -> Self {
        Receiver { endpoint, handler }
    }

    /// Runs until the endpoint's cancellation token fires.
    ///
    /// The handler is invoked while the endpoint's state mutex is held; the
    /// readiness wait itself happens outside the lock, so foreground sends
    /// are only blocked for the duration of an actual dispatch.
    pub async fn spin(self) {
        let local = self.endpoint.local_addr();
        let cancel = self.endpoint.cancel_token().clone();
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        debug!("receiver loop started on {}", local);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.endpoint.recv_from(&mut buf) => match result {
                    // zero-length reads are "no data", not a dispatch
                    Ok((0, _)) => trace!("empty datagram on {}, ignoring", local),
                    Ok((len, peer)) => {
                        trace!("received {} bytes from {}", len, peer);
                        let mut state = self.endpoint.state().lock().await;
                        self.handler.handle(&buf[..len], peer, &mut state).await;
                    }
                    Err(e) => {
                        error!("receive failed on {}: {}", local, e);
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            () = sleep(RECV_ERROR_BACKOFF) => {}
                        }
                    }
                }
            }
        }

        debug!("receiver loop stopped on {}", local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointConfig;
    use crate::handler::LevelCommandHandler;
    use crate::level::LogLevel;
    use tokio::net::UdpSocket;
    use tokio::time::{timeout, Duration};

    async fn wait_for_level(
        endpoint: &Endpoint<LogLevel>,
        expected: LogLevel,
    ) -> Result<(), tokio::time::error::Elapsed> {
        timeout(Duration::from_secs(5), async {
            loop {
                if *endpoint.state().lock().await == expected {
                    return;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
    }

    #[tokio::test]
    async fn test_spin_dispatches_commands_until_cancelled() {
        let endpoint = Arc::new(
            Endpoint::bind(&EndpointConfig::new("127.0.0.1", 0), LogLevel::Debug)
                .await
                .unwrap(),
        );
        let task = tokio::spawn(Receiver::new(Arc::clone(&endpoint), LevelCommandHandler).spin());

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(b"Set Log Level=2", endpoint.local_addr())
            .await
            .unwrap();

        wait_for_level(&endpoint, LogLevel::Error)
            .await
            .expect("command was never applied");

        endpoint.begin_shutdown();
        timeout(Duration::from_secs(5), task)
            .await
            .expect("receiver did not observe cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_before_any_traffic_exits_promptly() {
        let endpoint = Arc::new(
            Endpoint::bind(&EndpointConfig::new("127.0.0.1", 0), LogLevel::Debug)
                .await
                .unwrap(),
        );
        let task = tokio::spawn(Receiver::new(Arc::clone(&endpoint), LevelCommandHandler).spin());

        endpoint.begin_shutdown();
        timeout(Duration::from_secs(5), task)
            .await
            .expect("receiver did not observe cancellation")
            .unwrap();
    }
}
