//! The owned socket/mutex/running-flag bundle underlying both roles.
//!
//! An [`Endpoint`] owns exactly one bound UDP socket for its whole lifetime,
//! a mutex holding the role's shared state (the agent's filter threshold,
//! the collector's durable sink), and a cancellation token standing in for
//! the running flag. The token transitions run→cancelled exactly once;
//! endpoints are never restarted. Sockets and mutexes are not shared across
//! endpoint instances.
//!
//! All sends go through [`Endpoint::send_to`], which holds the state mutex
//! for the duration of the send. The receiver loop takes the same mutex
//! around handler invocations, so threshold updates, sink appends, and sends
//! are all serialized per endpoint.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::TransportError;

/// Local bind address for an endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Host to bind the UDP socket to (e.g. "127.0.0.1").
    pub host: String,
    /// Port to bind to; 0 requests an OS-assigned ephemeral port.
    pub port: u16,
}

impl EndpointConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        EndpointConfig {
            host: host.into(),
            port,
        }
    }
}

/// Parses a `host:port` pair into a socket address, for remote targets
/// configured as separate host and port values.
pub fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let addr = format!("{host}:{port}");
    addr.parse()
        .map_err(|source| TransportError::InvalidAddress { addr, source })
}

/// One datagram endpoint: socket, shared-state mutex, running flag.
///
/// `S` is the role's shared state, guarded by the endpoint's single mutex.
pub struct Endpoint<S> {
    socket: UdpSocket,
    state: Mutex<S>,
    cancel: CancellationToken,
    local_addr: SocketAddr,
}

impl<S> Endpoint<S> {
    /// Creates the socket and binds it to the configured local address.
    ///
    /// Tokio sockets are registered non-blocking; there is no separate flag
    /// to set. Any failure here is fatal to the caller: an unbound endpoint
    /// cannot fulfill the transport contract. A port already in use
    /// surfaces as [`TransportError::Bind`].
    pub async fn bind(config: &EndpointConfig, state: S) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", config.host, config.port);
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = socket.local_addr()?;
        debug!("endpoint bound on {}", local_addr);

        Ok(Endpoint {
            socket,
            state: Mutex::new(state),
            cancel: CancellationToken::new(),
            local_addr,
        })
    }

    /// The address the socket actually bound to. Differs from the config
    /// when port 0 requested an ephemeral port.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The mutex guarding this endpoint's shared state.
    #[must_use]
    pub fn state(&self) -> &Mutex<S> {
        &self.state
    }

    /// The running flag, in cancellation-token form. The receiver loop exits
    /// when this fires.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Flips the running flag. Idempotent: cancelling an already-cancelled
    /// token is a no-op.
    pub fn begin_shutdown(&self) {
        self.cancel.cancel();
    }

    /// Sends one datagram to `target`, holding the state mutex for the
    /// duration of the send.
    pub async fn send_to(&self, payload: &[u8], target: SocketAddr) -> std::io::Result<usize> {
        let _guard = self.state.lock().await;
        self.socket.send_to(payload, target).await
    }

    /// Receives one datagram. Does not take the state mutex; readiness
    /// waiting happens outside any lock.
    pub async fn recv_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let endpoint = Endpoint::bind(&EndpointConfig::new("127.0.0.1", 0), ())
            .await
            .unwrap();
        assert_ne!(endpoint.local_addr().port(), 0);
        assert!(endpoint.is_running());
    }

    #[tokio::test]
    async fn test_bind_port_in_use_is_bind_error() {
        let first = Endpoint::bind(&EndpointConfig::new("127.0.0.1", 0), ())
            .await
            .unwrap();
        let config = EndpointConfig::new("127.0.0.1", first.local_addr().port());
        let second = Endpoint::bind(&config, ()).await;
        assert!(matches!(second, Err(TransportError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_flag_flips_once_and_stays() {
        let endpoint = Endpoint::bind(&EndpointConfig::new("127.0.0.1", 0), ())
            .await
            .unwrap();
        endpoint.begin_shutdown();
        assert!(!endpoint.is_running());
        // second cancel is a no-op, not an error
        endpoint.begin_shutdown();
        assert!(!endpoint.is_running());
    }

    #[test]
    fn test_resolve_addr() {
        assert!(resolve_addr("127.0.0.1", 8080).is_ok());
        assert!(matches!(
            resolve_addr("not-an-ip", 8080),
            Err(TransportError::InvalidAddress { .. })
        ));
    }
}
