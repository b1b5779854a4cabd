//! Collector-side level control.
//!
//! Formats and sends a level-change command to an agent. Delivery is
//! fire-and-forget: no acknowledgement and no retry, so the caller cannot
//! distinguish "delivered but ignored" from "lost in transit".

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::command::LevelCommand;
use crate::endpoint::Endpoint;
use crate::errors::EmitError;
use crate::level::LogLevel;
use crate::sink::DurableSink;

/// Sends level-change commands from the collector's endpoint.
pub struct LevelController {
    endpoint: Arc<Endpoint<DurableSink>>,
}

impl LevelController {
    #[must_use]
    pub fn new(endpoint: Arc<Endpoint<DurableSink>>) -> Self {
        LevelController { endpoint }
    }

    /// Sends one command datagram to `target` under the endpoint mutex.
    ///
    /// Level validity is enforced by the type: an out-of-range integer is
    /// rejected at `LogLevel::try_from`, before a command can exist to send.
    pub async fn set_level(&self, level: LogLevel, target: SocketAddr) -> Result<(), EmitError> {
        let payload = LevelCommand::new(level).encode();
        self.endpoint
            .send_to(payload.as_bytes(), target)
            .await
            .map_err(|source| EmitError::Send { target, source })?;
        info!("sent level command {} to {}", level, target);
        Ok(())
    }
}
