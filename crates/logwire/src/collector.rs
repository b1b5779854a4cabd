//! The collector role: receives and persists records, issues level
//! commands.
//!
//! The collector owns one endpoint whose shared state is the durable sink,
//! so the receiver task's appends, the console's dumps, and the
//! controller's sends all contend on the same mutex. Shutdown follows the
//! same discipline as the agent: cancel, join the receiver task, then drop.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::controller::LevelController;
use crate::endpoint::{Endpoint, EndpointConfig};
use crate::errors::{EmitError, TransportError};
use crate::handler::LogRecordHandler;
use crate::level::LogLevel;
use crate::receiver::Receiver;
use crate::sink::DurableSink;
use crate::DEFAULT_COLLECTOR_PORT;

/// Configuration for the collector role.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Local address to bind for incoming record traffic.
    pub bind: EndpointConfig,
    /// Path of the append-only sink file.
    pub sink_path: PathBuf,
}

impl CollectorConfig {
    /// Defaults: bind 127.0.0.1:8080.
    #[must_use]
    pub fn new(sink_path: impl Into<PathBuf>) -> Self {
        CollectorConfig {
            bind: EndpointConfig::new("127.0.0.1", DEFAULT_COLLECTOR_PORT),
            sink_path: sink_path.into(),
        }
    }
}

/// A running collector: endpoint with its sink, level controller, and the
/// background receiver task.
pub struct Collector {
    endpoint: Arc<Endpoint<DurableSink>>,
    controller: LevelController,
    receiver_task: Option<JoinHandle<()>>,
}

impl Collector {
    /// Opens the sink, binds the collector endpoint, and starts the
    /// receiver task.
    pub async fn start(config: &CollectorConfig) -> Result<Collector, TransportError> {
        let sink = DurableSink::open(&config.sink_path).await?;
        let endpoint = Arc::new(Endpoint::bind(&config.bind, sink).await?);
        let receiver = Receiver::new(Arc::clone(&endpoint), LogRecordHandler);
        let receiver_task = tokio::spawn(receiver.spin());
        let controller = LevelController::new(Arc::clone(&endpoint));

        info!(
            "collector listening on {}, persisting to {}",
            endpoint.local_addr(),
            config.sink_path.display()
        );

        Ok(Collector {
            endpoint,
            controller,
            receiver_task: Some(receiver_task),
        })
    }

    /// Pushes a level change to one agent. Fire-and-forget.
    pub async fn set_level(&self, level: LogLevel, target: SocketAddr) -> Result<(), EmitError> {
        self.controller.set_level(level, target).await
    }

    /// Reads the whole sink back, serialized with in-flight appends.
    pub async fn dump(&self) -> std::io::Result<String> {
        let sink = self.endpoint.state().lock().await;
        sink.dump().await
    }

    /// The address record traffic is received on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Stops the receiver task and waits for it to exit. Idempotent.
    pub async fn shutdown(&mut self) {
        self.endpoint.begin_shutdown();
        if let Some(task) = self.receiver_task.take() {
            if let Err(e) = task.await {
                error!("collector receiver task failed during shutdown: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_shutdown_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CollectorConfig::new(dir.path().join("collected.log"));
        config.bind = EndpointConfig::new("127.0.0.1", 0);

        let mut collector = Collector::start(&config).await.unwrap();
        assert_eq!(collector.dump().await.unwrap(), "");

        collector.shutdown().await;
        collector.shutdown().await; // must not deadlock or panic
    }
}
