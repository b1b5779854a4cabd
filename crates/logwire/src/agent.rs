//! The agent role: emits records, accepts level commands.
//!
//! An agent owns one endpoint whose shared state is the filter threshold.
//! Starting the agent binds the socket and spawns the receiver task with a
//! [`LevelCommandHandler`]; shutting down cancels the running flag, joins
//! the receiver task, and only then lets the endpoint (socket and mutex) be
//! dropped — task-join always precedes resource teardown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::emitter::{Emitter, SendPolicy};
use crate::endpoint::{Endpoint, EndpointConfig};
use crate::errors::{EmitError, TransportError};
use crate::handler::LevelCommandHandler;
use crate::level::LogLevel;
use crate::receiver::Receiver;
use crate::DEFAULT_AGENT_PORT;

/// Configuration for the agent role.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Local address to bind for incoming level commands.
    pub bind: EndpointConfig,
    /// Where record traffic goes.
    pub collector: SocketAddr,
    /// Threshold at startup.
    pub initial_level: LogLevel,
    /// Send-failure handling for the emitter.
    pub send_policy: SendPolicy,
}

impl AgentConfig {
    /// Defaults: bind 127.0.0.1:9090, DEBUG threshold, log-and-continue
    /// sends.
    #[must_use]
    pub fn new(collector: SocketAddr) -> Self {
        AgentConfig {
            bind: EndpointConfig::new("127.0.0.1", DEFAULT_AGENT_PORT),
            collector,
            initial_level: LogLevel::default(),
            send_policy: SendPolicy::default(),
        }
    }
}

/// A running agent: endpoint, emitter, and the background receiver task.
pub struct Agent {
    endpoint: Arc<Endpoint<LogLevel>>,
    emitter: Emitter,
    receiver_task: Option<JoinHandle<()>>,
}

impl Agent {
    /// Binds the agent endpoint and starts the receiver task.
    pub async fn start(config: &AgentConfig) -> Result<Agent, TransportError> {
        let endpoint = Arc::new(Endpoint::bind(&config.bind, config.initial_level).await?);
        let receiver = Receiver::new(Arc::clone(&endpoint), LevelCommandHandler);
        let receiver_task = tokio::spawn(receiver.spin());
        let emitter = Emitter::new(Arc::clone(&endpoint), config.collector, config.send_policy);

        info!(
            "agent listening on {}, emitting to {}",
            endpoint.local_addr(),
            config.collector
        );

        Ok(Agent {
            endpoint,
            emitter,
            receiver_task: Some(receiver_task),
        })
    }

    /// Emits one record through the agent's emitter.
    pub async fn emit(
        &self,
        level: LogLevel,
        program: &str,
        function: &str,
        line: u32,
        message: &str,
    ) -> Result<(), EmitError> {
        self.emitter.emit(level, program, function, line, message).await
    }

    #[must_use]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Current filter threshold, as last applied by the command handler.
    pub async fn current_level(&self) -> LogLevel {
        *self.endpoint.state().lock().await
    }

    /// The address agents receive level commands on.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Stops the receiver task and waits for it to exit. Idempotent: a
    /// second call finds the flag already flipped and no task to join.
    pub async fn shutdown(&mut self) {
        self.endpoint.begin_shutdown();
        if let Some(task) = self.receiver_task.take() {
            if let Err(e) = task.await {
                error!("agent receiver task failed during shutdown: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(collector: SocketAddr) -> AgentConfig {
        let mut config = AgentConfig::new(collector);
        config.bind = EndpointConfig::new("127.0.0.1", 0);
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown_twice() {
        let collector = "127.0.0.1:18080".parse().unwrap();
        let mut agent = Agent::start(&test_config(collector)).await.unwrap();
        assert_eq!(agent.current_level().await, LogLevel::Debug);

        agent.shutdown().await;
        agent.shutdown().await; // must not deadlock or panic
    }
}
