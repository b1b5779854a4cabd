#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Demo agent: binds the command endpoint, then emits a rotating set of
//! sample records at a fixed interval so a running collector has traffic to
//! show. A collector can push level commands back at any time; watching the
//! sink while changing the level shows the filter in action.

use std::env;

use tokio::signal;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use logwire::agent::{Agent, AgentConfig};
use logwire::endpoint::{resolve_addr, EndpointConfig};
use logwire::level::LogLevel;
use logwire::{DEFAULT_AGENT_PORT, DEFAULT_COLLECTOR_PORT};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_EMIT_INTERVAL_SECS: u64 = 2;
const PROGRAM: &str = "logwire-agentd";

#[tokio::main]
pub async fn main() {
    let log_level = env::var("LOGWIRE_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_level).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let collector = resolve_addr(
        &env::var("LOGWIRE_COLLECTOR_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("LOGWIRE_COLLECTOR_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_COLLECTOR_PORT),
    );
    let collector = match collector {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid collector address in configuration: {e}");
            std::process::exit(1);
        }
    };

    let mut config = AgentConfig::new(collector);
    config.bind = EndpointConfig::new(
        env::var("LOGWIRE_AGENT_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("LOGWIRE_AGENT_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_AGENT_PORT),
    );

    let mut agent = match Agent::start(&config).await {
        Ok(agent) => agent,
        Err(e) => {
            error!("failed to start agent: {e}");
            std::process::exit(1);
        }
    };

    let emit_interval_secs = env::var("LOGWIRE_EMIT_INTERVAL_SECS")
        .ok()
        .and_then(|secs| secs.parse().ok())
        .unwrap_or(DEFAULT_EMIT_INTERVAL_SECS);
    let mut emit_interval = interval(Duration::from_secs(emit_interval_secs));
    emit_interval.tick().await; // discard first tick, which is instantaneous

    let samples = [
        (LogLevel::Debug, "polling upstream queue"),
        (LogLevel::Warning, "queue depth above soft limit"),
        (LogLevel::Error, "upstream request failed, will retry"),
        (LogLevel::Critical, "no upstream reachable"),
    ];
    let mut beat: u32 = 0;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            _ = emit_interval.tick() => {
                let (level, message) = samples[beat as usize % samples.len()];
                if let Err(e) = agent
                    .emit(level, PROGRAM, "heartbeat", beat, message)
                    .await
                {
                    error!("emit failed: {e}");
                }
                beat = beat.wrapping_add(1);
            }
        }
    }

    agent.shutdown().await;
    info!("agent stopped");
}
