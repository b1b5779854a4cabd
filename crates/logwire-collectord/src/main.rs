#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Collector daemon: receives log records over UDP, appends them to the
//! sink file, and offers an interactive console for pushing log-level
//! changes to agents, dumping the sink, and shutting down. Ctrl-C triggers
//! the same graceful shutdown as the console's quit option.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logwire::collector::{Collector, CollectorConfig};
use logwire::endpoint::{resolve_addr, EndpointConfig};
use logwire::level::LogLevel;
use logwire::{DEFAULT_AGENT_PORT, DEFAULT_COLLECTOR_PORT};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_SINK_PATH: &str = "collected.log";

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

    let host = env::var("LOGWIRE_COLLECTOR_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port: u16 = env::var("LOGWIRE_COLLECTOR_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(DEFAULT_COLLECTOR_PORT);
    let sink_path =
        env::var("LOGWIRE_SINK_PATH").unwrap_or_else(|_| DEFAULT_SINK_PATH.to_string());
    let default_agent = resolve_addr(
        &env::var("LOGWIRE_AGENT_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("LOGWIRE_AGENT_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_AGENT_PORT),
    );
    let default_agent = match default_agent {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid agent address in configuration: {e}");
            std::process::exit(1);
        }
    };

    let mut config = CollectorConfig::new(sink_path);
    config.bind = EndpointConfig::new(host, port);

    // A bind failure is fatal: an unbound collector cannot receive anything.
    let mut collector = match Collector::start(&config).await {
        Ok(collector) => collector,
        Err(e) => {
            error!("failed to start collector: {e}");
            std::process::exit(1);
        }
    };
    info!("collector ready; press Ctrl-C or choose 0 to shut down");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_menu();
        let line = tokio::select! {
            _ = signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(choice)) => match choice.trim() {
                "1" => set_agent_level(&collector, default_agent, &mut lines).await,
                "2" => dump_sink(&collector).await,
                "0" => {
                    println!("The collector is now shutting down...");
                    break;
                }
                "" => {}
                other => println!("Invalid option '{other}'. Please try again."),
            },
            // stdin closed: run as a plain daemon until interrupted
            Ok(None) => {
                debug!("stdin closed, waiting for interrupt");
                if let Err(e) = signal::ctrl_c().await {
                    error!("failed to wait for interrupt: {e}");
                }
                break;
            }
            Err(e) => {
                error!("failed to read console input: {e}");
                break;
            }
        }
    }

    collector.shutdown().await;
    info!("collector stopped");
}

fn print_menu() {
    println!();
    println!("1. Set agent log level");
    println!("2. Dump collected log");
    println!("0. Shut down gracefully");
    println!("Your option is... ->");
}

async fn set_agent_level(
    collector: &Collector,
    default_agent: SocketAddr,
    lines: &mut Lines<BufReader<Stdin>>,
) {
    println!("Enter log level (0=DEBUG, 1=WARNING, 2=ERROR, 3=CRITICAL) ->");
    let level = match lines.next_line().await {
        Ok(Some(input)) => match parse_level(input.trim()) {
            Some(level) => level,
            None => {
                println!("Invalid entry, please enter only 0, 1, 2, 3...");
                return;
            }
        },
        _ => return,
    };

    println!("Agent address [{default_agent}] ->");
    let target = match lines.next_line().await {
        Ok(Some(input)) if !input.trim().is_empty() => match input.trim().parse() {
            Ok(addr) => addr,
            Err(e) => {
                println!("Invalid address: {e}");
                return;
            }
        },
        Ok(Some(_)) => default_agent,
        _ => return,
    };

    match collector.set_level(level, target).await {
        Ok(()) => println!("Sent '{level}' to {target} (fire-and-forget)."),
        Err(e) => error!("failed to send level command: {e}"),
    }
}

/// Accepts the wire digit or the level name.
fn parse_level(input: &str) -> Option<LogLevel> {
    if let Ok(digit) = input.parse::<u8>() {
        return LogLevel::try_from(digit).ok();
    }
    LogLevel::from_str(input).ok()
}

async fn dump_sink(collector: &Collector) {
    match collector.dump().await {
        Ok(contents) if contents.is_empty() => println!("(no records collected yet)"),
        Ok(contents) => print!("{contents}"),
        Err(e) => error!("failed to read the sink file: {e}"),
    }
}
