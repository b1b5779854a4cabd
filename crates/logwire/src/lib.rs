//! Minimal distributed logging transport over UDP.
//!
//! Application processes ("agents") emit leveled log records as single
//! datagrams to a central collector, which appends them to a durable sink.
//! The collector can push runtime log-level changes back to agents in-band,
//! on the same socket that carries record traffic.
//!
//! Both roles are built from the same parts:
//! - [`endpoint::Endpoint`]: one bound non-blocking UDP socket, a mutex
//!   guarding the role's shared state, and a cancellation token acting as
//!   the running flag.
//! - [`receiver::Receiver`]: the background task that polls the socket and
//!   dispatches each datagram to a [`handler::DatagramHandler`].
//! - [`emitter::Emitter`] (agent) and [`controller::LevelController`]
//!   (collector): the foreground send paths.
//!
//! [`agent::Agent`] and [`collector::Collector`] assemble these into the two
//! runnable roles.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod agent;
pub mod collector;
pub mod command;
pub mod controller;
pub mod emitter;
pub mod endpoint;
pub mod errors;
pub mod handler;
pub mod level;
pub mod receiver;
pub mod record;
pub mod sink;

/// Maximum size of a single datagram payload in bytes. Formatted records
/// longer than this are truncated, never rejected.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Default UDP port the collector binds to.
pub const DEFAULT_COLLECTOR_PORT: u16 = 8080;

/// Default UDP port an agent binds to for level commands.
pub const DEFAULT_AGENT_PORT: u16 = 9090;
