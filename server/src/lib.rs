//! # Hollow Server Library
//!
//! A minimal server endpoint for the Minecraft Java protocol, revision 759.
//! Clients can query the server list status, or log in and idle forever in
//! an empty void dimension while the server keeps the connection alive.
//!
//! ## Core Responsibilities
//!
//! ### Connection Supervision
//! Accepts TCP connections and runs each one as an independent task. An
//! optional PROXY v1 pre-amble is parsed before any framing so the original
//! client address survives a load balancer.
//!
//! ### Per-Connection State Machine
//! Every connection starts with a handshake that picks one of two paths:
//! - **Status**: one status request answered with the server list document,
//!   one ping echoed back, then close
//! - **Login**: version check, offline identity derivation, login success and
//!   the fixed bootstrap burst that spawns the player
//!
//! ### Session Lifetime
//! After the burst a session runs two concurrent halves:
//! - A read loop that discards everything the client sends
//! - A keep-alive task that owns the write half and ticks once per second
//!
//! Whichever half stops first cancels the other. Registry cleanup is tied to
//! a guard, so it happens exactly once on every exit path.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! The [`Server`](network::Server) supervisor: accept loop, graceful shutdown
//! and per-connection task spawning.
//!
//! ### Connection Modules (`connection`, `proxy`, `status`, `login`)
//! The pre-play stages of a connection, from the PROXY line to the end of
//! the bootstrap burst.
//!
//! ### Session Modules (`session`, `keepalive`, `registry`)
//! The play stage and the process-wide set of active sessions used for the
//! online count.
//!
//! ### Static Data (`world`, `config`, `context`)
//! Spawn constants, the registry codec and the read-only configuration shared
//! by every task.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:25565".parse()?,
//!         max_players: 20,
//!         ..ServerConfig::default()
//!     };
//!
//!     // Runs until `Server::shutdown` is called from another task.
//!     Server::new(config).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Limits
//!
//! No read timeouts are applied before login completes. Keep-alive replies
//! and teleport confirmations are never checked, and signed login keys are
//! accepted without validation.

pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod keepalive;
pub mod login;
pub mod network;
pub mod proxy;
pub mod registry;
pub mod session;
pub mod status;
pub mod world;
