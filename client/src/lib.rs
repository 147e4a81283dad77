//! # Probe Client Library
//!
//! A minimal protocol client for exercising the server from the outside. It
//! is used by the integration tests and by operators checking a deployment.
//!
//! ## Capabilities
//!
//! ### Status Query
//! Performs a status handshake, fetches the server list document and measures
//! a ping round trip.
//!
//! ### Offline Login
//! Performs a login handshake, sends login start for a chosen username and
//! reports either the assigned identity or the kick reason.
//!
//! ### Frame Recording
//! After login, records every frame the server sends during an observation
//! window. The bootstrap burst order and the keep-alive cadence can be read
//! straight off a [`Recording`](network::Recording).
//!
//! ### Load Balancer Emulation
//! Can prefix the connection with a PROXY v1 line, as a proxy in front of
//! the server would.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{LoginOutcome, ProbeClient};
//! use shared::packets::Intent;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let addr: std::net::SocketAddr = "127.0.0.1:25565".parse()?;
//!     let mut client = ProbeClient::connect(addr).await?;
//!     client.handshake(shared::PROTOCOL_VERSION, addr, Intent::Login).await?;
//!
//!     if let LoginOutcome::Success { uuid, .. } = client.login("Steve").await? {
//!         let recording = client.record(Duration::from_secs(5)).await?;
//!         println!("{} got {} keep-alives", uuid, recording.keep_alives());
//!     }
//!     Ok(())
//! }
//! ```

pub mod network;

pub use network::{LoginOutcome, ProbeClient, Recording};
