//! Read-only server settings.

use std::net::SocketAddr;

/// Settings consumed by connection tasks. Built once at start-up from the
/// command line and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: SocketAddr,
    /// Require a PROXY v1 line at the start of every connection.
    pub proxy_protocol: bool,
    /// Advertised and enforced player cap; zero or less means unlimited.
    pub max_players: i32,
    /// Description shown in the server list.
    pub motd: String,
    /// System chat line sent once a player has spawned.
    pub welcome: String,
}

impl ServerConfig {
    /// Capacity for the session registry, `None` when unlimited.
    pub fn player_limit(&self) -> Option<usize> {
        if self.max_players > 0 {
            Some(self.max_players as usize)
        } else {
            None
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], shared::DEFAULT_PORT)),
            proxy_protocol: false,
            max_players: 0,
            motd: "An empty Minecraft Server".to_string(),
            welcome: "Welcome to minecraft empty server".to_string(),
        }
    }
}
