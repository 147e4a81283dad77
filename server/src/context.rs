//! State shared by every connection task.

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::world;
use shared::chunk::empty_chunk_sections;
use shared::nbt::BaseNbt;
use std::sync::Arc;
use std::time::Duration;

/// Interval between keep-alive ticks of an active session.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Read-only settings plus the session registry, handed to each connection
/// behind an `Arc`.
#[derive(Debug)]
pub struct ServerContext {
    pub config: ServerConfig,
    pub registry: Arc<SessionRegistry>,
    /// Registry codec embedded in every join frame.
    pub dimension_codec: BaseNbt,
    /// Section data of the single placeholder chunk.
    pub chunk_sections: Vec<u8>,
    pub keep_alive_interval: Duration,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(SessionRegistry::new()))
    }

    /// Builds a context around an existing registry.
    pub fn with_registry(config: ServerConfig, registry: Arc<SessionRegistry>) -> Self {
        Self {
            config,
            registry,
            dimension_codec: world::dimension_codec(),
            chunk_sections: empty_chunk_sections(world::WORLD_HEIGHT),
            keep_alive_interval: KEEP_ALIVE_INTERVAL,
        }
    }
}
