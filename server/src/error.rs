//! Per-connection failure taxonomy.

use crate::proxy::ProxyError;
use shared::CodecError;
use std::io::ErrorKind;

/// Why a connection task ended early. Never crosses the connection boundary:
/// the supervisor logs it and drops the socket.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Malformed or unexpected frame, or a transport failure underneath it.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Bad PROXY pre-amble; nothing was read past it.
    #[error("PROXY header rejected: {0}")]
    Proxy(#[from] ProxyError),

    /// The client was kicked for speaking another protocol version.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(i32),

    /// The client was kicked because the player cap was reached.
    #[error("server is full")]
    ServerFull,
}

impl ConnectionError {
    /// True when the peer simply went away rather than misbehaving.
    pub fn is_disconnect(&self) -> bool {
        match self {
            ConnectionError::Codec(CodecError::ConnectionClosed) => true,
            ConnectionError::Codec(CodecError::Io(e)) => matches!(
                e.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}
