//! PROXY protocol v1 pre-amble, sent by load balancers ahead of the game
//! protocol:
//!
//! ```text
//! PROXY TCP4 192.0.2.1 198.51.100.7 51234 25565\r\n
//! ```

use std::net::{IpAddr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest line the v1 format allows, CRLF included.
pub const MAX_HEADER_LEN: usize = 107;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream ended inside the PROXY line")]
    Truncated,

    #[error("PROXY line exceeds {MAX_HEADER_LEN} bytes")]
    TooLong,

    #[error("malformed PROXY line: {0}")]
    Malformed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxiedProtocol {
    Tcp4,
    Tcp6,
}

/// Addresses of the original client connection as seen by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyHeader {
    pub protocol: ProxiedProtocol,
    pub source: SocketAddr,
    pub destination: SocketAddr,
}

impl ProxyHeader {
    /// Parses one line without its trailing CRLF.
    pub fn parse(line: &str) -> Result<Self, ProxyError> {
        let mut parts = line.split(' ');

        if parts.next() != Some("PROXY") {
            return Err(ProxyError::Malformed("missing PROXY tag"));
        }
        let protocol = match parts.next() {
            Some("TCP4") => ProxiedProtocol::Tcp4,
            Some("TCP6") => ProxiedProtocol::Tcp6,
            _ => return Err(ProxyError::Malformed("unknown protocol")),
        };

        let src_addr = parse_addr(parts.next(), protocol)?;
        let dst_addr = parse_addr(parts.next(), protocol)?;
        let src_port = parse_port(parts.next())?;
        let dst_port = parse_port(parts.next())?;

        if parts.next().is_some() {
            return Err(ProxyError::Malformed("trailing fields"));
        }

        Ok(ProxyHeader {
            protocol,
            source: SocketAddr::new(src_addr, src_port),
            destination: SocketAddr::new(dst_addr, dst_port),
        })
    }
}

fn parse_addr(field: Option<&str>, protocol: ProxiedProtocol) -> Result<IpAddr, ProxyError> {
    let addr: IpAddr = field
        .and_then(|f| f.parse().ok())
        .ok_or(ProxyError::Malformed("bad address"))?;
    match (protocol, addr) {
        (ProxiedProtocol::Tcp4, IpAddr::V4(_)) | (ProxiedProtocol::Tcp6, IpAddr::V6(_)) => Ok(addr),
        _ => Err(ProxyError::Malformed("address family mismatch")),
    }
}

fn parse_port(field: Option<&str>) -> Result<u16, ProxyError> {
    field
        .filter(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|f| f.parse().ok())
        .ok_or(ProxyError::Malformed("bad port"))
}

/// Reads and parses the pre-amble.
///
/// Consumes bytes one at a time up to and including the CRLF, so the first
/// game frame is left untouched on the stream.
pub async fn read_proxy_header<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<ProxyHeader, ProxyError> {
    let mut line = Vec::with_capacity(MAX_HEADER_LEN);
    loop {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ProxyError::Truncated)
            }
            Err(e) => return Err(ProxyError::Io(e)),
        };
        line.push(byte);

        if line.ends_with(b"\r\n") {
            break;
        }
        if byte == b'\n' {
            return Err(ProxyError::Malformed("bare line feed"));
        }
        if line.len() >= MAX_HEADER_LEN {
            return Err(ProxyError::TooLong);
        }
    }

    let text = std::str::from_utf8(&line[..line.len() - 2])
        .map_err(|_| ProxyError::Malformed("not ASCII"))?;
    ProxyHeader::parse(text)
}
