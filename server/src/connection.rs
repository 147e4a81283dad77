//! Per-connection state machine: PROXY pre-amble, handshake classification
//! and dispatch to the status or login stages.

use crate::context::ServerContext;
use crate::error::ConnectionError;
use crate::keepalive::cancelled;
use crate::login::login;
use crate::proxy::read_proxy_header;
use crate::registry::SessionGuard;
use crate::session::run_session;
use crate::status;
use log::debug;
use shared::packets::{Handshake, Intent};
use shared::{read_frame, DecodePacket};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::watch;

/// Where the pre-play stages left the connection.
enum Negotiated {
    /// Status exchange finished; the connection is done.
    Closed,
    /// Login and bootstrap completed; the session is registered.
    Play(SessionGuard),
}

/// Drives one accepted connection to completion.
///
/// The stream is dropped, and so closed, when this returns. `shutdown`
/// aborts the connection at any stage.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    ctx: &ServerContext,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut stream = BufReader::new(stream);

    let negotiated = tokio::select! {
        negotiated = negotiate(&mut stream, peer, ctx) => negotiated?,
        _ = cancelled(&mut shutdown) => return Ok(()),
    };

    match negotiated {
        Negotiated::Closed => Ok(()),
        Negotiated::Play(guard) => {
            run_session(stream, guard, ctx.keep_alive_interval, shutdown).await
        }
    }
}

async fn negotiate<S>(
    stream: &mut S,
    mut peer: SocketAddr,
    ctx: &ServerContext,
) -> Result<Negotiated, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if ctx.config.proxy_protocol {
        let header = read_proxy_header(stream).await?;
        debug!("{} is proxying for {}", peer, header.source);
        peer = header.source;
    }

    let handshake = Handshake::from_frame(&read_frame(stream).await?)?;
    debug!(
        "Handshake from {}: protocol {}, intent {:?}",
        peer, handshake.protocol_version, handshake.intent
    );

    match handshake.intent {
        Intent::Status => {
            status::respond(stream, ctx).await?;
            Ok(Negotiated::Closed)
        }
        Intent::Login => {
            let guard = login(stream, ctx, handshake.protocol_version, peer).await?;
            Ok(Negotiated::Play(guard))
        }
    }
}
