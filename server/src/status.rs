//! Server list status and ping exchange.

use crate::context::ServerContext;
use crate::error::ConnectionError;
use log::debug;
use shared::chat::ChatMessage;
use shared::packets::{PingRequest, PingResponse, StatusRequest, StatusResponse};
use shared::status::{PlayerCounts, StatusDocument, VersionInfo};
use shared::{read_frame, write_frame, DecodePacket, Packet};
use tokio::io::{AsyncRead, AsyncWrite};

/// Snapshot of the server for the server list.
pub fn status_document(ctx: &ServerContext) -> StatusDocument {
    StatusDocument {
        version: VersionInfo {
            name: shared::VERSION_NAME.to_string(),
            protocol: shared::PROTOCOL_VERSION,
        },
        players: PlayerCounts {
            max: ctx.config.max_players,
            online: ctx.registry.len(),
            sample: Vec::new(),
        },
        description: ChatMessage::text(ctx.config.motd.clone()),
        favicon: None,
    }
}

/// Answers one status request and one ping, then returns so the caller can
/// close the stream. Any unexpected frame ends the exchange without a reply.
pub async fn respond<S>(stream: &mut S, ctx: &ServerContext) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    StatusRequest::from_frame(&read_frame(stream).await?)?;

    let response = StatusResponse {
        document: status_document(ctx),
    };
    write_frame(stream, &response.to_frame()?).await?;

    let ping = PingRequest::from_frame(&read_frame(stream).await?)?;
    let pong = PingResponse {
        payload: ping.payload,
    };
    write_frame(stream, &pong.to_frame()?).await?;

    debug!("Served status ({} online)", response.document.players.online);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use shared::offline_uuid;
    use std::sync::Arc;

    fn context(max_players: i32) -> ServerContext {
        ServerContext::new(ServerConfig {
            max_players,
            motd: "test motd".to_string(),
            ..ServerConfig::default()
        })
    }

    fn encoded<P: Packet>(packet: &P) -> Vec<u8> {
        packet.to_frame().unwrap().encode().unwrap()
    }

    #[test]
    fn test_document_reflects_config_and_registry() {
        let ctx = context(20);
        let registry = Arc::clone(&ctx.registry);
        let _a = registry
            .register(offline_uuid("a"), "a", "127.0.0.1:1".parse().unwrap(), None)
            .unwrap();

        let document = status_document(&ctx);
        assert_eq!(document.version.name, "1.19");
        assert_eq!(document.version.protocol, 759);
        assert_eq!(document.players.max, 20);
        assert_eq!(document.players.online, 1);
        assert!(document.players.sample.is_empty());
        assert_eq!(document.description.text, "test motd");
        assert!(document.favicon.is_none());
    }

    #[tokio::test]
    async fn test_status_then_ping_exchange() {
        let ctx = context(0);
        let token = 0x0123_4567_89AB_CDEFi64;

        let mut mock = tokio_test::io::Builder::new()
            .read(&encoded(&StatusRequest))
            .write(&encoded(&StatusResponse {
                document: status_document(&ctx),
            }))
            .read(&encoded(&PingRequest { payload: token }))
            .write(&encoded(&PingResponse { payload: token }))
            .build();

        respond(&mut mock, &ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_empty_status_request_gets_no_reply() {
        let ctx = context(0);
        // Status request with a stray body byte.
        let mut mock = tokio_test::io::Builder::new()
            .read(&[0x02, 0x00, 0x01])
            .build();

        let result = respond(&mut mock, &ctx).await;
        assert!(matches!(result, Err(ConnectionError::Codec(_))));
    }

    #[tokio::test]
    async fn test_wrong_second_frame_stops_before_pong() {
        let ctx = context(0);
        let mut mock = tokio_test::io::Builder::new()
            .read(&encoded(&StatusRequest))
            .write(&encoded(&StatusResponse {
                document: status_document(&ctx),
            }))
            // Another status request instead of a ping.
            .read(&encoded(&StatusRequest))
            .build();

        let result = respond(&mut mock, &ctx).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Codec(shared::CodecError::UnexpectedPacket { .. }))
        ));
    }
}
