//! Login sequence and the play-state bootstrap burst.
//!
//! After a successful login start the client takes a capacity slot, is
//! acknowledged, becomes a registered session and is sent a fixed, ordered
//! burst of frames that spawns it into the void world.
//! Nothing else is written to the stream until the burst has been flushed;
//! the keep-alive loop is only started afterwards by the session.

use crate::context::ServerContext;
use crate::error::ConnectionError;
use crate::registry::{RegistryFull, Session, SessionGuard};
use crate::world;
use log::{info, warn};
use rand::Rng;
use shared::chat::{ChatColor, ChatMessage};
use shared::packets::{
    abilities, ChangeDifficulty, CustomPayload, Difficulty, GameMode, JoinGame,
    LevelChunkWithLight, LoginDisconnect, LoginStart, LoginSuccess, PlayerAbilities,
    PlayerInfoAdd, SetChunkCacheCenter, SetDefaultSpawnPosition, SyncPlayerPosition, SystemChat,
    SYSTEM_CHAT_TYPE,
};
use shared::{
    offline_uuid, read_frame, write_frame, CodecError, DecodePacket, Frame, Packet,
};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};

/// Game mode every player is put in.
pub const GAME_MODE: GameMode = GameMode::Spectator;

/// Runs the login stage up to and including the bootstrap burst.
///
/// Capacity is reserved before login success so a full server can still be
/// answered with a login kick; the session itself is only registered once
/// login success has been flushed. On success the returned guard keeps the
/// player registered and dropping it removes the entry. A version mismatch
/// or a full server is answered with a login kick before the error is
/// returned.
pub async fn login<S>(
    stream: &mut S,
    ctx: &ServerContext,
    protocol_version: i32,
    peer: SocketAddr,
) -> Result<SessionGuard, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if protocol_version != shared::PROTOCOL_VERSION {
        warn!(
            "Kicking {}: unsupported protocol version {}",
            peer, protocol_version
        );
        kick(stream, "Unsupported version").await?;
        return Err(ConnectionError::UnsupportedVersion(protocol_version));
    }

    // A signed key, if present, is decoded and dropped unchecked.
    let start = LoginStart::from_frame(&read_frame(stream).await?)?;
    let uuid = offline_uuid(&start.username);

    let reservation = match ctx.registry.reserve(ctx.config.player_limit()) {
        Ok(reservation) => reservation,
        Err(RegistryFull) => {
            warn!("Kicking {}({}): server is full", start.username, uuid);
            kick(stream, "Server is full").await?;
            return Err(ConnectionError::ServerFull);
        }
    };

    let success = LoginSuccess {
        uuid,
        username: start.username.clone(),
    };
    write_frame(stream, &success.to_frame()?).await?;
    let guard = reservation.activate(uuid, &start.username, peer);

    for frame in bootstrap_frames(ctx, guard.session())? {
        write_frame(stream, &frame).await?;
    }

    info!("{}({}) connected from {}", start.username, uuid, peer);
    Ok(guard)
}

/// Sends a login-stage disconnect carrying `reason`.
async fn kick<S>(stream: &mut S, reason: &str) -> Result<(), CodecError>
where
    S: AsyncWrite + Unpin,
{
    let kick = LoginDisconnect {
        reason: ChatMessage::text(reason),
    };
    write_frame(stream, &kick.to_frame()?).await
}

/// A fresh teleport confirmation id. Never validated.
pub(crate) fn teleport_id() -> i32 {
    rand::thread_rng().gen_range(0..=i32::MAX)
}

/// Position sync to the spawn block.
pub(crate) fn spawn_position_sync() -> SyncPlayerPosition {
    SyncPlayerPosition::at(
        world::SPAWN_X as f64,
        world::SPAWN_Y as f64,
        world::SPAWN_Z as f64,
        teleport_id(),
    )
}

/// Encodes the eleven frames that initialize a play session, in send order.
pub fn bootstrap_frames(ctx: &ServerContext, session: &Session) -> Result<Vec<Frame>, CodecError> {
    let join = JoinGame {
        entity_id: world::PLAYER_ENTITY_ID,
        hardcore: false,
        game_mode: GAME_MODE,
        previous_game_mode: None,
        dimension_names: world::DIMENSION_NAMES,
        registry_codec: &ctx.dimension_codec,
        dimension_type: world::DIMENSION_TYPE,
        dimension_name: world::DIMENSION_NAME,
        hashed_seed: rand::random(),
        max_players: ctx.config.max_players,
        view_distance: world::VIEW_DISTANCE,
        simulation_distance: world::SIMULATION_DISTANCE,
        reduced_debug_info: false,
        enable_respawn_screen: true,
        is_debug: false,
        is_flat: true,
    };

    let abilities = PlayerAbilities {
        flags: abilities::INVULNERABLE | abilities::FLYING | abilities::ALLOW_FLYING,
        flying_speed: 0.05,
        fov_modifier: 0.1,
    };

    let player_info = PlayerInfoAdd {
        uuid: session.uuid,
        username: session.username.clone(),
        game_mode: GAME_MODE,
        latency_ms: 0,
    };

    let chunk = LevelChunkWithLight {
        chunk_x: 0,
        chunk_z: 0,
        sections: ctx.chunk_sections.clone(),
    };

    let spawn = SetDefaultSpawnPosition {
        x: world::SPAWN_X,
        y: world::SPAWN_Y,
        z: world::SPAWN_Z,
        angle: 0.0,
    };

    let welcome = SystemChat {
        message: ChatMessage::colored(ctx.config.welcome.clone(), ChatColor::Yellow),
        chat_type: SYSTEM_CHAT_TYPE,
    };

    Ok(vec![
        join.to_frame()?,
        CustomPayload::brand(world::BRAND).to_frame()?,
        ChangeDifficulty {
            difficulty: Difficulty::Peaceful,
            locked: true,
        }
        .to_frame()?,
        abilities.to_frame()?,
        spawn_position_sync().to_frame()?,
        player_info.to_frame()?,
        SetChunkCacheCenter {
            chunk_x: 0,
            chunk_z: 0,
        }
        .to_frame()?,
        chunk.to_frame()?,
        spawn.to_frame()?,
        spawn_position_sync().to_frame()?,
        welcome.to_frame()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use assert_approx_eq::assert_approx_eq;
    use shared::codec::MAX_STRING_CHARS;
    use shared::ids::play;
    use shared::packets::{LoginSignature, MAX_USERNAME_CHARS};
    use tokio::io::{duplex, AsyncWriteExt};

    const BURST_IDS: [i32; 11] = [
        play::LOGIN,
        play::CUSTOM_PAYLOAD,
        play::CHANGE_DIFFICULTY,
        play::PLAYER_ABILITIES,
        play::PLAYER_POSITION,
        play::PLAYER_INFO,
        play::SET_CHUNK_CACHE_CENTER,
        play::LEVEL_CHUNK_WITH_LIGHT,
        play::SET_DEFAULT_SPAWN_POSITION,
        play::PLAYER_POSITION,
        play::SYSTEM_CHAT,
    ];

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn context(max_players: i32) -> ServerContext {
        ServerContext::new(ServerConfig {
            max_players,
            ..ServerConfig::default()
        })
    }

    fn login_start(name: &str) -> Vec<u8> {
        LoginStart {
            username: name.to_string(),
            signature: None,
        }
        .to_frame()
        .unwrap()
        .encode()
        .unwrap()
    }

    #[test]
    fn test_burst_order() {
        let ctx = context(0);
        let registry = std::sync::Arc::clone(&ctx.registry);
        let guard = registry
            .register(offline_uuid("Steve"), "Steve", peer(), None)
            .unwrap();

        let frames = bootstrap_frames(&ctx, guard.session()).unwrap();
        let ids: Vec<i32> = frames.iter().map(|frame| frame.id).collect();
        assert_eq!(ids, BURST_IDS);
    }

    #[test]
    fn test_burst_player_info_and_welcome() {
        let ctx = context(0);
        let registry = std::sync::Arc::clone(&ctx.registry);
        let guard = registry
            .register(offline_uuid("Steve"), "Steve", peer(), None)
            .unwrap();
        let frames = bootstrap_frames(&ctx, guard.session()).unwrap();

        let mut info = frames[5].reader();
        assert_eq!(info.varint().unwrap(), 0);
        assert_eq!(info.varint().unwrap(), 1);
        assert_eq!(info.uuid().unwrap(), offline_uuid("Steve"));
        assert_eq!(info.string(MAX_USERNAME_CHARS).unwrap(), "Steve");

        let mut chat = frames[10].reader();
        assert_eq!(
            chat.string(MAX_STRING_CHARS).unwrap(),
            r#"{"text":"Welcome to minecraft empty server","color":"yellow"}"#
        );
    }

    #[test]
    fn test_burst_abilities_allow_flight() {
        let ctx = context(0);
        let registry = std::sync::Arc::clone(&ctx.registry);
        let guard = registry
            .register(offline_uuid("Steve"), "Steve", peer(), None)
            .unwrap();
        let frames = bootstrap_frames(&ctx, guard.session()).unwrap();

        let mut fields = frames[3].reader();
        let flags = fields.i8().unwrap();
        assert_ne!(flags & abilities::ALLOW_FLYING, 0);
        assert_ne!(flags & abilities::FLYING, 0);
        assert_approx_eq!(fields.f32().unwrap(), 0.05, 1e-6);
        assert_approx_eq!(fields.f32().unwrap(), 0.1, 1e-6);
        assert!(fields.finish().is_ok());
    }

    #[tokio::test]
    async fn test_unsupported_version_kicks() {
        let ctx = context(0);
        let (mut server_end, mut client_end) = duplex(4096);

        let result = login(&mut server_end, &ctx, 47, peer()).await;
        assert!(matches!(result, Err(ConnectionError::UnsupportedVersion(47))));
        drop(server_end);

        let kick = read_frame(&mut client_end).await.unwrap();
        let kick = LoginDisconnect::from_frame(&kick).unwrap();
        assert_eq!(kick.reason.text, "Unsupported version");
        assert!(matches!(
            read_frame(&mut client_end).await,
            Err(CodecError::ConnectionClosed)
        ));
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_login_registers_and_sends_burst() {
        let ctx = context(0);
        let (mut server_end, mut client_end) = duplex(1 << 20);

        let start = LoginStart {
            username: "Notch".to_string(),
            signature: Some(LoginSignature {
                expires_at: 0,
                public_key: vec![0xAA; 16],
                signature: vec![0xBB; 8],
            }),
        };
        client_end
            .write_all(&start.to_frame().unwrap().encode().unwrap())
            .await
            .unwrap();

        let guard = login(&mut server_end, &ctx, shared::PROTOCOL_VERSION, peer())
            .await
            .unwrap();
        assert_eq!(ctx.registry.len(), 1);
        assert_eq!(guard.session().username, "Notch");
        drop(server_end);

        let success = LoginSuccess::from_frame(&read_frame(&mut client_end).await.unwrap()).unwrap();
        assert_eq!(
            success.uuid.to_string(),
            "b50ad385-829d-3141-a216-7e7d7539ba7f"
        );
        assert_eq!(success.username, "Notch");

        for expected in BURST_IDS {
            assert_eq!(read_frame(&mut client_end).await.unwrap().id, expected);
        }

        drop(guard);
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_full_server_kicks() {
        let ctx = context(1);
        let registry = std::sync::Arc::clone(&ctx.registry);
        let _occupant = registry
            .register(offline_uuid("first"), "first", peer(), ctx.config.player_limit())
            .unwrap();

        let (mut server_end, mut client_end) = duplex(4096);
        client_end.write_all(&login_start("second")).await.unwrap();

        let result = login(&mut server_end, &ctx, shared::PROTOCOL_VERSION, peer()).await;
        assert!(matches!(result, Err(ConnectionError::ServerFull)));
        assert_eq!(ctx.registry.len(), 1);

        let kick = LoginDisconnect::from_frame(&read_frame(&mut client_end).await.unwrap()).unwrap();
        assert_eq!(kick.reason.text, "Server is full");
    }

    #[tokio::test]
    async fn test_failed_success_write_registers_nothing() {
        let ctx = context(1);
        let mut stream = tokio_test::io::Builder::new()
            .read(&login_start("Steve"))
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "peer gone",
            ))
            .build();

        let result = login(&mut stream, &ctx, shared::PROTOCOL_VERSION, peer()).await;
        assert!(matches!(result, Err(ref e) if e.is_disconnect()));
        assert!(ctx.registry.is_empty());
        assert_eq!(ctx.registry.reserved(), 0);

        // The slot came back.
        assert!(ctx.registry.reserve(ctx.config.player_limit()).is_ok());
    }

    #[tokio::test]
    async fn test_pending_login_holds_last_slot() {
        let ctx = context(1);
        let _pending = ctx.registry.reserve(ctx.config.player_limit()).unwrap();

        let (mut server_end, mut client_end) = duplex(4096);
        client_end.write_all(&login_start("second")).await.unwrap();

        let result = login(&mut server_end, &ctx, shared::PROTOCOL_VERSION, peer()).await;
        assert!(matches!(result, Err(ConnectionError::ServerFull)));
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_bad_login_start_registers_nothing() {
        let ctx = context(0);
        let (mut server_end, mut client_end) = duplex(4096);
        client_end.write_all(&login_start("a_name_far_too_long_for_this")).await.unwrap();

        let result = login(&mut server_end, &ctx, shared::PROTOCOL_VERSION, peer()).await;
        assert!(matches!(
            result,
            Err(ConnectionError::Codec(CodecError::StringTooLong { .. }))
        ));
        assert!(ctx.registry.is_empty());
    }

    #[test]
    fn test_teleport_id_non_negative() {
        for _ in 0..1000 {
            assert!(teleport_id() >= 0);
        }
    }
}
