//! Typed packets for every frame this protocol core sends or receives.
//!
//! Serverbound packets and the handful of clientbound packets the probe
//! client inspects implement [`DecodePacket`]; everything implements
//! [`Packet`] so it can be turned into a [`Frame`].

use crate::chat::ChatMessage;
use crate::codec::{CodecError, FieldReader, FieldWriter, Frame, MAX_STRING_CHARS};
use crate::ids;
use crate::nbt::{network_root, BaseNbt, NbtCompound};
use crate::status::StatusDocument;
use uuid::Uuid;

/// Longest username accepted in login start.
pub const MAX_USERNAME_CHARS: usize = 16;

/// Longest server address accepted in a handshake.
pub const MAX_ADDRESS_CHARS: usize = 255;

/// A packet with a fixed type code that can be written to a frame.
pub trait Packet {
    const ID: i32;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError>;

    fn to_frame(&self) -> Result<Frame, CodecError> {
        let mut out = FieldWriter::new();
        self.write_fields(&mut out)?;
        Ok(out.into_frame(Self::ID))
    }
}

/// A packet that can be read back out of a frame.
pub trait DecodePacket: Packet + Sized {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError>;

    /// Checks the type code, then decodes the fields.
    fn from_frame(frame: &Frame) -> Result<Self, CodecError> {
        if frame.id != Self::ID {
            return Err(CodecError::UnexpectedPacket {
                expected: Self::ID,
                found: frame.id,
            });
        }
        Self::read_fields(&mut frame.reader())
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// What the client wants to do after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Status,
    Login,
}

impl Intent {
    pub fn to_i32(self) -> i32 {
        match self {
            Intent::Status => 1,
            Intent::Login => 2,
        }
    }
}

impl TryFrom<i32> for Intent {
    type Error = CodecError;

    /// Anything but status and login is refused, including the transfer
    /// intent of later revisions.
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Intent::Status),
            2 => Ok(Intent::Login),
            other => Err(CodecError::InvalidIntent(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub intent: Intent,
}

impl Packet for Handshake {
    const ID: i32 = ids::handshake::HANDSHAKE;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.varint(self.protocol_version)
            .string(&self.server_address)
            .u16(self.server_port)
            .varint(self.intent.to_i32());
        Ok(())
    }
}

impl DecodePacket for Handshake {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Handshake {
            protocol_version: fields.varint()?,
            server_address: fields.string(MAX_ADDRESS_CHARS)?,
            server_port: fields.u16()?,
            intent: Intent::try_from(fields.varint()?)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRequest;

impl Packet for StatusRequest {
    const ID: i32 = ids::status::STATUS_REQUEST;

    fn write_fields(&self, _out: &mut FieldWriter) -> Result<(), CodecError> {
        Ok(())
    }
}

impl DecodePacket for StatusRequest {
    /// The request has no fields; any body is malformed.
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        fields.finish()?;
        Ok(StatusRequest)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub document: StatusDocument,
}

impl Packet for StatusResponse {
    const ID: i32 = ids::status::STATUS_RESPONSE;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.string(&self.document.to_json()?);
        Ok(())
    }
}

impl DecodePacket for StatusResponse {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let json = fields.string(MAX_STRING_CHARS)?;
        Ok(StatusResponse {
            document: StatusDocument::from_json(&json)?,
        })
    }
}

/// Ping request carrying an opaque token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingRequest {
    pub payload: i64,
}

impl Packet for PingRequest {
    const ID: i32 = ids::status::PING_REQUEST;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.i64(self.payload);
        Ok(())
    }
}

impl DecodePacket for PingRequest {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(PingRequest {
            payload: fields.i64()?,
        })
    }
}

/// Ping response echoing the request's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResponse {
    pub payload: i64,
}

impl Packet for PingResponse {
    const ID: i32 = ids::status::PING_RESPONSE;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.i64(self.payload);
        Ok(())
    }
}

impl DecodePacket for PingResponse {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(PingResponse {
            payload: fields.i64()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Chat signing key sent by clients that have one. Never verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSignature {
    pub expires_at: i64,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
    pub signature: Option<LoginSignature>,
}

impl Packet for LoginStart {
    const ID: i32 = ids::login::LOGIN_START;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.string(&self.username).bool(self.signature.is_some());
        if let Some(signature) = &self.signature {
            out.i64(signature.expires_at)
                .byte_array(&signature.public_key)
                .byte_array(&signature.signature);
        }
        Ok(())
    }
}

impl DecodePacket for LoginStart {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let username = fields.string(MAX_USERNAME_CHARS)?;
        let signature = if fields.bool()? {
            Some(LoginSignature {
                expires_at: fields.i64()?,
                public_key: fields.byte_array()?,
                signature: fields.byte_array()?,
            })
        } else {
            None
        };
        Ok(LoginStart {
            username,
            signature,
        })
    }
}

/// Login-stage kick with a readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginDisconnect {
    pub reason: ChatMessage,
}

impl Packet for LoginDisconnect {
    const ID: i32 = ids::login::DISCONNECT;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.string(&self.reason.to_json()?);
        Ok(())
    }
}

impl DecodePacket for LoginDisconnect {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let json = fields.string(MAX_STRING_CHARS)?;
        Ok(LoginDisconnect {
            reason: serde_json::from_str(&json)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub uuid: Uuid,
    pub username: String,
}

impl Packet for LoginSuccess {
    const ID: i32 = ids::login::LOGIN_SUCCESS;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        // No profile properties in offline mode.
        out.uuid(self.uuid).string(&self.username).varint(0);
        Ok(())
    }
}

impl DecodePacket for LoginSuccess {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let uuid = fields.uuid()?;
        let username = fields.string(MAX_USERNAME_CHARS)?;
        // Properties are never populated by this server; skip them.
        fields.rest();
        Ok(LoginSuccess { uuid, username })
    }
}

// ---------------------------------------------------------------------------
// Play
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl GameMode {
    pub fn id(self) -> u8 {
        match self {
            GameMode::Survival => 0,
            GameMode::Creative => 1,
            GameMode::Adventure => 2,
            GameMode::Spectator => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Peaceful,
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub fn id(self) -> u8 {
        match self {
            Difficulty::Peaceful => 0,
            Difficulty::Easy => 1,
            Difficulty::Normal => 2,
            Difficulty::Hard => 3,
        }
    }
}

/// Play-state session init.
#[derive(Debug, Clone)]
pub struct JoinGame<'a> {
    pub entity_id: i32,
    pub hardcore: bool,
    pub game_mode: GameMode,
    /// `None` is sent as -1.
    pub previous_game_mode: Option<GameMode>,
    pub dimension_names: &'a [&'a str],
    pub registry_codec: &'a BaseNbt,
    pub dimension_type: &'a str,
    pub dimension_name: &'a str,
    pub hashed_seed: i64,
    pub max_players: i32,
    pub view_distance: i32,
    pub simulation_distance: i32,
    pub reduced_debug_info: bool,
    pub enable_respawn_screen: bool,
    pub is_debug: bool,
    pub is_flat: bool,
}

impl Packet for JoinGame<'_> {
    const ID: i32 = ids::play::LOGIN;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.i32(self.entity_id)
            .bool(self.hardcore)
            .u8(self.game_mode.id())
            .i8(self.previous_game_mode.map_or(-1, |mode| mode.id() as i8))
            .varint(self.dimension_names.len() as i32);
        for name in self.dimension_names {
            out.string(name);
        }
        out.nbt(self.registry_codec)
            .string(self.dimension_type)
            .string(self.dimension_name)
            .i64(self.hashed_seed)
            .varint(self.max_players)
            .varint(self.view_distance)
            .varint(self.simulation_distance)
            .bool(self.reduced_debug_info)
            .bool(self.enable_respawn_screen)
            .bool(self.is_debug)
            .bool(self.is_flat)
            // No death location.
            .bool(false);
        Ok(())
    }
}

/// Plugin channel message, e.g. `minecraft:brand`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomPayload {
    pub channel: String,
    pub data: Vec<u8>,
}

impl CustomPayload {
    /// The brand channel carries a single string.
    pub fn brand(name: &str) -> Self {
        let mut data = FieldWriter::new();
        data.string(name);
        Self {
            channel: "minecraft:brand".to_string(),
            data: data.into_bytes(),
        }
    }
}

impl Packet for CustomPayload {
    const ID: i32 = ids::play::CUSTOM_PAYLOAD;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.string(&self.channel).raw(&self.data);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeDifficulty {
    pub difficulty: Difficulty,
    pub locked: bool,
}

impl Packet for ChangeDifficulty {
    const ID: i32 = ids::play::CHANGE_DIFFICULTY;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.u8(self.difficulty.id()).bool(self.locked);
        Ok(())
    }
}

/// Bits of [`PlayerAbilities::flags`].
pub mod abilities {
    pub const INVULNERABLE: i8 = 0x01;
    pub const FLYING: i8 = 0x02;
    pub const ALLOW_FLYING: i8 = 0x04;
    pub const INSTANT_BREAK: i8 = 0x08;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerAbilities {
    pub flags: i8,
    pub flying_speed: f32,
    pub fov_modifier: f32,
}

impl Packet for PlayerAbilities {
    const ID: i32 = ids::play::PLAYER_ABILITIES;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.i8(self.flags)
            .f32(self.flying_speed)
            .f32(self.fov_modifier);
        Ok(())
    }
}

/// Absolute teleport that the client must confirm with `teleport_id`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncPlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub teleport_id: i32,
    pub dismount_vehicle: bool,
}

impl SyncPlayerPosition {
    pub fn at(x: f64, y: f64, z: f64, teleport_id: i32) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
            teleport_id,
            dismount_vehicle: true,
        }
    }
}

impl Packet for SyncPlayerPosition {
    const ID: i32 = ids::play::PLAYER_POSITION;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.f64(self.x)
            .f64(self.y)
            .f64(self.z)
            .f32(self.yaw)
            .f32(self.pitch)
            // All coordinates absolute.
            .u8(0)
            .varint(self.teleport_id)
            .bool(self.dismount_vehicle);
        Ok(())
    }
}

/// Player info "add player" action for a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfoAdd {
    pub uuid: Uuid,
    pub username: String,
    pub game_mode: GameMode,
    pub latency_ms: i32,
}

impl Packet for PlayerInfoAdd {
    const ID: i32 = ids::play::PLAYER_INFO;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.varint(0) // add player
            .varint(1)
            .uuid(self.uuid)
            .string(&self.username)
            .varint(0) // properties
            .varint(self.game_mode.id() as i32)
            .varint(self.latency_ms)
            .bool(false) // display name
            .bool(false); // signature data
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetChunkCacheCenter {
    pub chunk_x: i32,
    pub chunk_z: i32,
}

impl Packet for SetChunkCacheCenter {
    const ID: i32 = ids::play::SET_CHUNK_CACHE_CENTER;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.varint(self.chunk_x).varint(self.chunk_z);
        Ok(())
    }
}

/// Chunk column with no block entities and no light data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChunkWithLight {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub sections: Vec<u8>,
}

impl Packet for LevelChunkWithLight {
    const ID: i32 = ids::play::LEVEL_CHUNK_WITH_LIGHT;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.i32(self.chunk_x)
            .i32(self.chunk_z)
            .nbt(&network_root(NbtCompound::new())) // heightmaps
            .byte_array(&self.sections)
            .varint(0) // block entities
            .bool(false) // trust edges
            .bit_set(&[]) // sky light mask
            .bit_set(&[]) // block light mask
            .bit_set(&[]) // empty sky light mask
            .bit_set(&[]) // empty block light mask
            .varint(0) // sky light arrays
            .varint(0); // block light arrays
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetDefaultSpawnPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub angle: f32,
}

impl Packet for SetDefaultSpawnPosition {
    const ID: i32 = ids::play::SET_DEFAULT_SPAWN_POSITION;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.position(self.x, self.y, self.z).f32(self.angle);
        Ok(())
    }
}

/// Chat type registry id of plain system messages.
pub const SYSTEM_CHAT_TYPE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemChat {
    pub message: ChatMessage,
    pub chat_type: i32,
}

impl Packet for SystemChat {
    const ID: i32 = ids::play::SYSTEM_CHAT;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.string(&self.message.to_json()?).varint(self.chat_type);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub id: i64,
}

impl Packet for KeepAlive {
    const ID: i32 = ids::play::KEEP_ALIVE;

    fn write_fields(&self, out: &mut FieldWriter) -> Result<(), CodecError> {
        out.i64(self.id);
        Ok(())
    }
}

impl DecodePacket for KeepAlive {
    fn read_fields(fields: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(KeepAlive { id: fields.i64()? })
    }
}
