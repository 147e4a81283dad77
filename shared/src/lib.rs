//! Wire types shared by the server and the probe client.
//!
//! Everything here is protocol plumbing with no connection state: the frame
//! codec, the packet table for protocol 759, NBT and chunk encoders, the
//! offline identity derivation and the JSON documents carried inside frames.

pub mod chat;
pub mod chunk;
pub mod codec;
pub mod identity;
pub mod ids;
pub mod nbt;
pub mod packets;
pub mod status;

pub use codec::{read_frame, write_frame, CodecError, FieldReader, FieldWriter, Frame};
pub use identity::offline_uuid;
pub use packets::{DecodePacket, Packet};

/// The only protocol version this server speaks.
pub const PROTOCOL_VERSION: i32 = 759;

/// Game version label reported in status responses.
pub const VERSION_NAME: &str = "1.19";

/// Default port for the protocol.
pub const DEFAULT_PORT: u16 = 25565;
