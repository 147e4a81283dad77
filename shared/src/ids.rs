//! Packet type codes for protocol 759 (1.19), grouped by connection state.

pub mod handshake {
    pub const HANDSHAKE: i32 = 0x00;
}

pub mod status {
    pub const STATUS_REQUEST: i32 = 0x00;
    pub const PING_REQUEST: i32 = 0x01;

    pub const STATUS_RESPONSE: i32 = 0x00;
    pub const PING_RESPONSE: i32 = 0x01;
}

pub mod login {
    pub const LOGIN_START: i32 = 0x00;

    pub const DISCONNECT: i32 = 0x00;
    pub const LOGIN_SUCCESS: i32 = 0x02;
}

/// Clientbound play packets. Serverbound play packets are never decoded.
pub mod play {
    pub const CHANGE_DIFFICULTY: i32 = 0x0B;
    pub const CUSTOM_PAYLOAD: i32 = 0x15;
    pub const KEEP_ALIVE: i32 = 0x1E;
    pub const LEVEL_CHUNK_WITH_LIGHT: i32 = 0x1F;
    pub const LOGIN: i32 = 0x23;
    pub const PLAYER_ABILITIES: i32 = 0x2F;
    pub const PLAYER_INFO: i32 = 0x34;
    pub const PLAYER_POSITION: i32 = 0x36;
    pub const SET_CHUNK_CACHE_CENTER: i32 = 0x48;
    pub const SET_DEFAULT_SPAWN_POSITION: i32 = 0x4A;
    pub const SYSTEM_CHAT: i32 = 0x5F;
}
