//! Types and wire format shared by the canvas server and its clients.

pub mod board;
pub mod codec;
pub mod color;
pub mod packet;

pub use board::{Board, Tile, TileRequest};
pub use codec::{CodecError, PacketCodec};
pub use color::Color;
pub use packet::Packet;

/// Version carried in every `Login`; bumped whenever the packet set changes
/// incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_CLIENTS: usize = 100;
pub const MAX_DIM: u32 = 256;
pub const MAX_USERNAME_LEN: usize = 32;

/// Pause clients observe between their own change requests
pub const COOLDOWN_MS: u64 = 500;

/// Checks an identity string before it is sent or accepted.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && !username.chars().any(char::is_control)
}
