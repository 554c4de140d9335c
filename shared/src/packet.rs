use crate::board::{Board, Tile, TileRequest};
use serde::{Deserialize, Serialize};

/// Every message either side may put on the wire.
///
/// The bincode variant index is the kind tag, so new kinds are appended at the
/// end and existing ones never reordered.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Packet {
    Login {
        username: String,
        protocol_version: u32,
    },

    LoginSuccess {
        username: String,
    },
    /// Always the last message before the server closes the connection
    Error {
        reason: String,
    },
    Board {
        board: Board,
    },

    ChangeTile {
        request: TileRequest,
    },

    TileChanged {
        tile: Tile,
    },
}

impl Packet {
    pub fn error(reason: impl Into<String>) -> Self {
        Packet::Error {
            reason: reason.into(),
        }
    }

    /// Short kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Login { .. } => "LOGIN",
            Packet::LoginSuccess { .. } => "LOGIN_SUCCESS",
            Packet::Error { .. } => "ERROR",
            Packet::Board { .. } => "BOARD",
            Packet::ChangeTile { .. } => "CHANGE_TILE",
            Packet::TileChanged { .. } => "TILE_CHANGED",
        }
    }
}
