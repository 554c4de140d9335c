use place_shared::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The server refused the login; the text is the server's reason
    #[error("{0}")]
    Rejected(String),

    #[error("invalid username")]
    InvalidUsername,

    #[error("unexpected {0} from server")]
    Unexpected(&'static str),

    #[error("server sent a malformed board")]
    MalformedBoard,

    #[error("({row}, {col}) with colour {color} is not a valid change on this board")]
    InvalidTile { row: u32, col: u32, color: u8 },

    #[error("connection closed")]
    Closed,
}
