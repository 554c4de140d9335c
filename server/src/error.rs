use place_shared::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a login was refused. The `Display` text is exactly what the client
/// receives in the `Error` packet.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Invalid Username!")]
    InvalidUsername,

    #[error("Unsupported Protocol Version!")]
    UnsupportedVersion,

    #[error("You Are Not Allowed On This Server!")]
    NotAllowed,

    #[error("Server Is Full!")]
    ServerFull,

    #[error("Username Already In Use!")]
    UsernameTaken,

    #[error("Invalid Command: Terminating Connection")]
    ProtocolViolation,
}

/// Why a session ended; only ever logged.
#[derive(Debug, Error)]
pub enum SessionEnd {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("rejected: {0}")]
    Rejected(Rejection),

    #[error("no login within the handshake timeout")]
    HandshakeTimeout,

    #[error("protocol violation: unexpected {0}")]
    Violation(&'static str),

    #[error("transport fault: {0}")]
    Transport(#[from] CodecError),

    #[error("write timed out")]
    WriteTimeout,

    #[error("evicted after its outbound queue failed")]
    Evicted,
}
