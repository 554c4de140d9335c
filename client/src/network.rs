use crate::error::ClientError;
use futures::{SinkExt, StreamExt};
use log::info;
use place_shared::{is_valid_username, Board, Packet, PacketCodec, PROTOCOL_VERSION};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// A connection that completed the login handshake
pub struct Connection<S = TcpStream> {
    pub username: String,
    /// Snapshot sent right after the login was accepted
    pub board: Board,
    pub framed: Framed<S, PacketCodec>,
}

/// Connects to `addr` and logs in as `username`.
pub async fn connect(addr: &str, username: &str) -> Result<Connection, ClientError> {
    if !is_valid_username(username) {
        return Err(ClientError::InvalidUsername);
    }

    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    handshake(stream, username).await
}

/// Runs the login handshake over an already open stream.
///
/// Expects `LoginSuccess` followed by `Board`; an `Error` from the server becomes
/// [`ClientError::Rejected`] carrying its reason.
pub async fn handshake<S>(stream: S, username: &str) -> Result<Connection<S>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, PacketCodec::new());
    framed
        .send(Packet::Login {
            username: username.to_string(),
            protocol_version: PROTOCOL_VERSION,
        })
        .await?;

    let username = match next_packet(&mut framed).await? {
        Packet::LoginSuccess { username } => username,
        Packet::Error { reason } => return Err(ClientError::Rejected(reason)),
        other => return Err(ClientError::Unexpected(other.kind())),
    };
    info!("Login successful as {}", username);

    let board = match next_packet(&mut framed).await? {
        Packet::Board { board } => board,
        Packet::Error { reason } => return Err(ClientError::Rejected(reason)),
        other => return Err(ClientError::Unexpected(other.kind())),
    };
    if !board.is_well_formed() {
        return Err(ClientError::MalformedBoard);
    }

    Ok(Connection {
        username,
        board,
        framed,
    })
}

async fn next_packet<S>(framed: &mut Framed<S, PacketCodec>) -> Result<Packet, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(result) => Ok(result?),
        None => Err(ClientError::Closed),
    }
}
