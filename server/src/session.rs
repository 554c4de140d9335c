//! One task per connected client, from the login handshake to teardown.
//!
//! ```text
//! Connected -> AwaitingLogin -> Rejected
//!                            -> Established -> Active -> Closed
//! ```
//!
//! The session never touches the board itself. Change requests go to the
//! registry, and whatever the registry broadcasts arrives on the session's
//! outbound queue, which is written to the socket in order.

use crate::error::{Rejection, SessionEnd};
use crate::state::ServerState;
use crate::throttle::Throttle;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use place_shared::{is_valid_username, Packet, PacketCodec, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::codec::Framed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connected,
    AwaitingLogin,
    Rejected,
    Established,
    Active,
    Closed,
}

impl SessionPhase {
    /// Whether a session may move from `self` to `next`.
    pub fn can_enter(self, next: SessionPhase) -> bool {
        matches!(
            (self, next),
            (SessionPhase::Connected, SessionPhase::AwaitingLogin)
                | (SessionPhase::AwaitingLogin, SessionPhase::Rejected)
                | (SessionPhase::AwaitingLogin, SessionPhase::Established)
                | (SessionPhase::Established, SessionPhase::Active)
                | (SessionPhase::Rejected, SessionPhase::Closed)
                | (SessionPhase::Established, SessionPhase::Closed)
                | (SessionPhase::Active, SessionPhase::Closed)
                | (SessionPhase::Closed, SessionPhase::Closed)
        )
    }
}

/// A session that passed the handshake and is in the registry
struct Established {
    username: String,
    session_id: u64,
    outbound: mpsc::Receiver<Packet>,
    board: place_shared::Board,
}

pub struct Session<S> {
    framed: Framed<S, PacketCodec>,
    addr: SocketAddr,
    state: Arc<ServerState>,
    phase: SessionPhase,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, addr: SocketAddr, state: Arc<ServerState>) -> Self {
        Self {
            framed: Framed::new(stream, PacketCodec::new()),
            addr,
            state,
            phase: SessionPhase::Connected,
        }
    }

    fn enter(&mut self, next: SessionPhase) {
        debug_assert!(
            self.phase.can_enter(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        if self.phase != next {
            debug!("{}: {:?} -> {:?}", self.addr, self.phase, next);
        }
        self.phase = next;
    }

    /// Drives the session to completion. Consuming `self` makes teardown
    /// happen exactly once.
    pub async fn run(mut self) {
        self.enter(SessionPhase::AwaitingLogin);

        let established = match self.handshake().await {
            Ok(established) => established,
            Err(end) => {
                self.enter(SessionPhase::Rejected);
                match &end {
                    SessionEnd::Rejected(rejection) => {
                        warn!("Rejected {}: {}", self.addr, rejection)
                    }
                    other => debug!("Handshake with {} failed: {}", self.addr, other),
                }
                self.close().await;
                return;
            }
        };

        self.enter(SessionPhase::Established);
        let Established {
            username,
            session_id,
            mut outbound,
            board,
        } = established;

        let end = match self.greet(&username, board).await {
            Ok(()) => {
                self.enter(SessionPhase::Active);
                self.serve(&username, &mut outbound).await
            }
            Err(end) => end,
        };

        self.teardown(&username, session_id, end).await;
    }

    /// Reads the login and runs every admission check, registering on success.
    async fn handshake(&mut self) -> Result<Established, SessionEnd> {
        let first = match time::timeout(self.state.config.handshake_timeout, self.framed.next())
            .await
        {
            Err(_) => return Err(SessionEnd::HandshakeTimeout),
            Ok(None) => return Err(SessionEnd::PeerClosed),
            Ok(Some(Err(e))) => {
                self.send_error(Rejection::ProtocolViolation).await;
                return Err(e.into());
            }
            Ok(Some(Ok(packet))) => packet,
        };

        let (username, protocol_version) = match first {
            Packet::Login {
                username,
                protocol_version,
            } => (username, protocol_version),
            other => {
                self.send_error(Rejection::ProtocolViolation).await;
                return Err(SessionEnd::Violation(other.kind()));
            }
        };

        let (sender, outbound) = mpsc::channel(self.state.config.outbound_queue);
        match self.admit(&username, protocol_version, sender).await {
            Ok(registration) => Ok(Established {
                username,
                session_id: registration.session_id,
                outbound,
                board: registration.board,
            }),
            Err(rejection) => {
                self.send_error(rejection).await;
                Err(SessionEnd::Rejected(rejection))
            }
        }
    }

    /// The first failing check decides the rejection.
    async fn admit(
        &self,
        username: &str,
        protocol_version: u32,
        sender: mpsc::Sender<Packet>,
    ) -> Result<crate::registry::Registration, Rejection> {
        if !is_valid_username(username) {
            return Err(Rejection::InvalidUsername);
        }
        if protocol_version != PROTOCOL_VERSION {
            return Err(Rejection::UnsupportedVersion);
        }

        let ip = self.addr.ip().to_canonical().to_string();
        if !self.state.is_allowed(&ip).await {
            return Err(Rejection::NotAllowed);
        }

        self.state.try_register(username, self.addr, sender).await
    }

    /// Acknowledges the login and sends the snapshot taken at registration.
    ///
    /// Broadcasts that happened since are already waiting in the outbound
    /// queue, so they follow the snapshot on the wire.
    async fn greet(
        &mut self,
        username: &str,
        board: place_shared::Board,
    ) -> Result<(), SessionEnd> {
        self.send(Packet::LoginSuccess {
            username: username.to_string(),
        })
        .await?;
        self.send(Packet::Board { board }).await
    }

    async fn serve(
        &mut self,
        username: &str,
        outbound: &mut mpsc::Receiver<Packet>,
    ) -> SessionEnd {
        let config = &self.state.config;
        let mut throttle = Throttle::new(config.burst, config.cooldown);

        loop {
            tokio::select! {
                inbound = self.framed.next() => match inbound {
                    None => return SessionEnd::PeerClosed,
                    Some(Err(e)) => {
                        self.send_error(Rejection::ProtocolViolation).await;
                        return e.into();
                    }
                    Some(Ok(Packet::ChangeTile { request })) => {
                        if throttle.try_acquire() {
                            self.state.change_tile(username, request).await;
                        } else {
                            debug!("Throttled change from {}: {:?}", username, request);
                        }
                    }
                    Some(Ok(other)) => {
                        self.send_error(Rejection::ProtocolViolation).await;
                        return SessionEnd::Violation(other.kind());
                    }
                },

                queued = outbound.recv() => match queued {
                    Some(packet) => {
                        if let Err(end) = self.send(packet).await {
                            return end;
                        }
                    }
                    // the registry dropped our handle
                    None => return SessionEnd::Evicted,
                },
            }
        }
    }

    async fn send(&mut self, packet: Packet) -> Result<(), SessionEnd> {
        match time::timeout(self.state.config.write_timeout, self.framed.send(packet)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionEnd::Transport(e)),
            Err(_) => Err(SessionEnd::WriteTimeout),
        }
    }

    /// Best effort: the connection is closed right after either way.
    async fn send_error(&mut self, reason: Rejection) {
        if let Err(end) = self.send(Packet::error(reason.to_string())).await {
            debug!("Could not deliver error to {}: {}", self.addr, end);
        }
    }

    async fn teardown(&mut self, username: &str, session_id: u64, end: SessionEnd) {
        self.enter(SessionPhase::Closed);
        self.state.unregister(username, session_id).await;
        match end {
            SessionEnd::PeerClosed => info!("{} disconnected", username),
            other => info!("Closing session for {}: {}", username, other),
        }
        self.close().await;
    }

    async fn close(&mut self) {
        self.enter(SessionPhase::Closed);
        let _ = time::timeout(self.state.config.write_timeout, self.framed.close()).await;
    }
}
