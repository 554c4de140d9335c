//! Client-side view of the board kept in step with the server.
//!
//! The model owns the connection once the handshake is done. A listener task
//! applies every `TileChanged` to the local board before publishing it, so a
//! subscriber that reads [`ClientModel::board`] after an event always sees that
//! event reflected.

use crate::error::ClientError;
use crate::network::{self, Connection};
use futures::{SinkExt, StreamExt};
use log::{info, warn};
use place_shared::{Board, Color, Packet, PacketCodec, Tile, TileRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

const EVENT_CAPACITY: usize = 256;
const REQUEST_CAPACITY: usize = 64;

pub const LOST_CONNECTION: &str = "Lost connection to server.";
pub const CLOSED_BY_CLIENT: &str = "Connection closed.";

#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A change the server applied; already reflected in the local board
    TileChanged(Tile),
    /// The connection ended; no further events follow
    Closed { reason: String },
}

type PacketSink<S> = futures::stream::SplitSink<Framed<S, PacketCodec>, Packet>;
type PacketStream<S> = futures::stream::SplitStream<Framed<S, PacketCodec>>;

pub struct ClientModel {
    username: String,
    board: Arc<RwLock<Board>>,
    events: broadcast::Sender<ModelEvent>,
    requests: mpsc::Sender<TileRequest>,
    closed: Arc<AtomicBool>,
    /// Cancelled when either side ends the connection; stops the writer
    shutdown: CancellationToken,
    listener: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ClientModel {
    /// Connects, logs in and starts tracking the board.
    pub async fn connect(addr: &str, username: &str) -> Result<Self, ClientError> {
        let connection = network::connect(addr, username).await?;
        Ok(Self::start(connection))
    }

    /// Takes over a connection that already completed the handshake.
    pub fn start<S>(connection: Connection<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let Connection {
            username,
            board,
            framed,
        } = connection;

        let board = Arc::new(RwLock::new(board));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (requests, request_rx) = mpsc::channel(REQUEST_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        let (sink, stream) = framed.split();
        let listener = tokio::spawn(listen(
            stream,
            Arc::clone(&board),
            events.clone(),
            Arc::clone(&closed),
            shutdown.clone(),
        ));
        let writer = tokio::spawn(forward_requests(sink, request_rx, shutdown.clone()));

        ClientModel {
            username,
            board,
            events,
            requests,
            closed,
            shutdown,
            listener,
            writer,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    /// A copy of the current local board.
    pub async fn board(&self) -> Board {
        self.board.read().await.snapshot()
    }

    /// Asks the server to repaint a cell.
    ///
    /// Requests that cannot be valid on the local board are refused here and
    /// never sent. Success only means the request was queued; the board changes
    /// when the server broadcasts the result.
    pub async fn change_tile(&self, row: u32, col: u32, color: Color) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let request = TileRequest::new(row, col, color);
        if !self.board.read().await.validate(&request) {
            return Err(ClientError::InvalidTile {
                row,
                col,
                color: color.id(),
            });
        }

        self.requests
            .send(request)
            .await
            .map_err(|_| ClientError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drops the connection. Subscribers get a final `Closed` event.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.shutdown.cancel();
        self.listener.abort();
        self.writer.abort();
        let _ = self.events.send(ModelEvent::Closed {
            reason: CLOSED_BY_CLIENT.to_string(),
        });
        info!("Disconnected from server");
    }
}

impl Drop for ClientModel {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.listener.abort();
        self.writer.abort();
    }
}

async fn listen<S>(
    mut stream: PacketStream<S>,
    board: Arc<RwLock<Board>>,
    events: broadcast::Sender<ModelEvent>,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let reason = loop {
        let packet = match stream.next().await {
            Some(Ok(packet)) => packet,
            Some(Err(e)) => {
                warn!("Error reading from server: {}", e);
                break LOST_CONNECTION.to_string();
            }
            None => break LOST_CONNECTION.to_string(),
        };

        match packet {
            Packet::TileChanged { tile } => {
                if board.write().await.apply(tile.clone()) {
                    let _ = events.send(ModelEvent::TileChanged(tile));
                } else {
                    warn!("Ignoring change outside the board: ({}, {})", tile.row, tile.col);
                }
            }
            Packet::Error { reason } => break reason,
            // BOARD only ever follows LOGIN_SUCCESS during the handshake
            other => {
                warn!("Protocol violation: unexpected {} from server", other.kind());
                break unexpected_reason(other.kind());
            }
        }
    };

    // Dropping both halves closes the socket
    shutdown.cancel();
    drop(stream);

    if !closed.swap(true, Ordering::SeqCst) {
        info!("Connection ended: {}", reason);
        let _ = events.send(ModelEvent::Closed { reason });
    }
}

fn unexpected_reason(kind: &str) -> String {
    format!("Unexpected {} from server.", kind)
}

async fn forward_requests<S>(
    mut sink: PacketSink<S>,
    mut requests: mpsc::Receiver<TileRequest>,
    shutdown: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let request = tokio::select! {
            _ = shutdown.cancelled() => break,
            request = requests.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        if let Err(e) = sink.send(Packet::ChangeTile { request }).await {
            warn!("Failed to send change request: {}", e);
            break;
        }
    }
}
