//! Live sessions and the authoritative board.
//!
//! The registry is the only owner of both the board and the identity map, and
//! it is only ever used behind a single lock (see [`crate::state`]). Every
//! operation that must be totally ordered happens inside one method call:
//! - registering a session and taking the snapshot it starts from
//! - validating, applying and broadcasting a tile change
//! - evicting sessions whose outbound queue has failed
//!
//! Broadcast never waits on a socket. Each session owns a bounded queue that
//! its own task drains; a queue that is full or closed gets its session
//! evicted instead of stalling everyone else.

use crate::error::Rejection;
use log::{debug, info, warn};
use place_shared::{Board, Packet, Tile, TileRequest};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis()
        .min(u64::MAX as u128) as u64
}

/// The registry's view of one established session
#[derive(Debug)]
pub struct SessionHandle {
    /// Unique per registration, so a stale teardown cannot remove a newer
    /// session that reused the same identity
    pub id: u64,
    pub addr: SocketAddr,
    /// Outbound queue drained by the session's own task
    pub sender: mpsc::Sender<Packet>,
}

/// What a session receives when its registration succeeds
#[derive(Debug)]
pub struct Registration {
    pub session_id: u64,
    /// Board as of the instant of registration; every later change reaches
    /// the session through its queue
    pub board: Board,
}

pub struct Registry {
    board: Board,
    sessions: HashMap<String, SessionHandle>,
    next_session_id: u64,
    max_clients: usize,
    /// Last timestamp handed out, keeps write times non-decreasing
    last_time: u64,
}

impl Registry {
    pub fn new(dim: u32, max_clients: usize) -> Self {
        let now = now_millis();
        Self {
            board: Board::new(dim, now),
            sessions: HashMap::new(),
            next_session_id: 1,
            max_clients,
            last_time: now,
        }
    }

    /// Atomically checks capacity and uniqueness, then inserts the session.
    ///
    /// Capacity is checked before uniqueness, so a full server reports
    /// [`Rejection::ServerFull`] even for a name that is taken.
    pub fn try_register(
        &mut self,
        username: &str,
        addr: SocketAddr,
        sender: mpsc::Sender<Packet>,
    ) -> Result<Registration, Rejection> {
        if self.sessions.len() >= self.max_clients {
            return Err(Rejection::ServerFull);
        }
        if self.sessions.contains_key(username) {
            return Err(Rejection::UsernameTaken);
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        self.sessions.insert(
            username.to_string(),
            SessionHandle {
                id: session_id,
                addr,
                sender,
            },
        );
        info!(
            "{} joined as {}: {} online",
            addr,
            username,
            self.sessions.len()
        );

        Ok(Registration {
            session_id,
            board: self.board.snapshot(),
        })
    }

    /// The central mutation entry point.
    ///
    /// Invalid requests are dropped and `None` is returned. A valid request is
    /// stamped with `owner` and a fresh timestamp, applied, and broadcast to
    /// every registered session, the sender included.
    pub fn change_tile(&mut self, owner: &str, request: TileRequest) -> Option<Tile> {
        if !self.board.validate(&request) {
            debug!("Dropping invalid change from {}: {:?}", owner, request);
            return None;
        }

        let time = self.next_time();
        let tile = request.into_tile(owner, time)?;
        self.board.apply(tile.clone());

        self.broadcast(Packet::TileChanged { tile: tile.clone() });
        Some(tile)
    }

    fn next_time(&mut self) -> u64 {
        self.last_time = self.last_time.max(now_millis());
        self.last_time
    }

    /// Queues `packet` for every session and evicts those whose queue failed.
    fn broadcast(&mut self, packet: Packet) {
        let mut evicted = Vec::new();

        for (username, handle) in &self.sessions {
            match handle.sender.try_send(packet.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("{} is not keeping up, evicting", username);
                    evicted.push(username.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("{} already closed its queue", username);
                    evicted.push(username.clone());
                }
            }
        }

        for username in &evicted {
            // Dropping the handle closes the queue, which ends the session task
            if self.sessions.remove(username).is_some() {
                info!(
                    "{} evicted: {} online",
                    username,
                    self.sessions.len()
                );
            }
        }
    }

    /// Removes the session registered as `username` with `session_id`.
    ///
    /// A no-op returning false when the session is already gone or the name now
    /// belongs to a newer session.
    pub fn unregister(&mut self, username: &str, session_id: u64) -> bool {
        match self.sessions.get(username) {
            Some(handle) if handle.id == session_id => {
                self.sessions.remove(username);
                info!("{} logged out: {} online", username, self.sessions.len());
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> Board {
        self.board.snapshot()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn contains(&self, username: &str) -> bool {
        self.sessions.contains_key(username)
    }

    pub fn usernames(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    /// Returns the number of registered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use place_shared::Color;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn queue() -> (mpsc::Sender<Packet>, mpsc::Receiver<Packet>) {
        mpsc::channel(16)
    }

    fn expect_tile_changed(rx: &mut mpsc::Receiver<Packet>) -> Tile {
        match rx.try_recv() {
            Ok(Packet::TileChanged { tile }) => tile,
            other => panic!("Expected TileChanged, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new(3, 5);
        assert_eq!(registry.max_clients(), 5);
        assert!(registry.is_empty());
        assert_eq!(registry.board().dim(), 3);
    }

    #[test]
    fn test_register_returns_snapshot_and_unique_ids() {
        let mut registry = Registry::new(3, 5);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        let alice = registry.try_register("alice", test_addr(), tx1).unwrap();
        let bob = registry.try_register("bob", test_addr(), tx2).unwrap();

        assert_ne!(alice.session_id, bob.session_id);
        assert_eq!(alice.board.dim(), 3);
        assert!(alice.board.tiles().all(|t| t.color == Color::White));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut registry = Registry::new(3, 5);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        registry.try_register("alice", test_addr(), tx1).unwrap();
        let result = registry.try_register("alice", test_addr(), tx2);

        assert_eq!(result.unwrap_err(), Rejection::UsernameTaken);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_capacity_enforced_before_uniqueness() {
        let mut registry = Registry::new(3, 1);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();
        let (tx3, _rx3) = queue();

        registry.try_register("alice", test_addr(), tx1).unwrap();
        assert_eq!(
            registry.try_register("bob", test_addr(), tx2).unwrap_err(),
            Rejection::ServerFull
        );
        assert_eq!(
            registry.try_register("alice", test_addr(), tx3).unwrap_err(),
            Rejection::ServerFull
        );
        assert!(!registry.contains("bob"));
    }

    #[test]
    fn test_unregister_requires_matching_session() {
        let mut registry = Registry::new(3, 5);
        let (tx1, _rx1) = queue();
        let (tx2, _rx2) = queue();

        let first = registry.try_register("alice", test_addr(), tx1).unwrap();
        assert!(registry.unregister("alice", first.session_id));
        assert!(!registry.unregister("alice", first.session_id));

        let second = registry.try_register("alice", test_addr(), tx2).unwrap();
        // a late teardown of the first session must not remove the second
        assert!(!registry.unregister("alice", first.session_id));
        assert!(registry.contains("alice"));
        assert!(registry.unregister("alice", second.session_id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_change_broadcasts_to_everyone_including_sender() {
        let mut registry = Registry::new(3, 5);
        let (tx1, mut rx1) = queue();
        let (tx2, mut rx2) = queue();
        registry.try_register("alice", test_addr(), tx1).unwrap();
        registry.try_register("bob", test_addr(), tx2).unwrap();

        let tile = registry
            .change_tile("alice", TileRequest::new(1, 1, Color::Red))
            .unwrap();

        assert_eq!(tile.owner, "alice");
        assert_eq!(expect_tile_changed(&mut rx1), tile);
        assert_eq!(expect_tile_changed(&mut rx2), tile);
        assert_eq!(registry.board().get(1, 1), Some(&tile));
    }

    #[test]
    fn test_invalid_change_is_dropped_silently() {
        let mut registry = Registry::new(3, 5);
        let (tx, mut rx) = queue();
        registry.try_register("alice", test_addr(), tx).unwrap();
        let before = registry.snapshot();

        assert!(registry
            .change_tile("alice", TileRequest::new(5, 5, Color::Red))
            .is_none());
        assert!(registry
            .change_tile(
                "alice",
                TileRequest {
                    row: 0,
                    col: 0,
                    color: 99
                }
            )
            .is_none());

        assert!(rx.try_recv().is_err());
        assert_eq!(registry.snapshot(), before);
        assert!(registry.contains("alice"));
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let mut registry = Registry::new(3, 5);
        let mut last = 0;
        for i in 0..50 {
            let tile = registry
                .change_tile("alice", TileRequest::new(i % 3, i % 3, Color::Blue))
                .unwrap();
            assert!(tile.time >= last);
            last = tile.time;
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = Registry::new(3, 5);
        registry.change_tile("alice", TileRequest::new(0, 2, Color::Red));
        registry.change_tile("bob", TileRequest::new(0, 2, Color::Green));

        let tile = registry.board().get(0, 2).unwrap();
        assert_eq!(tile.color, Color::Green);
        assert_eq!(tile.owner, "bob");
    }

    #[test]
    fn test_full_queue_evicts_only_that_session() {
        let mut registry = Registry::new(3, 5);
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = queue();
        registry.try_register("slow", test_addr(), slow_tx).unwrap();
        registry.try_register("fast", test_addr(), fast_tx).unwrap();

        registry.change_tile("fast", TileRequest::new(0, 0, Color::Red));
        registry.change_tile("fast", TileRequest::new(0, 1, Color::Red));

        assert!(!registry.contains("slow"));
        assert!(registry.contains("fast"));
        expect_tile_changed(&mut fast_rx);
        expect_tile_changed(&mut fast_rx);
    }

    #[test]
    fn test_closed_queue_is_evicted() {
        let mut registry = Registry::new(3, 5);
        let (tx, rx) = queue();
        registry.try_register("gone", test_addr(), tx).unwrap();
        drop(rx);

        registry.change_tile("someone", TileRequest::new(0, 0, Color::Red));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_after_change_shows_owner() {
        let mut registry = Registry::new(3, 5);
        registry.change_tile("alice", TileRequest::new(1, 1, Color::Red));

        let (tx, _rx) = queue();
        let carol = registry.try_register("carol", test_addr(), tx).unwrap();
        let tile = carol.board.get(1, 1).unwrap();
        assert_eq!(tile.color, Color::Red);
        assert_eq!(tile.owner, "alice");
    }
}
