//! Server state shared by the accept loop and every session task.

use crate::access_list::AccessList;
use crate::config::ServerConfig;
use crate::error::Rejection;
use crate::registry::{Registration, Registry};
use place_shared::{Board, Packet, Tile, TileRequest};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

pub struct ServerState {
    pub config: ServerConfig,
    /// The single critical section: board, identities and broadcast order
    registry: Mutex<Registry>,
    /// Guarded on its own; never held together with the registry lock
    access_list: Arc<RwLock<AccessList>>,
}

impl ServerState {
    pub fn new(config: ServerConfig, access_list: AccessList) -> Self {
        let registry = Registry::new(config.dim, config.max_clients);
        Self {
            config,
            registry: Mutex::new(registry),
            access_list: Arc::new(RwLock::new(access_list)),
        }
    }

    pub async fn is_allowed(&self, ip: &str) -> bool {
        self.access_list.read().await.allowed(ip)
    }

    pub async fn try_register(
        &self,
        username: &str,
        addr: SocketAddr,
        sender: mpsc::Sender<Packet>,
    ) -> Result<Registration, Rejection> {
        self.registry
            .lock()
            .await
            .try_register(username, addr, sender)
    }

    pub async fn change_tile(&self, owner: &str, request: TileRequest) -> Option<Tile> {
        self.registry.lock().await.change_tile(owner, request)
    }

    pub async fn unregister(&self, username: &str, session_id: u64) -> bool {
        self.registry.lock().await.unregister(username, session_id)
    }

    pub async fn snapshot(&self) -> Board {
        self.registry.lock().await.snapshot()
    }

    pub async fn online(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn usernames(&self) -> Vec<String> {
        self.registry.lock().await.usernames()
    }

    /// Handle for changing the access list while the server runs
    pub fn access_list(&self) -> Arc<RwLock<AccessList>> {
        Arc::clone(&self.access_list)
    }
}
