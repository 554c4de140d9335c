//! Server network layer: the TCP listener and the accept loop

use crate::access_list::{AccessList, AccessMode};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::session::Session;
use crate::state::ServerState;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Accepts connections and hands each one to its own [`Session`] task
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    /// Validates `config`, loads the configured access list and binds the listener.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let access_list = match &config.access_list {
            Some(path) => AccessList::load(path, config.access_mode),
            None => {
                if config.access_mode == AccessMode::AllowOnly {
                    return Err(ServerError::Config(
                        "allow-only mode needs an access list file".to_string(),
                    ));
                }
                AccessList::new(config.access_mode)
            }
        };

        Self::with_access_list(config, access_list).await
    }

    /// Binds with an access list built by the caller.
    pub async fn with_access_list(
        config: ServerConfig,
        access_list: AccessList,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind_addr()).await?;
        info!(
            "Server listening on {} ({}x{} board, max {} clients)",
            listener.local_addr()?,
            config.dim,
            config.dim,
            config.max_clients
        );

        Ok(Server {
            listener,
            state: Arc::new(ServerState::new(config, access_list)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    pub fn access_list(&self) -> Arc<RwLock<AccessList>> {
        self.state.access_list()
    }

    /// Accepts connections until the process is killed.
    ///
    /// A failed accept is logged and retried; it never takes the server down.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }

                    let session = Session::new(stream, addr, Arc::clone(&self.state));
                    tokio::spawn(session.run());
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
