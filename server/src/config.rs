use crate::access_list::AccessMode;
use crate::error::ServerError;
use place_shared::{COOLDOWN_MS, DEFAULT_MAX_CLIENTS, DEFAULT_PORT, MAX_DIM};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the server needs to start; fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Board side length
    pub dim: u32,
    pub max_clients: usize,
    /// `None` runs with an empty deny-only list, admitting everyone
    pub access_list: Option<PathBuf>,
    pub access_mode: AccessMode,
    /// Refill interval of the per-session change throttle; zero disables it
    pub cooldown: Duration,
    /// Change requests a session may send back to back
    pub burst: u32,
    pub handshake_timeout: Duration,
    pub write_timeout: Duration,
    /// Messages buffered per session before it is considered stuck
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            dim: 16,
            max_clients: DEFAULT_MAX_CLIENTS,
            access_list: None,
            access_mode: AccessMode::DenyOnly,
            cooldown: Duration::from_millis(COOLDOWN_MS),
            burst: 3,
            handshake_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            outbound_queue: 1024,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.dim == 0 || self.dim > MAX_DIM {
            return Err(ServerError::Config(format!(
                "board dimension must be between 1 and {}, got {}",
                MAX_DIM, self.dim
            )));
        }
        if self.max_clients == 0 {
            return Err(ServerError::Config(
                "max clients must be at least 1".to_string(),
            ));
        }
        // mpsc::channel panics on a zero capacity
        if self.outbound_queue == 0 {
            return Err(ServerError::Config(
                "outbound queue must hold at least 1 message".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
