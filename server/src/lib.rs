//! # Canvas Server Library
//!
//! This library provides the authoritative server for the shared canvas. It owns
//! the one true board, admits clients through a login handshake, applies their
//! repaint requests and fans every applied change out to everyone connected.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Board
//! The server holds the definitive `dim x dim` grid. Clients never write to it
//! directly: they send change requests, and only requests that pass validation
//! are applied, stamped with the sender's identity and a server timestamp.
//!
//! ### Session Management
//! Handles the complete lifecycle of client connections including:
//! - Login handshake with access control, capacity and identity checks
//! - Forwarding change requests to the registry
//! - Delivering broadcasts in order
//! - Teardown on logout, protocol violation or transport fault
//!
//! ### Change Broadcasting
//! Every applied change is pushed to every registered session, the sender
//! included, so all clients observe the same changes in the same order.
//!
//! ## Architecture Design
//!
//! ### Single Critical Section
//! The board and the identity registry live together behind one lock. Register
//! plus snapshot, and validate plus apply plus broadcast, each happen inside a
//! single acquisition, which gives a strict total order of mutations and means
//! a joining client can never see a torn board.
//!
//! ### Task Per Connection
//! Each accepted TCP connection runs as its own lightweight tokio task. Tasks
//! only meet at the shared state. The access list has its own lock and is not
//! on the broadcast path.
//!
//! ### Non-Blocking Fan-Out
//! Broadcast only enqueues onto each session's bounded queue. A session that
//! cannot keep up, or whose socket write times out, is torn down on its own
//! without delaying anyone else.
//!
//! ## Module Organization
//!
//! ### Access List Module (`access_list`)
//! File-backed IP allow/deny set consulted during the handshake.
//!
//! ### Registry Module (`registry`)
//! The board plus the identity-to-session map:
//! - Atomic check-and-insert against capacity and uniqueness
//! - Validation, timestamping, application and broadcast of changes
//! - Eviction of sessions whose queue failed
//!
//! ### Session Module (`session`)
//! The per-connection state machine and its receive/send loop.
//!
//! ### Network Module (`network`)
//! TCP listener and accept loop.
//!
//! ### Throttle Module (`throttle`)
//! Per-session token bucket limiting how fast change requests are accepted.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use place_server::config::ServerConfig;
//! use place_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 8080,
//!         dim: 32,
//!         ..ServerConfig::default()
//!     };
//!
//!     // Runs the accept loop until the process is killed
//!     Server::bind(config).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod access_list;
pub mod config;
pub mod error;
pub mod network;
pub mod registry;
pub mod session;
pub mod state;
pub mod throttle;
