//! # Canvas Client Library
//!
//! This library provides the client side of the shared canvas: logging in to a
//! server, mirroring its board locally and submitting repaint requests.
//!
//! ## Architecture Overview
//!
//! The client never changes its board on its own. A request is checked against
//! the local board, sent, and only takes effect once the server broadcasts the
//! applied change back. Every client therefore converges on the server's order
//! of changes, including the ones it sent itself.
//!
//! ### Handshake
//! A fresh connection sends `Login` and expects `LoginSuccess` followed by the
//! full `Board`. An `Error` instead carries the server's human-readable reason.
//!
//! ### Event Subscription
//! After the handshake the connection is handed to a [`model::ClientModel`]. It
//! runs a listener task that patches the local board and then notifies
//! subscribers, plus a writer task that forwards queued requests.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! TCP connect and the login handshake.
//!
//! ### Model Module (`model`)
//! The local board, change submission and the event stream:
//! - `TileChanged` for every applied change
//! - `Closed` with a reason when the connection ends
//!
//! ### Error Module (`error`)
//! Everything that can go wrong on the client, rejections included.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use place_client::model::{ClientModel, ModelEvent};
//! use place_shared::Color;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = ClientModel::connect("127.0.0.1:8080", "alice").await?;
//!     let mut events = model.subscribe();
//!
//!     model.change_tile(0, 0, Color::Red).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             ModelEvent::TileChanged(tile) => println!("{} painted ({}, {})", tile.owner, tile.row, tile.col),
//!             ModelEvent::Closed { reason } => {
//!                 println!("{}", reason);
//!                 break;
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod model;
pub mod network;
