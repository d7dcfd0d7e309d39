//! # Round Barrier Server Library
//!
//! This library implements a turn-coordination server for multiplayer games.
//! Players connect over WebSocket and send one move per round; once every
//! expected player has moved, the round is handed to a pluggable resolver
//! and the resulting game state is broadcast to everyone.
//!
//! ## Core Responsibilities
//!
//! ### Round Synchronization
//! The server buffers at most one move per connected player. A later move
//! from the same player replaces the earlier one. When enough distinct
//! players have moved, the round is resolved, broadcast and reset in one
//! step.
//!
//! ### Membership Churn
//! Players may leave at any time. Their pending move is discarded right
//! away and completion is re-checked, so the remaining players are never
//! left waiting on someone who is gone. Departures only count once the
//! table has been full; before that the server waits for the expected
//! number of players.
//!
//! ### Broadcast Isolation
//! Every send is bounded by a timeout. A player that cannot be written to
//! is dropped without holding back delivery to the others.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! Socket tasks never touch round state. They push `ServerEvent`s into one
//! channel, and a single loop applies them to the [`coordinator::RoundCoordinator`]
//! in order. Moves that arrive while a round is being resolved simply wait
//! in the channel.
//!
//! ## Module Organization
//!
//! - `registry`: connected participants and their handles
//! - `round_buffer`: pending moves for the current round
//! - `coordinator`: completion detection and the round-finish sequence
//! - `broadcaster`: timeout-bounded fan-out of round results
//! - `resolver`: the game-rules seam and built-in resolvers
//! - `network`: WebSocket transport and the server loop
//! - `config`: deployer-facing settings
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::{ResolverKind, ServerConfig};
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:8080".to_string(),
//!         expected_players: 3,
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(&config, ResolverKind::Summary.build("")).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod network;
pub mod registry;
pub mod resolver;
pub mod round_buffer;
