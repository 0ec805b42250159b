//! # Pose Relay Server Library
//!
//! This library provides the real-time player-state relay. Game clients connect
//! over TCP, receive a numeric identity, stream their position and yaw, and see
//! every other player's updates relayed back to them with minimal latency.
//!
//! ## Core Responsibilities
//!
//! ### Identity Assignment
//! Each accepted connection claims the lowest free slot of a fixed-size slot
//! table. The slot index is the player identity for the lifetime of the
//! connection and is reused once the connection goes away.
//!
//! ### Relay
//! Inbound `UPDATE` messages are recorded in the world state and relayed
//! verbatim to every session, the sender included by default. Any other text
//! is relayed without interpretation.
//!
//! ### Join and Leave Announcements
//! A newcomer receives `INIT` with its identity, everyone else receives a
//! `SPAWN` for it, and the newcomer receives a `SPAWN` for each existing peer.
//! When a session ends, its slot is freed and `DESPAWN` is broadcast.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! The acceptor and every session run as independent tokio tasks. Each session
//! additionally owns a writer task that drains a bounded outbound queue onto
//! the socket, so a slow client never stalls anyone else.
//!
//! ### One Lock, One Order
//! The slot table, the world state and the outbound queues live together in
//! the [`registry::Registry`], guarded by a single mutex. Every broadcast
//! enqueues while holding it, which gives each client a consistent order of
//! messages and keeps replay snapshots in step with the active set.
//!
//! ## Module Organization
//!
//! - [`config`]: runtime settings and identity policy
//! - [`slots`]: fixed-capacity slot allocation
//! - [`world`]: last known pose per slot
//! - [`registry`]: the lock-guarded combination of the above plus outbound handles
//! - [`broadcast`]: framing once and fanning out to outbound queues
//! - [`session`]: per-connection state machine and message handling
//! - [`network`]: listener, accept loop and shutdown
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Trust Model
//!
//! There is no authentication. By default the identity inside an `UPDATE` is
//! trusted as sent, so a client can move another player;
//! [`config::IdentityPolicy::BindToSender`] restricts updates to the sender's
//! own slot.

pub mod broadcast;
pub mod config;
pub mod network;
pub mod registry;
pub mod session;
pub mod slots;
pub mod world;

pub use config::{IdentityPolicy, ServerConfig};
pub use network::{Server, ServerError};
