//! # Relay Client Library
//!
//! Headless client for the pose relay server. It speaks the length-prefixed
//! text protocol from [`shared`], keeps a local mirror of the other players,
//! and can drive a random-walking bot for load and smoke testing.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! [`network::RelayClient`] owns the TCP stream and a frame decoder:
//! - Framed sends of typed messages or raw text
//! - Cancel-safe receive with optional timeout
//! - Raw byte writes for exercising the server's frame reassembly
//!
//! ### World Module (`world`)
//! [`world::PeerWorld`] applies INIT, SPAWN, UPDATE and DESPAWN to a map of
//! identity to pose and reports what changed.
//!
//! ### Bot Module (`bot`)
//! [`bot::Bot`] waits for its identity, then sends random-walk UPDATEs at a
//! fixed rate while logging peers joining and leaving.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::RelayClient;
//! use client::world::PeerWorld;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = RelayClient::connect("127.0.0.1:3000").await?;
//!     let mut world = PeerWorld::new();
//!
//!     // INIT arrives first, followed by a SPAWN per existing player
//!     let init = client.recv().await?;
//!     world.apply(&init);
//!     println!("We are player {:?}", world.own_id());
//!
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod network;
pub mod world;

pub use network::RelayClient;
