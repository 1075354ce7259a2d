//! # Melee Server Library
//!
//! The authoritative peer. It owns the canonical characters and weapons, applies the
//! mutations observers forward to it, resolves melee hits once per tick and
//! replicates the outcome.
//!
//! ## Core Responsibilities
//!
//! ### Authority
//! Every mutation goes through the shared `AuthorityGate`, which on the server always
//! answers "apply locally". Forwarded requests are first checked for existence and
//! ownership (`GameState::validate_request`); failures are answered with a
//! `Rejected` packet and never retried.
//!
//! ### Hit Resolution
//! Held weapons follow their wielder's hand. While an attack is open the server
//! sweeps the weapon's blade across a configurable arc and checks every hit node's
//! movement against the other characters: capsules first, then bone spheres.
//! The first confirmed hit ends the swing and is broadcast as a `Hit` packet.
//!
//! ### Replication
//! State changes are queued during the tick, coalesced per entity field, and sent
//! as one `Replicate` packet at the end of the tick. A weapon list and its current
//! weapon always travel together. New observers get a full snapshot on connect.
//!
//! ## Module Organization
//!
//! - `client_manager`: connections, timeouts, and the per-client request queue
//! - `game`: `GameConfig` and the authoritative `GameState`
//! - `network`: UDP tasks and the tick loop
//! - `physics`: the swept-query service (`WorldQuery`)
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameConfig;
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(33), // 30Hz
//!         16,
//!         GameConfig::default(),
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
pub mod physics;
