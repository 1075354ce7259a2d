//! # Melee Client Library
//!
//! A headless observer. It mirrors the server's characters and weapons, turns typed
//! commands into mutation requests, and never changes its mirror on its own: every
//! change arrives as a replicated field from the authority.
//!
//! ## Module Organization
//!
//! - `game`: `ClientGameState`, the observer-side world and its gate
//! - `input`: command parsing and request sequencing
//! - `network`: the UDP client loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:8080", 0).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
