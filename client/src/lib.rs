//! # PokeCat Terminal Client Library
//!
//! A thin line-based client for the PokeCat server. All game state lives on the
//! server; the client reads commands from a terminal, checks that they parse,
//! forwards them, and prints whatever the server sends back.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Interprets typed lines:
//! - Commands that parse are forwarded unchanged
//! - `help` is answered locally
//! - Typos are reported without a round trip
//!
//! ### Network Module (`network`)
//! Runs the session loop over a TCP stream (or any async stream in tests),
//! relaying input and server output concurrently.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::io::{stdin, stdout, BufReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1:7878").await?.with_username("ash");
//!     client.run(BufReader::new(stdin()), stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
