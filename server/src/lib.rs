//! # PokeCat Game Server Library
//!
//! This library provides the authoritative server for PokeCat, a multiplayer
//! creature-collecting game played over plain text lines. Players walk a shared
//! grid, capture the wild creatures they step on, and meet in an arena for
//! turn-based one-on-one battles.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative World
//! The server owns the only copy of the grid, the wild creatures on it and every
//! player's position and roster. Clients send commands and render the replies;
//! they never hold game state of their own.
//!
//! ### Battle Resolution
//! Battles are resolved entirely on the server. Turn order, damage, fainting and
//! experience are computed here and announced to both participants.
//!
//! ### Persistence
//! A player's position and roster are saved whenever they capture a creature and
//! when they disconnect, and restored the next time they join.
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! Every accepted TCP connection gets a reader task that parses and dispatches
//! commands and a writer task that drains the connection's outbox. Game logic
//! only ever queues lines, so no lock is held across socket I/O.
//!
//! ### Locking
//! The world sits behind a single exclusive lock, which makes each move and its
//! capture atomic against other players and the maintenance ticks. The arena
//! has its own lock so battle moves never interleave.
//!
//! ### Maintenance Ticks
//! Two interval tasks spawn a batch of wild creatures every minute and clear all
//! uncaptured creatures every five minutes.
//!
//! ## Module Organization
//!
//! ### Catalog Module (`catalog`)
//! Read-only creature templates loaded from JSON at startup.
//!
//! ### World Module (`world`)
//! Grid, wild creatures, player sessions and movement with capture.
//!
//! ### Roster Module (`roster`)
//! Capacity-bounded creature lists and the per-player session.
//!
//! ### Battle Module (`battle`)
//! The turn-based battle state machine and experience distribution.
//!
//! ### Arena Module (`arena`)
//! Lobby where two players pick teams and declare ready, wrapping one battle.
//!
//! ### Store Module (`store`)
//! JSON-file persistence for player records.
//!
//! ### Connections Module (`connections`)
//! Connection tracking, username binding and outbound line routing.
//!
//! ### Dispatch Module (`dispatch`)
//! Maps each parsed command onto the world, the arena and the store.
//!
//! ### Lines Module (`lines`)
//! Bounded line framing that tolerates oversized and non-UTF-8 input.
//!
//! ### Network Module (`network`)
//! TCP accept loop and per-connection line handling.
//!
//! ### Scheduler Module (`scheduler`)
//! Spawn and despawn interval tasks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::scheduler::Scheduler;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let ctx = config.build_context()?;
//!
//!     // Spawn and despawn wild creatures in the background
//!     let _scheduler = Scheduler::start(
//!         ctx.world.clone(),
//!         ctx.catalog.clone(),
//!         config.spawn_interval,
//!         config.despawn_interval,
//!     );
//!
//!     let server = Server::bind(&config.bind_addr, ctx, config.idle_timeout).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod arena;
pub mod battle;
pub mod catalog;
pub mod config;
pub mod connections;
pub mod dispatch;
pub mod lines;
pub mod network;
pub mod roster;
pub mod scheduler;
pub mod store;
pub mod world;
