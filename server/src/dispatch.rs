//! Routes parsed commands from a connection to the world, the arena and the
//! player store, and queues the replies.

use crate::arena::{Arena, ArenaError, Notice};
use crate::catalog::Catalog;
use crate::connections::SharedConnections;
use crate::store::PlayerStore;
use crate::world::World;
use log::{error, info, warn};
use shared::protocol::HELP_LINES;
use shared::{Command, Direction, PlayerRecord};
use std::sync::Arc;

/// Whether the connection should keep reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything a connection task needs, cheap to clone.
#[derive(Clone)]
pub struct GameContext {
    pub world: World,
    pub arena: Arena,
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn PlayerStore>,
    pub connections: SharedConnections,
}

impl GameContext {
    pub async fn dispatch(&self, conn_id: u32, command: Command) -> Flow {
        match command {
            Command::Help => {
                for line in HELP_LINES {
                    self.reply(conn_id, *line).await;
                }
            }
            Command::Quit => {
                self.reply(conn_id, "Goodbye!").await;
                return Flow::Quit;
            }
            Command::Dex { creature } => self.dex(conn_id, &creature).await,
            Command::Join { username } => self.join(conn_id, &username).await,
            other => {
                let Some(username) = self.username_of(conn_id).await else {
                    self.reply(conn_id, "Join first with 'join <username>'").await;
                    return Flow::Continue;
                };
                match other {
                    Command::Move { direction } => self.move_player(conn_id, &username, direction).await,
                    Command::Status => self.status(conn_id, &username).await,
                    Command::Arena => {
                        let result = self.arena.enter(&username).await;
                        self.finish_arena(conn_id, result).await;
                    }
                    Command::Pick { creature } => {
                        let result = self.arena.pick(&username, &creature).await;
                        self.finish_arena(conn_id, result).await;
                    }
                    Command::Ready => {
                        let result = self.arena.ready(&username).await;
                        self.finish_arena(conn_id, result).await;
                    }
                    Command::Attack { kind } => {
                        let result = self.arena.attack(&username, kind).await;
                        self.finish_arena(conn_id, result).await;
                    }
                    Command::Forfeit => {
                        let result = self.arena.forfeit(&username).await;
                        self.finish_arena(conn_id, result).await;
                    }
                    Command::Join { .. } | Command::Dex { .. } | Command::Help | Command::Quit => {}
                }
            }
        }
        Flow::Continue
    }

    /// Cleans up after a closed connection: a running battle is forfeited,
    /// the player leaves the world and their record is saved.
    ///
    /// The connection is unregistered last, so its name stays reserved and
    /// its outbox stays open until the cleanup is complete.
    pub async fn disconnect(&self, conn_id: u32) {
        if let Some(username) = self.username_of(conn_id).await {
            let notices = self.arena.disconnect(&username).await;
            self.deliver(notices).await;

            if let Some(session) = self.world.leave(&username).await {
                self.persist(session.snapshot()).await;
            }
            info!("{} disconnected", username);
        }
        self.connections.write().await.remove_connection(conn_id);
    }

    async fn join(&self, conn_id: u32, username: &str) {
        let bound = self
            .connections
            .write()
            .await
            .bind_username(conn_id, username);
        if let Err(e) = bound {
            self.reply(conn_id, format!("Cannot join: {}", e)).await;
            return;
        }

        let record = match self.store.load(username) {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not load saved data for {}: {}", username, e);
                None
            }
        };

        let outcome = self.world.join(username, record).await;
        if outcome.already_joined {
            self.reply(
                conn_id,
                format!(
                    "Player {} is already in the game at position {}",
                    username, outcome.position
                ),
            )
            .await;
            return;
        }

        self.reply(
            conn_id,
            format!("Player {} joined at position {}", username, outcome.position),
        )
        .await;
        if let Some(count) = outcome.restored {
            self.reply(
                conn_id,
                format!("Welcome back! Restored {} creatures from your last visit", count),
            )
            .await;
        }
        self.connections
            .read()
            .await
            .broadcast(&format!("{} entered the world", username), Some(conn_id));
    }

    async fn move_player(&self, conn_id: u32, username: &str, direction: Direction) {
        let outcome = match self.world.move_player(username, direction).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.reply(conn_id, e.to_string()).await;
                return;
            }
        };

        self.reply(conn_id, format!("Moved to {}", outcome.position))
            .await;
        if let Some(creature) = &outcome.captured {
            self.reply(conn_id, format!("You captured a {}!", creature))
                .await;
        }
        if let Some(name) = &outcome.capture_skipped {
            self.reply(
                conn_id,
                format!("A wild {} is here, but your roster is full", name),
            )
            .await;
        }
        if let Some(record) = outcome.record {
            self.persist(record).await;
        }
    }

    async fn dex(&self, conn_id: u32, name: &str) {
        let Some(base) = self.catalog.get(name) else {
            self.reply(conn_id, format!("No creature named {} in the catalog", name))
                .await;
            return;
        };

        let list = |items: &[String]| {
            if items.is_empty() {
                "none".to_string()
            } else {
                items.join(", ")
            }
        };
        let lines = [
            format!(
                "{}: hp {}, attack {}, defense {}, sp_atk {}, sp_def {}, speed {}",
                base.name,
                base.hp,
                base.attack,
                base.defense,
                base.special_attack,
                base.special_defense,
                base.speed
            ),
            format!("Types: {}", list(&base.types)),
            format!("Abilities: {}", list(&base.abilities)),
        ];
        for line in lines {
            self.reply(conn_id, line).await;
        }
    }

    async fn status(&self, conn_id: u32, username: &str) {
        let mut lines = Vec::new();
        match self.world.status(username).await {
            Ok(status) => {
                lines.push(format!("Position: {}", status.position));
                lines.push(format!(
                    "Roster ({}/{}): {}",
                    status.roster_len, status.roster_capacity, status.roster_summary
                ));
                lines.push(format!("Wild creatures in the world: {}", status.wild_creatures));
            }
            Err(e) => lines.push(e.to_string()),
        }
        if let Some(arena) = self.arena.status(username).await {
            lines.push(arena);
        }
        for line in lines {
            self.reply(conn_id, line).await;
        }
    }

    async fn finish_arena(&self, conn_id: u32, result: Result<Vec<Notice>, ArenaError>) {
        match result {
            Ok(notices) => self.deliver(notices).await,
            Err(e) => self.reply(conn_id, e.to_string()).await,
        }
    }

    async fn deliver(&self, notices: Vec<Notice>) {
        let connections = self.connections.read().await;
        for notice in notices {
            connections.send_to_user(&notice.to, notice.text);
        }
    }

    async fn reply(&self, conn_id: u32, line: impl Into<String>) {
        self.connections
            .read()
            .await
            .send_to_connection(conn_id, line);
    }

    async fn username_of(&self, conn_id: u32) -> Option<String> {
        self.connections
            .read()
            .await
            .username_of(conn_id)
            .map(str::to_string)
    }

    /// Saves off the async workers; the file store rewrites its whole file.
    async fn persist(&self, record: PlayerRecord) {
        let store = Arc::clone(&self.store);
        let username = record.username.clone();
        match tokio::task::spawn_blocking(move || store.save(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to save {}: {}", username, e),
            Err(e) => error!("Save task for {} failed: {}", username, e),
        }
    }
}
