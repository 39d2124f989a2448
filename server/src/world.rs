//! Authoritative world state: player positions and the wild creatures waiting
//! to be captured.
//!
//! [`WorldState`] is plain synchronous data. [`World`] wraps it in one exclusive
//! lock so that every operation, including the capture that may follow a move,
//! runs to completion before any other connection or periodic tick can observe
//! or touch the maps. A wild creature is therefore either on the map or in
//! exactly one roster, never both.

use crate::catalog::Catalog;
use crate::roster::PlayerSession;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    Creature, Direction, PlayerRecord, Position, SPAWN_BATCH, WORLD_ROSTER_CAPACITY, WORLD_SIZE,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("player '{0}' has not joined the world")]
    UnknownPlayer(String),
}

/// Tunables for a world instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldSettings {
    pub world_size: i32,
    pub roster_capacity: usize,
    pub spawn_batch: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            world_size: WORLD_SIZE,
            roster_capacity: WORLD_ROSTER_CAPACITY,
            spawn_batch: SPAWN_BATCH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub position: Position,
    pub already_joined: bool,
    /// Number of creatures restored from a saved record, if one was used.
    pub restored: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveOutcome {
    pub position: Position,
    pub captured: Option<Creature>,
    /// Name of a creature left on the cell because the roster was full.
    pub capture_skipped: Option<String>,
    /// Snapshot to persist, present whenever a capture happened.
    pub record: Option<PlayerRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    pub spawned: usize,
    pub overwritten: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStatus {
    pub position: Position,
    pub roster_len: usize,
    pub roster_capacity: usize,
    pub roster_summary: String,
    pub wild_creatures: usize,
}

pub struct WorldState {
    players: HashMap<String, PlayerSession>,
    wild: HashMap<Position, Creature>,
    settings: WorldSettings,
    rng: StdRng,
}

impl WorldState {
    pub fn new(settings: WorldSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    pub fn with_rng(settings: WorldSettings, rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            wild: HashMap::new(),
            settings,
            rng,
        }
    }

    pub fn settings(&self) -> WorldSettings {
        self.settings
    }

    /// Registers `username` in the world. Joining twice is a no-op that
    /// reports the existing position. A saved `record` places the new session
    /// where it left off instead of at a random cell.
    pub fn join(&mut self, username: &str, record: Option<PlayerRecord>) -> JoinOutcome {
        if let Some(existing) = self.players.get(username) {
            return JoinOutcome {
                position: existing.position,
                already_joined: true,
                restored: None,
            };
        }

        let capacity = self.settings.roster_capacity;
        let (session, restored) = match record {
            Some(mut record) => {
                record.username = username.to_string();
                record.position = self.clamp(record.position);
                let count = record.creatures.len();
                (PlayerSession::from_record(record, capacity), Some(count))
            }
            None => {
                let position = Position::random(self.settings.world_size, &mut self.rng);
                (PlayerSession::new(username, position, capacity), None)
            }
        };

        let position = session.position;
        info!("Player {} joined at {}", username, position);
        self.players.insert(username.to_string(), session);

        JoinOutcome {
            position,
            already_joined: false,
            restored,
        }
    }

    /// Moves one cell in `direction`, clamped to the grid, then captures any
    /// creature on the new cell if the roster has room.
    pub fn move_player(
        &mut self,
        username: &str,
        direction: Direction,
    ) -> Result<MoveOutcome, WorldError> {
        let world_size = self.settings.world_size;
        let player = self
            .players
            .get_mut(username)
            .ok_or_else(|| WorldError::UnknownPlayer(username.to_string()))?;

        player.position = player.position.stepped(direction, world_size);
        let position = player.position;

        let mut outcome = MoveOutcome {
            position,
            captured: None,
            capture_skipped: None,
            record: None,
        };

        if player.roster.is_full() {
            outcome.capture_skipped = self.wild.get(&position).map(|c| c.name.clone());
            return Ok(outcome);
        }

        if let Some(creature) = self.wild.remove(&position) {
            match player.roster.try_push(creature) {
                Ok(captured) => {
                    info!("{} captured a {} at {}", username, captured.name, position);
                    outcome.captured = Some(captured.clone());
                }
                Err(creature) => {
                    outcome.capture_skipped = Some(creature.name.clone());
                    self.wild.insert(position, creature);
                }
            }
        }

        if outcome.captured.is_some() {
            outcome.record = self.snapshot(username);
        }
        Ok(outcome)
    }

    /// Puts a wild creature on `position`, returning whatever it replaced.
    pub fn place_creature(&mut self, position: Position, creature: Creature) -> Option<Creature> {
        let position = self.clamp(position);
        self.wild.insert(position, creature)
    }

    /// Spawns one batch of wild creatures at random cells. Occupied cells are
    /// overwritten; failed catalog lookups are skipped.
    pub fn spawn_batch(&mut self, catalog: &Catalog) -> SpawnReport {
        let mut report = SpawnReport::default();

        for _ in 0..self.settings.spawn_batch {
            let position = Position::random(self.settings.world_size, &mut self.rng);
            let creature = match catalog.instantiate_random(&mut self.rng) {
                Ok(creature) => creature,
                Err(e) => {
                    warn!("Skipping spawn at {}: {}", position, e);
                    report.skipped += 1;
                    continue;
                }
            };

            debug!("Spawned {} at {}", creature.name, position);
            if self.wild.insert(position, creature).is_some() {
                report.overwritten += 1;
            }
            report.spawned += 1;
        }

        report
    }

    /// Removes every uncaptured creature and returns how many there were.
    pub fn despawn_all(&mut self) -> usize {
        let count = self.wild.len();
        self.wild.clear();
        count
    }

    pub fn leave(&mut self, username: &str) -> Option<PlayerSession> {
        let session = self.players.remove(username);
        if session.is_some() {
            info!("Player {} left the world", username);
        }
        session
    }

    pub fn player(&self, username: &str) -> Option<&PlayerSession> {
        self.players.get(username)
    }

    pub fn creature_at(&self, position: Position) -> Option<&Creature> {
        self.wild.get(&position)
    }

    pub fn wild_count(&self) -> usize {
        self.wild.len()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn snapshot(&self, username: &str) -> Option<PlayerRecord> {
        self.players.get(username).map(PlayerSession::snapshot)
    }

    pub fn status(&self, username: &str) -> Result<PlayerStatus, WorldError> {
        let player = self
            .players
            .get(username)
            .ok_or_else(|| WorldError::UnknownPlayer(username.to_string()))?;
        Ok(PlayerStatus {
            position: player.position,
            roster_len: player.roster.len(),
            roster_capacity: player.roster.capacity(),
            roster_summary: player.roster.summary(),
            wild_creatures: self.wild.len(),
        })
    }

    fn clamp(&self, position: Position) -> Position {
        let max = self.settings.world_size - 1;
        Position::new(position.x.clamp(0, max), position.y.clamp(0, max))
    }
}

/// Cloneable handle to a [`WorldState`] behind a single exclusive lock.
#[derive(Clone)]
pub struct World {
    state: Arc<Mutex<WorldState>>,
}

impl World {
    pub fn new(state: WorldState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn join(&self, username: &str, record: Option<PlayerRecord>) -> JoinOutcome {
        self.state.lock().await.join(username, record)
    }

    pub async fn move_player(
        &self,
        username: &str,
        direction: Direction,
    ) -> Result<MoveOutcome, WorldError> {
        self.state.lock().await.move_player(username, direction)
    }

    pub async fn spawn_tick(&self, catalog: &Catalog) -> SpawnReport {
        let report = self.state.lock().await.spawn_batch(catalog);
        info!(
            "Spawn tick: {} spawned ({} overwritten, {} skipped)",
            report.spawned, report.overwritten, report.skipped
        );
        report
    }

    pub async fn despawn_tick(&self) -> usize {
        let removed = self.state.lock().await.despawn_all();
        info!("Despawn tick: {} wild creatures removed", removed);
        removed
    }

    pub async fn leave(&self, username: &str) -> Option<PlayerSession> {
        self.state.lock().await.leave(username)
    }

    pub async fn status(&self, username: &str) -> Result<PlayerStatus, WorldError> {
        self.state.lock().await.status(username)
    }

    /// Direct access to the locked state for multi-step inspection.
    pub async fn lock(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().await
    }
}
