//! Server configuration and construction of the shared [`GameContext`].

use crate::arena::{Arena, ArenaCore};
use crate::catalog::Catalog;
use crate::connections::ConnectionRegistry;
use crate::dispatch::GameContext;
use crate::store::{JsonFileStore, MemoryStore, PlayerStore};
use crate::world::{World, WorldSettings, WorldState};
use log::info;
use shared::BATTLE_ROSTER_CAPACITY;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SPAWN_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_DESPAWN_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub catalog_path: PathBuf,
    /// `None` keeps player records in memory only.
    pub store_path: Option<PathBuf>,
    pub world: WorldSettings,
    pub battle_roster_capacity: usize,
    pub spawn_interval: Duration,
    pub despawn_interval: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7878".to_string(),
            catalog_path: PathBuf::from("data/creatures"),
            store_path: Some(PathBuf::from("data/players.json")),
            world: WorldSettings::default(),
            battle_roster_capacity: BATTLE_ROSTER_CAPACITY,
            spawn_interval: DEFAULT_SPAWN_INTERVAL,
            despawn_interval: DEFAULT_DESPAWN_INTERVAL,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ServerConfig {
    /// Loads the catalog and opens the player store.
    pub fn build_context(&self) -> Result<GameContext, Box<dyn std::error::Error>> {
        let catalog = Arc::new(Catalog::load(&self.catalog_path)?);
        let store: Arc<dyn PlayerStore> = match &self.store_path {
            Some(path) => Arc::new(JsonFileStore::open(path)?),
            None => {
                info!("No store path configured, player records will not persist");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(self.context_with(catalog, store))
    }

    /// Builds a context around an already loaded catalog and store.
    pub fn context_with(&self, catalog: Arc<Catalog>, store: Arc<dyn PlayerStore>) -> GameContext {
        GameContext {
            world: World::new(WorldState::new(self.world)),
            arena: Arena::new(ArenaCore::new(
                Arc::clone(&catalog),
                self.battle_roster_capacity,
            )),
            catalog,
            store,
            connections: ConnectionRegistry::shared(self.max_connections),
        }
    }
}
