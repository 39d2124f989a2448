//! Persistence for player records between sessions.
//!
//! [`JsonFileStore`] keeps every record in one pretty-printed JSON array,
//! sorted by username and rewritten through a `.tmp` file plus rename so a
//! crash never leaves a half-written file behind.

use log::{debug, info};
use shared::PlayerRecord;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("player store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("player store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait PlayerStore: Send + Sync {
    fn load(&self, username: &str) -> Result<Option<PlayerRecord>, StoreError>;
    fn save(&self, record: &PlayerRecord) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<HashMap<String, PlayerRecord>>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str::<Vec<PlayerRecord>>(&data)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Opened player store {} with {} records",
            path.display(),
            records.len()
        );
        let records = records
            .into_iter()
            .map(|r| (r.username.clone(), r))
            .collect();

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    fn write_all(&self, records: &HashMap<String, PlayerRecord>) -> Result<(), StoreError> {
        let mut sorted: Vec<&PlayerRecord> = records.values().collect();
        sorted.sort_by(|a, b| a.username.cmp(&b.username));
        let data = serde_json::to_string_pretty(&sorted)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl PlayerStore for JsonFileStore {
    fn load(&self, username: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(username).cloned())
    }

    fn save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(record.username.clone(), record.clone());
        self.write_all(&records)?;
        debug!(
            "Saved {} with {} creatures",
            record.username,
            record.creatures.len()
        );
        Ok(())
    }
}

/// Store that forgets everything on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, PlayerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerStore for MemoryStore {
    fn load(&self, username: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(username).cloned())
    }

    fn save(&self, record: &PlayerRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(record.username.clone(), record.clone());
        Ok(())
    }
}
