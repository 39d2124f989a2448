//! Read-only creature catalog loaded once at startup.
//!
//! Creature files are JSON, either a bare stat block, a stat block wrapped in a
//! `"monster"` object, or an array of stat blocks. Names are matched
//! case-insensitively.

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use shared::{BaseStats, Creature};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid creature data in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no creature named '{0}'")]
    UnknownCreature(String),

    #[error("the catalog has no creatures")]
    Empty,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Wrapped { monster: BaseStats },
    Single(BaseStats),
    Many(Vec<BaseStats>),
}

impl CatalogFile {
    fn into_entries(self) -> Vec<BaseStats> {
        match self {
            CatalogFile::Wrapped { monster } => vec![monster],
            CatalogFile::Single(stats) => vec![stats],
            CatalogFile::Many(list) => list,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, BaseStats>,
    names: Vec<String>,
}

impl Catalog {
    pub fn new(entries: impl IntoIterator<Item = BaseStats>) -> Self {
        let entries: BTreeMap<String, BaseStats> = entries
            .into_iter()
            .map(|stats| (stats.name.to_ascii_lowercase(), stats))
            .collect();
        let names = entries.keys().cloned().collect();
        Self { entries, names }
    }

    /// Loads a catalog from a directory of `*.json` files or from a single file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let catalog = if path.is_dir() {
            Self::load_dir(path)?
        } else {
            Self::new(read_file(path)?)
        };

        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        info!(
            "Loaded {} creatures from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut entries = Vec::new();
        for file in files {
            debug!("Reading creature file {}", file.display());
            entries.extend(read_file(&file)?);
        }
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BaseStats> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn random_name<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.names.choose(rng).map(String::as_str)
    }

    /// Rolls a fresh instance of the named creature.
    pub fn instantiate<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
    ) -> Result<Creature, CatalogError> {
        self.get(name)
            .map(|base| Creature::roll(base, rng))
            .ok_or_else(|| CatalogError::UnknownCreature(name.to_string()))
    }

    /// Rolls an instance of a uniformly chosen creature.
    pub fn instantiate_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Creature, CatalogError> {
        let name = self.random_name(rng).ok_or(CatalogError::Empty)?.to_string();
        self.instantiate(&name, rng)
    }
}

fn read_file(path: &Path) -> Result<Vec<BaseStats>, CatalogError> {
    let data = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: CatalogFile = serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.into_entries())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    fn stats(name: &str, speed: u32) -> BaseStats {
        BaseStats {
            name: name.to_string(),
            hp: 100,
            attack: 60,
            defense: 40,
            special_attack: 70,
            special_defense: 50,
            speed,
            abilities: vec![],
            types: vec![],
        }
    }

    fn write_json(dir: &Path, file: &str, body: &str) {
        let mut f = fs::File::create(dir.join(file)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = Catalog::new(vec![stats("Pikachu", 90)]);
        assert!(catalog.get("pikachu").is_some());
        assert!(catalog.get("PIKACHU").is_some());
        assert!(catalog.get("raichu").is_none());
        assert_eq!(catalog.names(), &["pikachu".to_string()]);
    }

    #[test]
    fn test_instantiate_unknown_creature() {
        let catalog = Catalog::new(vec![stats("eevee", 55)]);
        let mut rng = StdRng::seed_from_u64(1);
        let err = catalog.instantiate("mew", &mut rng).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownCreature(ref n) if n == "mew"));
        assert_ok!(catalog.instantiate("Eevee", &mut rng));
    }

    #[test]
    fn test_instantiate_random_on_empty_catalog() {
        let catalog = Catalog::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            catalog.instantiate_random(&mut rng),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn test_load_directory_with_mixed_layouts() {
        let dir = tempfile::tempdir().unwrap();
        write_json(
            dir.path(),
            "bulbasaur.json",
            r#"{"monster": {"name": "bulbasaur", "hp": 45, "attack": 49, "defense": 49,
                "sp_atk": 65, "sp_def": 65, "speed": 45}}"#,
        );
        write_json(
            dir.path(),
            "starters.json",
            r#"[{"name": "charmander", "hp": 39, "attack": 52, "defense": 43,
                 "sp_atk": 60, "sp_def": 50, "speed": 65},
                {"name": "squirtle", "hp": 44, "attack": 48, "defense": 65,
                 "sp_atk": 50, "sp_def": 64, "speed": 43}]"#,
        );
        write_json(dir.path(), "notes.txt", "ignored");

        let catalog = assert_ok!(Catalog::load(dir.path()));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("charmander").map(|s| s.speed), Some(65));
    }

    #[test]
    fn test_load_rejects_bad_json_and_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(Catalog::load(dir.path()), Err(CatalogError::Empty)));

        write_json(dir.path(), "broken.json", "{ not json");
        let err = assert_err!(Catalog::load(dir.path()));
        assert!(matches!(err, CatalogError::Parse { .. }));
    }
}
