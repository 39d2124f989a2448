//! Player sessions and their capacity-bounded creature rosters.

use crate::catalog::{Catalog, CatalogError};
use rand::Rng;
use shared::{Creature, PlayerRecord, Position};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("your roster is full ({capacity} creatures)")]
    Full { capacity: usize },

    #[error("no creature named '{0}'")]
    UnknownCreature(String),
}

/// Ordered creatures owned by one player, never longer than `capacity`
/// through [`Roster::try_push`] or [`Roster::add_creature`].
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    creatures: Vec<Creature>,
    capacity: usize,
}

impl Roster {
    pub fn new(capacity: usize) -> Self {
        Self {
            creatures: Vec::new(),
            capacity,
        }
    }

    /// Builds a roster from previously saved creatures. A saved roster larger
    /// than `capacity` is kept intact but accepts no further creatures.
    pub fn with_creatures(creatures: Vec<Creature>, capacity: usize) -> Self {
        Self {
            creatures,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.creatures.len() >= self.capacity
    }

    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn into_creatures(self) -> Vec<Creature> {
        self.creatures
    }

    /// Appends `creature` unless the roster is full, in which case it is
    /// handed back untouched.
    pub fn try_push(&mut self, mut creature: Creature) -> Result<&Creature, Creature> {
        if self.is_full() {
            return Err(creature);
        }
        creature.mark_captured();
        self.creatures.push(creature);
        Ok(&self.creatures[self.creatures.len() - 1])
    }

    /// Rolls a new instance of `name` from the catalog and appends it.
    pub fn add_creature<R: Rng + ?Sized>(
        &mut self,
        catalog: &Catalog,
        name: &str,
        rng: &mut R,
    ) -> Result<&Creature, RosterError> {
        if self.is_full() {
            return Err(RosterError::Full {
                capacity: self.capacity,
            });
        }
        let creature = catalog.instantiate(name, rng).map_err(|e| match e {
            CatalogError::UnknownCreature(name) => RosterError::UnknownCreature(name),
            _ => RosterError::UnknownCreature(name.to_string()),
        })?;
        let capacity = self.capacity;
        self.try_push(creature)
            .map_err(|_| RosterError::Full { capacity })
    }

    pub fn summary(&self) -> String {
        if self.creatures.is_empty() {
            return "no creatures".to_string();
        }
        self.creatures
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A player present in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSession {
    pub username: String,
    pub position: Position,
    pub roster: Roster,
}

impl PlayerSession {
    pub fn new(username: impl Into<String>, position: Position, capacity: usize) -> Self {
        Self {
            username: username.into(),
            position,
            roster: Roster::new(capacity),
        }
    }

    pub fn from_record(record: PlayerRecord, capacity: usize) -> Self {
        Self {
            username: record.username,
            position: record.position,
            roster: Roster::with_creatures(record.creatures, capacity),
        }
    }

    pub fn snapshot(&self) -> PlayerRecord {
        PlayerRecord {
            username: self.username.clone(),
            position: self.position,
            creatures: self.roster.creatures().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{BaseStats, Stage};

    fn catalog() -> Catalog {
        Catalog::new(vec![BaseStats {
            name: "pidgey".to_string(),
            hp: 40,
            attack: 45,
            defense: 40,
            special_attack: 35,
            special_defense: 35,
            speed: 56,
            abilities: vec![],
            types: vec!["flying".to_string()],
        }])
    }

    #[test]
    fn test_add_creature_until_full() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let mut roster = Roster::new(3);

        for _ in 0..3 {
            let added = roster.add_creature(&catalog, "pidgey", &mut rng).unwrap();
            assert_eq!(added.stage, Stage::Captured);
        }
        assert!(roster.is_full());

        let before = roster.clone();
        assert_eq!(
            roster.add_creature(&catalog, "pidgey", &mut rng),
            Err(RosterError::Full { capacity: 3 })
        );
        assert_eq!(roster, before);
    }

    #[test]
    fn test_add_unknown_creature_leaves_roster_unchanged() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let mut roster = Roster::new(3);

        assert_eq!(
            roster.add_creature(&catalog, "missingno", &mut rng),
            Err(RosterError::UnknownCreature("missingno".to_string()))
        );
        assert!(roster.is_empty());
    }

    #[test]
    fn test_try_push_hands_back_creature_when_full() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(9);
        let mut roster = Roster::new(1);

        let first = catalog.instantiate("pidgey", &mut rng).unwrap();
        let second = catalog.instantiate("pidgey", &mut rng).unwrap();
        assert!(roster.try_push(first).is_ok());

        let returned = roster.try_push(second.clone()).unwrap_err();
        assert_eq!(returned, second);
        assert_eq!(returned.stage, Stage::Wild);
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_session_snapshot_roundtrip() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = PlayerSession::new("brock", Position::new(7, 8), 200);
        session
            .roster
            .add_creature(&catalog, "pidgey", &mut rng)
            .unwrap();

        let record = session.snapshot();
        assert_eq!(record.username, "brock");
        assert_eq!(record.creatures.len(), 1);

        let restored = PlayerSession::from_record(record, 200);
        assert_eq!(restored, session);
    }

    #[test]
    fn test_oversized_saved_roster_accepts_nothing() {
        let catalog = catalog();
        let mut rng = StdRng::seed_from_u64(5);
        let creatures: Vec<Creature> = (0..4)
            .map(|_| catalog.instantiate("pidgey", &mut rng).unwrap())
            .collect();

        let mut roster = Roster::with_creatures(creatures, 3);
        assert_eq!(roster.len(), 4);
        assert!(roster.is_full());
        assert!(roster.add_creature(&catalog, "pidgey", &mut rng).is_err());
    }
}
