//! Types shared by the game server and the terminal client: the grid model,
//! creature instances and the line-based command protocol.

pub mod creature;
pub mod protocol;

pub use creature::{BaseStats, Creature, MoveKind, Stage};
pub use protocol::{Command, ParseError};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const WORLD_SIZE: i32 = 1000;
pub const SPAWN_BATCH: usize = 50;
pub const WORLD_ROSTER_CAPACITY: usize = 200;
pub const BATTLE_ROSTER_CAPACITY: usize = 3;
pub const LEVEL_MIN: u32 = 1;
pub const LEVEL_MAX: u32 = 100;
pub const MULTIPLIER_MIN: f64 = 0.5;
pub const MULTIPLIER_MAX: f64 = 1.0;
pub const EXPERIENCE_PER_LEVEL: u32 = 10;

/// A cell on the square world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Picks a uniformly random cell inside a `world_size` square.
    pub fn random<R: Rng + ?Sized>(world_size: i32, rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(0..world_size),
            y: rng.gen_range(0..world_size),
        }
    }

    /// Returns the neighbouring cell in `direction`, staying put on any axis
    /// that would leave the grid.
    pub fn stepped(self, direction: Direction, world_size: i32) -> Self {
        let (dx, dy) = direction.delta();
        let max = world_size - 1;
        Self {
            x: (self.x + dx).clamp(0, max),
            y: (self.y + dy).clamp(0, max),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Grid delta; y grows downwards so `Up` decrements it.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(ParseError::InvalidArgument {
                command: "move",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable snapshot of a world player, handed to the player store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub username: String,
    pub position: Position,
    #[serde(default)]
    pub creatures: Vec<Creature>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_position_step_inside_grid() {
        let pos = Position::new(10, 10);
        assert_eq!(pos.stepped(Direction::Up, WORLD_SIZE), Position::new(10, 9));
        assert_eq!(pos.stepped(Direction::Down, WORLD_SIZE), Position::new(10, 11));
        assert_eq!(pos.stepped(Direction::Left, WORLD_SIZE), Position::new(9, 10));
        assert_eq!(pos.stepped(Direction::Right, WORLD_SIZE), Position::new(11, 10));
    }

    #[test]
    fn test_position_step_clamps_at_edges() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.stepped(Direction::Up, WORLD_SIZE), origin);
        assert_eq!(origin.stepped(Direction::Left, WORLD_SIZE), origin);

        let corner = Position::new(WORLD_SIZE - 1, WORLD_SIZE - 1);
        assert_eq!(corner.stepped(Direction::Down, WORLD_SIZE), corner);
        assert_eq!(corner.stepped(Direction::Right, WORLD_SIZE), corner);
    }

    #[test]
    fn test_random_position_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let pos = Position::random(5, &mut rng);
            assert!((0..5).contains(&pos.x));
            assert!((0..5).contains(&pos.y));
        }
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("up".parse::<Direction>().unwrap(), Direction::Up);
        assert_eq!("RIGHT".parse::<Direction>().unwrap(), Direction::Right);
        assert!("north".parse::<Direction>().is_err());
    }

    #[test]
    fn test_player_record_json() {
        let record = PlayerRecord {
            username: "ash".to_string(),
            position: Position::new(3, 4),
            creatures: vec![],
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"username\":\"ash\""));

        let legacy = r#"{"username":"misty","position":{"x":1,"y":2}}"#;
        let parsed: PlayerRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(parsed.position, Position::new(1, 2));
        assert!(parsed.creatures.is_empty());
    }
}
