//! Creature templates, live creature instances and the damage formulas used in battle.

use crate::{LEVEL_MAX, LEVEL_MIN, MULTIPLIER_MAX, MULTIPLIER_MIN};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Read-only stat block as stored in the creature catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    pub name: String,
    pub hp: u32,
    pub attack: u32,
    pub defense: u32,
    #[serde(rename = "sp_atk")]
    pub special_attack: u32,
    #[serde(rename = "sp_def")]
    pub special_defense: u32,
    pub speed: u32,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Where a creature is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Wild,
    Captured,
    BattleActive,
    Fainted,
}

/// A concrete creature: rolled from a [`BaseStats`] template, then owned by the
/// world map, a player's roster or a battle side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    #[serde(rename = "sp_atk")]
    pub special_attack: u32,
    #[serde(rename = "sp_def")]
    pub special_defense: u32,
    pub speed: u32,
    pub elemental_multiplier: f64,
    pub level: u32,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub stage: Stage,
}

impl Creature {
    pub fn from_base(base: &BaseStats, level: u32, elemental_multiplier: f64) -> Self {
        Self {
            name: base.name.clone(),
            hp: base.hp,
            max_hp: base.hp,
            attack: base.attack,
            defense: base.defense,
            special_attack: base.special_attack,
            special_defense: base.special_defense,
            speed: base.speed,
            elemental_multiplier,
            level,
            abilities: base.abilities.clone(),
            types: base.types.clone(),
            stage: Stage::Wild,
        }
    }

    /// Instantiates `base` with a level in `[1, 100]` and an elemental
    /// multiplier in `[0.5, 1.0)`.
    pub fn roll<R: Rng + ?Sized>(base: &BaseStats, rng: &mut R) -> Self {
        let level = rng.gen_range(LEVEL_MIN..=LEVEL_MAX);
        let multiplier = rng.gen_range(MULTIPLIER_MIN..MULTIPLIER_MAX);
        Self::from_base(base, level, multiplier)
    }

    pub fn is_fainted(&self) -> bool {
        self.hp == 0
    }

    /// Subtracts `damage` from HP without going below zero and returns the
    /// remaining HP. Reaching zero marks the creature fainted.
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        self.hp = self.hp.saturating_sub(damage);
        if self.hp == 0 {
            self.stage = Stage::Fainted;
        }
        self.hp
    }

    pub fn mark_captured(&mut self) {
        self.stage = Stage::Captured;
    }

    pub fn send_out(&mut self) {
        if !self.is_fainted() {
            self.stage = Stage::BattleActive;
        }
    }

    /// Experience this creature is worth to the side that defeats it.
    pub fn experience_value(&self) -> u32 {
        self.level.saturating_mul(crate::EXPERIENCE_PER_LEVEL)
    }
}

impl fmt::Display for Creature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Lv{} HP {}/{}",
            self.name, self.level, self.hp, self.max_hp
        )
    }
}

/// The two kinds of battle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    Normal,
    Special,
}

impl MoveKind {
    /// Damage `attacker` deals to `defender`, never negative.
    ///
    /// Normal moves use `attack - defense`; special moves scale the attacker's
    /// special attack by its elemental multiplier (rounded) before subtracting
    /// the defender's special defense.
    pub fn damage(self, attacker: &Creature, defender: &Creature) -> u32 {
        let raw = match self {
            MoveKind::Normal => i64::from(attacker.attack) - i64::from(defender.defense),
            MoveKind::Special => {
                let scaled =
                    (f64::from(attacker.special_attack) * attacker.elemental_multiplier).round();
                scaled as i64 - i64::from(defender.special_defense)
            }
        };
        raw.clamp(0, i64::from(u32::MAX)) as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MoveKind::Normal => "normal",
            MoveKind::Special => "special",
        }
    }
}

impl FromStr for MoveKind {
    type Err = crate::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(MoveKind::Normal),
            "special" => Ok(MoveKind::Special),
            _ => Err(crate::ParseError::InvalidArgument {
                command: "attack",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
