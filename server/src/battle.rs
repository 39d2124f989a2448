//! Turn-based 1v1 battle resolution.
//!
//! A [`Battle`] is created from two non-empty rosters and then alternates
//! between the sides until one side has no conscious creature left (or
//! forfeits). Each side's active index only ever moves forward: a fainted
//! creature is skipped and never sent out again.
//!
//! The battle owns its rosters and does no I/O. Callers translate the returned
//! [`MoveReport`] and [`BattleOutcome`] into messages for the two players.

use log::{debug, info};
use shared::{Creature, MoveKind};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    #[error("{0} has no creatures to battle with")]
    EmptyRoster(String),

    #[error("It's not your turn!")]
    NotYourTurn,

    #[error("the battle is already over")]
    AlreadyOver,
}

/// One player's side of a battle.
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    username: String,
    roster: Vec<Creature>,
    active: usize,
}

impl Combatant {
    pub fn new(username: impl Into<String>, roster: Vec<Creature>) -> Self {
        Self {
            username: username.into(),
            roster,
            active: 0,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn roster(&self) -> &[Creature] {
        &self.roster
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_creature(&self) -> Option<&Creature> {
        self.roster.get(self.active)
    }

    fn active_creature_mut(&mut self) -> Option<&mut Creature> {
        self.roster.get_mut(self.active)
    }

    pub fn remaining(&self) -> usize {
        self.roster.iter().filter(|c| !c.is_fainted()).count()
    }

    /// Moves the active index forward to the next conscious creature, or past
    /// the end of the roster if there is none. Never moves backwards.
    fn advance(&mut self) -> Option<&Creature> {
        let next = (self.active + 1..self.roster.len()).find(|&i| !self.roster[i].is_fainted());
        self.active = next.unwrap_or(self.roster.len());
        let creature = self.roster.get_mut(self.active)?;
        creature.send_out();
        Some(&*creature)
    }

    fn skip_fainted(&mut self) {
        if self
            .active_creature()
            .is_some_and(|creature| creature.is_fainted())
        {
            self.advance();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BattleOutcome {
    pub winner: Side,
    pub winner_name: String,
    pub loser_name: String,
    pub total_experience: u32,
    pub experience_per_creature: u32,
    pub forfeited: bool,
}

/// Result of one resolved move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub attacker: Side,
    pub kind: MoveKind,
    pub attacker_creature: String,
    pub defender_creature: String,
    pub damage: u32,
    pub remaining_hp: u32,
    pub fainted: bool,
    /// Creature the defender sends out after a faint.
    pub next_creature: Option<String>,
    /// Side to move next, `None` once the battle is over.
    pub next_turn: Option<Side>,
    pub outcome: Option<BattleOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    AwaitingMove(Side),
    Over(BattleOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Battle {
    sides: [Combatant; 2],
    phase: Phase,
}

impl Battle {
    /// Starts a battle. The side whose active creature is faster moves
    /// first; on equal speed side one (the first to enter) does.
    pub fn start(one: Combatant, two: Combatant) -> Result<Self, BattleError> {
        for side in [&one, &two] {
            if side.roster.is_empty() {
                return Err(BattleError::EmptyRoster(side.username.clone()));
            }
        }

        let mut sides = [one, two];
        for side in sides.iter_mut() {
            side.skip_fainted();
            if side.active_creature().is_none() {
                return Err(BattleError::EmptyRoster(side.username.clone()));
            }
            if let Some(creature) = side.active_creature_mut() {
                creature.send_out();
            }
        }

        let speed = |side: &Combatant| side.active_creature().map_or(0, |c| c.speed);
        let first = if speed(&sides[1]) > speed(&sides[0]) {
            Side::Two
        } else {
            Side::One
        };

        info!(
            "Battle started: {} vs {}, {} moves first",
            sides[0].username,
            sides[1].username,
            sides[first.index()].username
        );

        Ok(Self {
            sides,
            phase: Phase::AwaitingMove(first),
        })
    }

    pub fn turn(&self) -> Option<Side> {
        match self.phase {
            Phase::AwaitingMove(side) => Some(side),
            Phase::Over(_) => None,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Over(_))
    }

    pub fn outcome(&self) -> Option<&BattleOutcome> {
        match &self.phase {
            Phase::Over(outcome) => Some(outcome),
            Phase::AwaitingMove(_) => None,
        }
    }

    pub fn side(&self, side: Side) -> &Combatant {
        &self.sides[side.index()]
    }

    pub fn side_of(&self, username: &str) -> Option<Side> {
        [Side::One, Side::Two]
            .into_iter()
            .find(|side| self.sides[side.index()].username == username)
    }

    /// Resolves one move by `side`. A move out of turn or after the battle
    /// has ended is rejected without touching any state.
    pub fn perform_move(&mut self, side: Side, kind: MoveKind) -> Result<MoveReport, BattleError> {
        match self.phase {
            Phase::Over(_) => return Err(BattleError::AlreadyOver),
            Phase::AwaitingMove(turn) if turn != side => return Err(BattleError::NotYourTurn),
            Phase::AwaitingMove(_) => {}
        }

        let (attacker, defender) = self.pair_mut(side);
        let attacking = attacker
            .active_creature()
            .cloned()
            .ok_or(BattleError::AlreadyOver)?;
        let target = defender
            .active_creature_mut()
            .ok_or(BattleError::AlreadyOver)?;

        let damage = kind.damage(&attacking, target);
        let remaining_hp = target.take_damage(damage);
        let defender_creature = target.name.clone();
        let fainted = remaining_hp == 0;

        debug!(
            "{}'s {} used a {} move on {}'s {} for {} damage ({} HP left)",
            attacker.username,
            attacking.name,
            kind,
            defender.username,
            defender_creature,
            damage,
            remaining_hp
        );

        let mut report = MoveReport {
            attacker: side,
            kind,
            attacker_creature: attacking.name,
            defender_creature,
            damage,
            remaining_hp,
            fainted,
            next_creature: None,
            next_turn: None,
            outcome: None,
        };

        if fainted {
            report.next_creature = defender.advance().map(|c| c.name.clone());
            if report.next_creature.is_none() {
                let outcome = self.finish(side, false);
                report.outcome = Some(outcome);
                return Ok(report);
            }
        }

        self.phase = Phase::AwaitingMove(side.other());
        report.next_turn = Some(side.other());
        Ok(report)
    }

    /// Ends the battle in favour of the side that did not forfeit.
    pub fn forfeit(&mut self, side: Side) -> Result<BattleOutcome, BattleError> {
        if self.is_over() {
            return Err(BattleError::AlreadyOver);
        }
        info!("{} forfeits the battle", self.sides[side.index()].username);
        Ok(self.finish(side.other(), true))
    }

    fn pair_mut(&mut self, attacker: Side) -> (&mut Combatant, &mut Combatant) {
        let [one, two] = &mut self.sides;
        match attacker {
            Side::One => (one, two),
            Side::Two => (two, one),
        }
    }

    fn finish(&mut self, winner: Side, forfeited: bool) -> BattleOutcome {
        let (winning, losing) = self.pair_mut(winner);
        let (total_experience, experience_per_creature) =
            award_experience(&mut winning.roster, &losing.roster);

        let outcome = BattleOutcome {
            winner,
            winner_name: winning.username.clone(),
            loser_name: losing.username.clone(),
            total_experience,
            experience_per_creature,
            forfeited,
        };

        info!(
            "{} won the battle against {}: {} experience, +{} levels per creature",
            outcome.winner_name,
            outcome.loser_name,
            total_experience,
            experience_per_creature
        );

        self.phase = Phase::Over(outcome.clone());
        outcome
    }
}

/// Splits `level * 10` for every losing creature evenly across the winning
/// roster (remainder discarded) and adds the share to each winner's level.
/// Levels are not capped at 100.
///
/// Returns `(total, per_creature)`.
pub fn award_experience(winners: &mut [Creature], losers: &[Creature]) -> (u32, u32) {
    let total = losers
        .iter()
        .fold(0u32, |acc, c| acc.saturating_add(c.experience_value()));
    let per_creature = u32::try_from(winners.len())
        .ok()
        .and_then(|n| total.checked_div(n))
        .unwrap_or(0);

    for creature in winners.iter_mut() {
        creature.level = creature.level.saturating_add(per_creature);
    }
    (total, per_creature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{BaseStats, Stage};

    fn creature(name: &str, hp: u32, attack: u32, defense: u32, speed: u32, level: u32) -> Creature {
        let base = BaseStats {
            name: name.to_string(),
            hp,
            attack,
            defense,
            special_attack: 80,
            special_defense: 30,
            speed,
            abilities: vec![],
            types: vec![],
        };
        Creature::from_base(&base, level, 0.5)
    }

    fn two_on_one() -> Battle {
        let a = Combatant::new(
            "alice",
            vec![
                creature("arcanine", 200, 100, 50, 80, 10),
                creature("growlithe", 100, 70, 45, 60, 20),
            ],
        );
        let b = Combatant::new(
            "bob",
            vec![
                creature("onix", 120, 45, 40, 60, 7),
                creature("geodude", 60, 80, 100, 20, 5),
            ],
        );
        Battle::start(a, b).unwrap()
    }

    #[test]
    fn test_start_requires_creatures() {
        let empty = Combatant::new("bob", vec![]);
        let full = Combatant::new("alice", vec![creature("a", 10, 10, 10, 10, 1)]);
        assert_eq!(
            Battle::start(full, empty),
            Err(BattleError::EmptyRoster("bob".to_string()))
        );
    }

    #[test]
    fn test_faster_side_moves_first() {
        let battle = two_on_one();
        assert_eq!(battle.turn(), Some(Side::One));

        let slow = Combatant::new("slow", vec![creature("slowpoke", 90, 65, 65, 15, 5)]);
        let fast = Combatant::new("fast", vec![creature("jolteon", 65, 65, 60, 130, 5)]);
        let battle = Battle::start(slow, fast).unwrap();
        assert_eq!(battle.turn(), Some(Side::Two));
    }

    #[test]
    fn test_speed_tie_goes_to_side_one() {
        let a = Combatant::new("a", vec![creature("x", 50, 50, 50, 70, 5)]);
        let b = Combatant::new("b", vec![creature("y", 50, 50, 50, 70, 5)]);
        let battle = Battle::start(a, b).unwrap();
        assert_eq!(battle.turn(), Some(Side::One));
    }

    #[test]
    fn test_start_sends_out_active_creatures() {
        let battle = two_on_one();
        assert_eq!(
            battle.side(Side::One).active_creature().unwrap().stage,
            Stage::BattleActive
        );
        assert_eq!(battle.side(Side::Two).roster()[1].stage, Stage::Wild);
    }

    #[test]
    fn test_out_of_turn_move_is_rejected_without_change() {
        let mut battle = two_on_one();
        let before = battle.clone();

        assert_eq!(
            battle.perform_move(Side::Two, MoveKind::Normal),
            Err(BattleError::NotYourTurn)
        );
        assert_eq!(battle, before);
    }

    #[test]
    fn test_turn_toggles_after_each_move() {
        let mut battle = two_on_one();

        let report = battle.perform_move(Side::One, MoveKind::Normal).unwrap();
        assert_eq!(report.next_turn, Some(Side::Two));
        assert_eq!(battle.turn(), Some(Side::Two));
        assert!(battle.perform_move(Side::One, MoveKind::Normal).is_err());

        let report = battle.perform_move(Side::Two, MoveKind::Special).unwrap();
        assert_eq!(report.next_turn, Some(Side::One));
        assert_eq!(battle.turn(), Some(Side::One));
    }

    #[test]
    fn test_normal_attack_deals_exact_damage() {
        let mut battle = two_on_one();
        let report = battle.perform_move(Side::One, MoveKind::Normal).unwrap();

        assert_eq!(report.damage, 60);
        assert_eq!(report.remaining_hp, 60);
        assert_eq!(report.defender_creature, "onix");
        assert!(!report.fainted);
        assert_eq!(battle.side(Side::Two).active_creature().unwrap().hp, 60);
    }

    #[test]
    fn test_special_attack_uses_multiplier() {
        // 80 * 0.5 = 40 against special defense 30
        let mut battle = two_on_one();
        let report = battle.perform_move(Side::One, MoveKind::Special).unwrap();
        assert_eq!(report.damage, 10);
    }

    #[test]
    fn test_zero_damage_move_still_passes_turn() {
        let mut battle = two_on_one();
        battle.perform_move(Side::One, MoveKind::Normal).unwrap();

        // onix attack 45 vs arcanine defense 50
        let report = battle.perform_move(Side::Two, MoveKind::Normal).unwrap();
        assert_eq!(report.damage, 0);
        assert_eq!(report.remaining_hp, 200);
        assert_eq!(battle.turn(), Some(Side::One));
    }

    #[test]
    fn test_faint_advances_to_next_creature() {
        let mut battle = two_on_one();
        battle.perform_move(Side::One, MoveKind::Normal).unwrap();
        battle.perform_move(Side::Two, MoveKind::Normal).unwrap();
        let report = battle.perform_move(Side::One, MoveKind::Normal).unwrap();

        assert!(report.fainted);
        assert_eq!(report.remaining_hp, 0);
        assert_eq!(report.next_creature.as_deref(), Some("geodude"));
        assert_eq!(report.next_turn, Some(Side::Two));
        assert!(report.outcome.is_none());

        let bob = battle.side(Side::Two);
        assert_eq!(bob.active_index(), 1);
        assert_eq!(bob.roster()[0].hp, 0);
        assert_eq!(bob.roster()[0].stage, Stage::Fainted);
        assert_eq!(bob.roster()[1].stage, Stage::BattleActive);
        assert_eq!(bob.remaining(), 1);
    }

    #[test]
    fn test_last_faint_ends_battle_with_experience() {
        let mut battle = two_on_one();
        // onix: two normal hits
        battle.perform_move(Side::One, MoveKind::Normal).unwrap();
        battle.perform_move(Side::Two, MoveKind::Normal).unwrap();
        battle.perform_move(Side::One, MoveKind::Normal).unwrap();

        // geodude: defense 100 blocks normal, special 40 - 30 = 10 per hit
        let mut last = None;
        for _ in 0..6 {
            battle.perform_move(Side::Two, MoveKind::Normal).unwrap();
            last = Some(battle.perform_move(Side::One, MoveKind::Special).unwrap());
        }

        let report = last.unwrap();
        assert!(report.fainted);
        assert!(report.next_creature.is_none());
        assert!(report.next_turn.is_none());
        assert!(battle.is_over());

        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.winner, Side::One);
        assert_eq!(outcome.winner_name, "alice");
        assert_eq!(outcome.loser_name, "bob");
        // (7 + 5) * 10 = 120 split over 2 creatures
        assert_eq!(outcome.total_experience, 120);
        assert_eq!(outcome.experience_per_creature, 60);
        assert!(!outcome.forfeited);

        let alice = battle.side(Side::One).roster();
        assert_eq!(alice[0].level, 70);
        assert_eq!(alice[1].level, 80);
        assert_eq!(battle.outcome(), Some(&outcome));
    }

    #[test]
    fn test_moves_after_battle_over_are_rejected() {
        let a = Combatant::new("a", vec![creature("x", 50, 200, 50, 90, 5)]);
        let b = Combatant::new("b", vec![creature("y", 50, 50, 50, 10, 5)]);
        let mut battle = Battle::start(a, b).unwrap();

        let report = battle.perform_move(Side::One, MoveKind::Normal).unwrap();
        assert!(report.outcome.is_some());
        assert_eq!(
            battle.perform_move(Side::Two, MoveKind::Normal),
            Err(BattleError::AlreadyOver)
        );
        assert_eq!(battle.forfeit(Side::Two), Err(BattleError::AlreadyOver));
    }

    #[test]
    fn test_forfeit_awards_other_side() {
        let mut battle = two_on_one();
        let outcome = battle.forfeit(Side::One).unwrap();

        assert_eq!(outcome.winner, Side::Two);
        assert!(outcome.forfeited);
        // (10 + 20) * 10 = 300 over 2 creatures
        assert_eq!(outcome.experience_per_creature, 150);
        assert_eq!(battle.side(Side::Two).roster()[0].level, 157);
        assert!(battle.is_over());
    }

    #[test]
    fn test_experience_remainder_is_discarded() {
        let mut winners = vec![
            creature("a", 10, 10, 10, 10, 1),
            creature("b", 10, 10, 10, 10, 2),
            creature("c", 10, 10, 10, 10, 3),
        ];
        // (3 + 4) * 10 = 70, 70 / 3 = 23 remainder 1
        let losers = vec![
            creature("x", 10, 10, 10, 10, 3),
            creature("y", 10, 10, 10, 10, 4),
        ];

        let (total, per) = award_experience(&mut winners, &losers);
        assert_eq!(total, 70);
        assert_eq!(per, 23);
        assert_eq!(
            winners.iter().map(|c| c.level).collect::<Vec<_>>(),
            vec![24, 25, 26]
        );
    }

    #[test]
    fn test_levels_can_exceed_one_hundred() {
        let mut winners = vec![creature("veteran", 10, 10, 10, 10, 100)];
        let losers = vec![creature("x", 10, 10, 10, 10, 100)];

        award_experience(&mut winners, &losers);
        assert_eq!(winners[0].level, 1100);
    }

    #[test]
    fn test_side_lookup() {
        let battle = two_on_one();
        assert_eq!(battle.side_of("alice"), Some(Side::One));
        assert_eq!(battle.side_of("bob"), Some(Side::Two));
        assert_eq!(battle.side_of("carol"), None);
        assert_eq!(Side::One.other(), Side::Two);
    }
}
