//! Battle lobby: gathers two players, lets them pick their teams and drives
//! one [`Battle`] at a time.
//!
//! Every operation returns the [`Notice`]s to deliver, addressed by username,
//! so the lock around the arena is never held while writing to a socket.

use crate::battle::{Battle, BattleError, BattleOutcome, Combatant, MoveReport, Side};
use crate::catalog::Catalog;
use crate::roster::{Roster, RosterError};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::MoveKind;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("you are already in the arena")]
    AlreadyEntered,

    #[error("the arena is full, try again after the current battle")]
    ArenaFull,

    #[error("a battle is in progress")]
    BattleInProgress,

    #[error("you are not in the arena, type 'arena' first")]
    NotEntered,

    #[error("pick at least one creature before declaring ready")]
    EmptyTeam,

    #[error("you are not in a battle")]
    NoBattle,

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error(transparent)]
    Battle(#[from] BattleError),
}

/// A line of text for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub to: String,
    pub text: String,
}

impl Notice {
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Entrant {
    username: String,
    team: Roster,
    ready: bool,
}

#[derive(Debug)]
enum ArenaState {
    WaitingForPlayers(Vec<Entrant>),
    InBattle(Battle),
}

pub struct ArenaCore {
    state: ArenaState,
    catalog: Arc<Catalog>,
    team_capacity: usize,
    rng: StdRng,
}

impl ArenaCore {
    pub fn new(catalog: Arc<Catalog>, team_capacity: usize) -> Self {
        Self::with_rng(catalog, team_capacity, StdRng::from_entropy())
    }

    pub fn with_rng(catalog: Arc<Catalog>, team_capacity: usize, rng: StdRng) -> Self {
        Self {
            state: ArenaState::WaitingForPlayers(Vec::new()),
            catalog,
            team_capacity,
            rng,
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        match &self.state {
            ArenaState::WaitingForPlayers(entrants) => {
                entrants.iter().any(|e| e.username == username)
            }
            ArenaState::InBattle(battle) => battle.side_of(username).is_some(),
        }
    }

    pub fn battle(&self) -> Option<&Battle> {
        match &self.state {
            ArenaState::InBattle(battle) => Some(battle),
            ArenaState::WaitingForPlayers(_) => None,
        }
    }

    pub fn enter(&mut self, username: &str) -> Result<Vec<Notice>, ArenaError> {
        let entrants = match &mut self.state {
            ArenaState::InBattle(battle) if battle.side_of(username).is_some() => {
                return Err(ArenaError::AlreadyEntered)
            }
            ArenaState::InBattle(_) => return Err(ArenaError::BattleInProgress),
            ArenaState::WaitingForPlayers(entrants) => entrants,
        };

        if entrants.iter().any(|e| e.username == username) {
            return Err(ArenaError::AlreadyEntered);
        }
        if entrants.len() >= 2 {
            return Err(ArenaError::ArenaFull);
        }

        let mut notices = vec![Notice::new(
            username,
            format!(
                "You entered the arena. Pick up to {} creatures with 'pick <name>', then type 'ready'.",
                self.team_capacity
            ),
        )];
        for other in entrants.iter() {
            notices.push(Notice::new(
                &other.username,
                format!("{} entered the arena", username),
            ));
            notices.push(Notice::new(
                username,
                format!("{} is waiting in the arena", other.username),
            ));
        }

        entrants.push(Entrant {
            username: username.to_string(),
            team: Roster::new(self.team_capacity),
            ready: false,
        });
        info!("{} entered the arena", username);
        Ok(notices)
    }

    pub fn pick(&mut self, username: &str, creature: &str) -> Result<Vec<Notice>, ArenaError> {
        let entrant = find_entrant(&mut self.state, username)?;
        let added = entrant
            .team
            .add_creature(&self.catalog, creature, &mut self.rng)?
            .to_string();
        let text = format!(
            "{} added to your team ({}/{})",
            added,
            entrant.team.len(),
            entrant.team.capacity()
        );
        Ok(vec![Notice::new(username, text)])
    }

    /// Marks `username` ready and starts the battle once both entrants are.
    pub fn ready(&mut self, username: &str) -> Result<Vec<Notice>, ArenaError> {
        let entrant = find_entrant(&mut self.state, username)?;
        if entrant.team.is_empty() {
            return Err(ArenaError::EmptyTeam);
        }
        entrant.ready = true;

        let ArenaState::WaitingForPlayers(entrants) = &mut self.state else {
            return Err(ArenaError::BattleInProgress);
        };
        if entrants.len() < 2 || entrants.iter().any(|e| !e.ready) {
            let mut notices = vec![Notice::new(username, "Ready! Waiting for an opponent...")];
            notices.extend(
                entrants
                    .iter()
                    .filter(|e| e.username != username)
                    .map(|e| Notice::new(&e.username, format!("{} is ready", username))),
            );
            return Ok(notices);
        }

        let mut drained = entrants.drain(..);
        let (Some(one), Some(two)) = (drained.next(), drained.next()) else {
            return Err(ArenaError::NotEntered);
        };
        drop(drained);

        let battle = Battle::start(
            Combatant::new(one.username, one.team.into_creatures()),
            Combatant::new(two.username, two.team.into_creatures()),
        )?;
        let notices = battle_start_notices(&battle);
        self.state = ArenaState::InBattle(battle);
        Ok(notices)
    }

    pub fn attack(&mut self, username: &str, kind: MoveKind) -> Result<Vec<Notice>, ArenaError> {
        let ArenaState::InBattle(battle) = &mut self.state else {
            return Err(ArenaError::NoBattle);
        };
        let side = battle.side_of(username).ok_or(ArenaError::NoBattle)?;
        let report = battle.perform_move(side, kind)?;

        let notices = move_notices(battle, &report);
        if report.outcome.is_some() {
            self.reset();
        }
        Ok(notices)
    }

    /// Concedes a running battle, or simply leaves the lobby.
    pub fn forfeit(&mut self, username: &str) -> Result<Vec<Notice>, ArenaError> {
        match &mut self.state {
            ArenaState::InBattle(battle) => {
                let side = battle.side_of(username).ok_or(ArenaError::NoBattle)?;
                let outcome = battle.forfeit(side)?;
                let mut notices = vec![Notice::new(username, "You forfeited the battle.")];
                notices.extend(outcome_notices(&outcome));
                self.reset();
                Ok(notices)
            }
            ArenaState::WaitingForPlayers(entrants) => {
                let before = entrants.len();
                entrants.retain(|e| e.username != username);
                if entrants.len() == before {
                    return Err(ArenaError::NotEntered);
                }
                let mut notices = vec![Notice::new(username, "You left the arena.")];
                notices.extend(
                    entrants
                        .iter()
                        .map(|e| Notice::new(&e.username, format!("{} left the arena", username))),
                );
                Ok(notices)
            }
        }
    }

    /// Removes a disconnected player. A running battle is forfeited so it
    /// always reaches a final state. Returns notices for the remaining player.
    pub fn disconnect(&mut self, username: &str) -> Vec<Notice> {
        if !self.contains(username) {
            return Vec::new();
        }
        info!("{} disconnected from the arena", username);
        match self.forfeit(username) {
            Ok(notices) => notices.into_iter().filter(|n| n.to != username).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// One-line summary of the player's arena situation, if any.
    pub fn status(&self, username: &str) -> Option<String> {
        match &self.state {
            ArenaState::WaitingForPlayers(entrants) => {
                let entrant = entrants.iter().find(|e| e.username == username)?;
                Some(format!(
                    "Arena lobby, team: {}{}",
                    entrant.team.summary(),
                    if entrant.ready { " (ready)" } else { "" }
                ))
            }
            ArenaState::InBattle(battle) => {
                let side = battle.side_of(username)?;
                let own = battle.side(side);
                let opponent = battle.side(side.other());
                let active = own
                    .active_creature()
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                let turn = if battle.turn() == Some(side) {
                    "your turn"
                } else {
                    "opponent's turn"
                };
                Some(format!(
                    "Battling {}: your {} ({} left), {}",
                    opponent.username(),
                    active,
                    own.remaining(),
                    turn
                ))
            }
        }
    }

    fn reset(&mut self) {
        self.state = ArenaState::WaitingForPlayers(Vec::new());
    }
}

fn find_entrant<'a>(state: &'a mut ArenaState, username: &str) -> Result<&'a mut Entrant, ArenaError> {
    match state {
        ArenaState::InBattle(battle) if battle.side_of(username).is_some() => {
            Err(ArenaError::BattleInProgress)
        }
        ArenaState::InBattle(_) => Err(ArenaError::NotEntered),
        ArenaState::WaitingForPlayers(entrants) => entrants
            .iter_mut()
            .find(|e| e.username == username)
            .ok_or(ArenaError::NotEntered),
    }
}

fn battle_start_notices(battle: &Battle) -> Vec<Notice> {
    let mut notices = Vec::new();
    for side in [Side::One, Side::Two] {
        let own = battle.side(side);
        let opponent = battle.side(side.other());
        notices.push(Notice::new(
            own.username(),
            format!(
                "Battle started! You are fighting against {}",
                opponent.username()
            ),
        ));
        if let (Some(mine), Some(theirs)) = (own.active_creature(), opponent.active_creature()) {
            notices.push(Notice::new(
                own.username(),
                format!("Your {} faces {}'s {}", mine, opponent.username(), theirs),
            ));
        }
        let order = if battle.turn() == Some(side) {
            "You go first!"
        } else {
            "Opponent goes first!"
        };
        notices.push(Notice::new(own.username(), order));
    }
    notices
}

fn move_notices(battle: &Battle, report: &MoveReport) -> Vec<Notice> {
    let attacker = battle.side(report.attacker).username();
    let defender = battle.side(report.attacker.other()).username();
    let mut notices = Vec::new();

    if report.fainted {
        notices.push(Notice::new(
            attacker,
            format!(
                "Your {} dealt {} damage. You defeated {}'s {}!",
                report.attacker_creature, report.damage, defender, report.defender_creature
            ),
        ));
        notices.push(Notice::new(
            defender,
            format!(
                "{}'s {} dealt {} damage. Your {} fainted!",
                attacker, report.attacker_creature, report.damage, report.defender_creature
            ),
        ));
        if let Some(next) = &report.next_creature {
            notices.push(Notice::new(defender, format!("You send out {}!", next)));
            notices.push(Notice::new(attacker, format!("{} sends out {}!", defender, next)));
        }
    } else {
        notices.push(Notice::new(
            attacker,
            format!(
                "You dealt {} damage to {}'s {}! ({} HP left)",
                report.damage, defender, report.defender_creature, report.remaining_hp
            ),
        ));
        notices.push(Notice::new(
            defender,
            format!(
                "Your {} took {} damage from a {} move! ({} HP left)",
                report.defender_creature, report.damage, report.kind, report.remaining_hp
            ),
        ));
    }

    match (&report.outcome, report.next_turn) {
        (Some(outcome), _) => notices.extend(outcome_notices(outcome)),
        (None, Some(next)) => notices.push(Notice::new(battle.side(next).username(), "Your turn!")),
        (None, None) => {}
    }
    notices
}

fn outcome_notices(outcome: &BattleOutcome) -> Vec<Notice> {
    let prefix = if outcome.forfeited {
        format!("{} forfeited. ", outcome.loser_name)
    } else {
        String::new()
    };
    vec![
        Notice::new(
            &outcome.winner_name,
            format!(
                "{}You won the battle! Each of your creatures gained {} levels.",
                prefix, outcome.experience_per_creature
            ),
        ),
        Notice::new(&outcome.loser_name, "You lost the battle!"),
    ]
}

/// Cloneable handle to the arena behind a lock scoped to the battle.
#[derive(Clone)]
pub struct Arena {
    core: Arc<Mutex<ArenaCore>>,
}

impl Arena {
    pub fn new(core: ArenaCore) -> Self {
        Self {
            core: Arc::new(Mutex::new(core)),
        }
    }

    pub async fn enter(&self, username: &str) -> Result<Vec<Notice>, ArenaError> {
        self.core.lock().await.enter(username)
    }

    pub async fn pick(&self, username: &str, creature: &str) -> Result<Vec<Notice>, ArenaError> {
        self.core.lock().await.pick(username, creature)
    }

    pub async fn ready(&self, username: &str) -> Result<Vec<Notice>, ArenaError> {
        self.core.lock().await.ready(username)
    }

    pub async fn attack(&self, username: &str, kind: MoveKind) -> Result<Vec<Notice>, ArenaError> {
        self.core.lock().await.attack(username, kind)
    }

    pub async fn forfeit(&self, username: &str) -> Result<Vec<Notice>, ArenaError> {
        self.core.lock().await.forfeit(username)
    }

    pub async fn disconnect(&self, username: &str) -> Vec<Notice> {
        self.core.lock().await.disconnect(username)
    }

    pub async fn status(&self, username: &str) -> Option<String> {
        self.core.lock().await.status(username)
    }
}
