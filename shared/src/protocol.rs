//! Line protocol spoken between the terminal client and the game server.
//!
//! Each request is one newline-terminated line of whitespace-separated tokens.
//! World movement and battle actions use distinct verbs (`move` versus `attack`)
//! so a line never needs the connection's mode to be interpreted.

use crate::creature::MoveKind;
use crate::Direction;
use std::fmt;
use thiserror::Error;

pub const MAX_USERNAME_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join { username: String },
    Move { direction: Direction },
    Status,
    Dex { creature: String },
    Arena,
    Pick { creature: String },
    Ready,
    Attack { kind: MoveKind },
    Forfeit,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("'{command}' does not understand '{value}'")]
    InvalidArgument { command: &'static str, value: String },

    #[error("'{0}' takes no further arguments")]
    TrailingArguments(&'static str),

    #[error("username must be 1-24 letters, digits, '_' or '-'")]
    InvalidUsername,
}

/// Help text shown by both client and server.
pub const HELP_LINES: &[&str] = &[
    "join <username>            enter the world",
    "move <up|down|left|right>  walk one cell, capturing any creature there",
    "status                     show position and roster",
    "dex <creature>             look up a creature's base stats",
    "arena                      enter the battle lobby",
    "pick <creature>            add a creature to your battle team (max 3)",
    "ready                      start the battle once both players are ready",
    "attack <normal|special>    battle move, only on your turn",
    "forfeit                    concede the current battle",
    "quit                       disconnect",
];

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut tokens = line.split_whitespace();
        let verb = tokens.next().ok_or(ParseError::Empty)?.to_ascii_lowercase();

        let command = match verb.as_str() {
            "join" => {
                let username = required(&mut tokens, "join", "a username")?;
                validate_username(username)?;
                Command::Join {
                    username: username.to_string(),
                }
            }
            "move" => Command::Move {
                direction: required(&mut tokens, "move", "a direction")?.parse()?,
            },
            "status" => Command::Status,
            "dex" => Command::Dex {
                creature: required(&mut tokens, "dex", "a creature name")?.to_ascii_lowercase(),
            },
            "arena" => Command::Arena,
            "pick" => Command::Pick {
                creature: required(&mut tokens, "pick", "a creature name")?.to_ascii_lowercase(),
            },
            "ready" => Command::Ready,
            "attack" => Command::Attack {
                kind: required(&mut tokens, "attack", "normal or special")?.parse()?,
            },
            "forfeit" => Command::Forfeit,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => return Err(ParseError::UnknownCommand(verb.clone())),
        };

        if tokens.next().is_some() {
            return Err(ParseError::TrailingArguments(command.verb()));
        }
        Ok(command)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::Join { .. } => "join",
            Command::Move { .. } => "move",
            Command::Status => "status",
            Command::Dex { .. } => "dex",
            Command::Arena => "arena",
            Command::Pick { .. } => "pick",
            Command::Ready => "ready",
            Command::Attack { .. } => "attack",
            Command::Forfeit => "forfeit",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Join { username } => write!(f, "join {}", username),
            Command::Move { direction } => write!(f, "move {}", direction),
            Command::Dex { creature } => write!(f, "dex {}", creature),
            Command::Pick { creature } => write!(f, "pick {}", creature),
            Command::Attack { kind } => write!(f, "attack {}", kind),
            other => f.write_str(other.verb()),
        }
    }
}

fn required<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, ParseError> {
    tokens
        .next()
        .ok_or(ParseError::MissingArgument { command, argument })
}

pub fn validate_username(username: &str) -> Result<(), ParseError> {
    let valid_len = (1..=MAX_USERNAME_LEN).contains(&username.chars().count());
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid_len && valid_chars {
        Ok(())
    } else {
        Err(ParseError::InvalidUsername)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_world_commands() {
        assert_eq!(
            Command::parse("join ash").unwrap(),
            Command::Join {
                username: "ash".to_string()
            }
        );
        assert_eq!(
            Command::parse("  MOVE   left ").unwrap(),
            Command::Move {
                direction: Direction::Left
            }
        );
        assert_eq!(Command::parse("status").unwrap(), Command::Status);
        assert_eq!(
            Command::parse("dex Onix").unwrap(),
            Command::Dex {
                creature: "onix".to_string()
            }
        );
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_battle_commands() {
        assert_eq!(Command::parse("arena").unwrap(), Command::Arena);
        assert_eq!(
            Command::parse("pick Pikachu").unwrap(),
            Command::Pick {
                creature: "pikachu".to_string()
            }
        );
        assert_eq!(
            Command::parse("attack special").unwrap(),
            Command::Attack {
                kind: MoveKind::Special
            }
        );
        assert_eq!(Command::parse("ready").unwrap(), Command::Ready);
        assert_eq!(Command::parse("forfeit").unwrap(), Command::Forfeit);
    }

    #[test]
    fn test_move_and_attack_do_not_overlap() {
        assert!(matches!(
            Command::parse("move normal"),
            Err(ParseError::InvalidArgument { command: "move", .. })
        ));
        assert!(matches!(
            Command::parse("attack up"),
            Err(ParseError::InvalidArgument {
                command: "attack",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("dance"),
            Err(ParseError::UnknownCommand("dance".to_string()))
        );
        assert_eq!(
            Command::parse("move"),
            Err(ParseError::MissingArgument {
                command: "move",
                argument: "a direction"
            })
        );
        assert_eq!(
            Command::parse("ready now"),
            Err(ParseError::TrailingArguments("ready"))
        );
        assert_eq!(
            Command::parse("join bad!name"),
            Err(ParseError::InvalidUsername)
        );
    }

    #[test]
    fn test_display_is_parseable() {
        let commands = [
            Command::Join {
                username: "misty".to_string(),
            },
            Command::Move {
                direction: Direction::Down,
            },
            Command::Attack {
                kind: MoveKind::Normal,
            },
            Command::Dex {
                creature: "geodude".to_string(),
            },
            Command::Forfeit,
        ];
        for command in commands {
            assert_eq!(Command::parse(&command.to_string()).unwrap(), command);
        }
    }

    #[test]
    fn test_username_length_limit() {
        assert!(validate_username(&"a".repeat(MAX_USERNAME_LEN)).is_ok());
        assert!(validate_username(&"a".repeat(MAX_USERNAME_LEN + 1)).is_err());
        assert!(validate_username("").is_err());
    }
}
