//! Turns typed lines into commands before they go over the wire

use shared::protocol::HELP_LINES;
use shared::{Command, ParseError};

/// What to do with one line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Forward the command to the server
    Send(Command),
    /// Print the command list locally without a round trip
    Help,
    /// Line could not be parsed; nothing is sent
    Invalid(ParseError),
    /// Blank line
    Empty,
}

pub fn interpret(line: &str) -> Input {
    if line.trim().is_empty() {
        return Input::Empty;
    }
    match Command::parse(line) {
        Ok(Command::Help) => Input::Help,
        Ok(command) => Input::Send(command),
        Err(e) => Input::Invalid(e),
    }
}

pub fn help_text() -> String {
    let mut text = String::from("Commands:\n");
    for line in HELP_LINES {
        text.push_str("  ");
        text.push_str(line);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Direction, MoveKind};

    #[test]
    fn test_commands_are_forwarded() {
        assert_eq!(
            interpret("move up"),
            Input::Send(Command::Move {
                direction: Direction::Up
            })
        );
        assert_eq!(
            interpret("  ATTACK special "),
            Input::Send(Command::Attack {
                kind: MoveKind::Special
            })
        );
        assert_eq!(interpret("exit"), Input::Send(Command::Quit));
    }

    #[test]
    fn test_help_and_blank_lines_stay_local() {
        assert_eq!(interpret("help"), Input::Help);
        assert_eq!(interpret("   "), Input::Empty);
        assert!(help_text().contains("attack <normal|special>"));
    }

    #[test]
    fn test_typos_are_reported() {
        assert_eq!(
            interpret("move sideways"),
            Input::Invalid(ParseError::InvalidArgument {
                command: "move",
                value: "sideways".to_string()
            })
        );
        assert!(matches!(interpret("jump"), Input::Invalid(ParseError::UnknownCommand(_))));
    }
}
