// Line-driven operator input for the interactive console.
//
// Each line typed at the prompt becomes one `Action`; the REPL in main.rs
// applies it to the client. Parsing is kept apart so it can be tested
// without a terminal.

use std::fmt;

use rovlink::{Direction, RobotId};

/// One operator event read from the console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Direction button pressed.
    Drive(Direction),
    /// Stop button (or button release).
    Stop,
    /// Slider moved to this raw value.
    Velocity(f64),
    /// Robot picked from the roster.
    Robot(RobotId),
    /// Autonomy button.
    Autonomy,
    Connect,
    Disconnect,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseActionError(String);

impl fmt::Display for ParseActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseActionError {}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Action>, ParseActionError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        return Err(ParseActionError(format!("unexpected argument: {extra}")));
    }

    let word = word.to_ascii_lowercase();
    let action = match (word.as_str(), arg) {
        ("stop" | "s", None) => Action::Stop,
        ("auto" | "a", None) => Action::Autonomy,
        ("connect" | "c", None) => Action::Connect,
        ("disconnect" | "d", None) => Action::Disconnect,
        ("status", None) => Action::Status,
        ("help" | "?", None) => Action::Help,
        ("quit" | "exit" | "q", None) => Action::Quit,
        ("vel" | "v", Some(raw)) => Action::Velocity(
            raw.parse()
                .map_err(|_| ParseActionError(format!("invalid velocity: {raw}")))?,
        ),
        ("robot", Some(raw)) => Action::Robot(
            raw.parse()
                .map_err(|e: rovlink::ParseRobotIdError| ParseActionError(e.to_string()))?,
        ),
        ("vel" | "v" | "robot", None) => {
            return Err(ParseActionError(format!("{word} needs a value")));
        }
        (other, None) => Action::Drive(
            other
                .parse()
                .map_err(|_| ParseActionError(format!("unknown command: {other} (try help)")))?,
        ),
        (other, Some(_)) => {
            return Err(ParseActionError(format!("{other} takes no argument")));
        }
    };

    Ok(Some(action))
}

pub const HELP: &str = "\
  f b l r lf rf lb rb   drive at the current velocity
  stop                  halt the rover
  vel <n>               set velocity (slider value, truncated)
  robot <id>            select a robot
  auto                  toggle autonomous mode
  connect | disconnect  open or close the session
  status                show session and operator state
  quit                  disconnect and exit";
