//! Rover command builders and parser.
//!
//! All functions are pure. They produce or consume bytes without performing
//! any I/O; the session layer writes the encoded bytes to the socket.
//!
//! # Command reference
//!
//! | Command          | Wire form          |
//! |------------------|--------------------|
//! | stop             | `STOP`             |
//! | forward          | `F{velocity}`      |
//! | backward         | `B{velocity}`      |
//! | turn left        | `L{velocity}`      |
//! | turn right       | `R{velocity}`      |
//! | left-forward     | `LF{velocity}`     |
//! | right-forward    | `RF{velocity}`     |
//! | left-backward    | `LB{velocity}`     |
//! | right-backward   | `RB{velocity}`     |
//! | autonomy on/off  | `auto1` / `auto0`  |
//!
//! Prefixes are initials rather than words. The rover firmware matches
//! substrings, and word forms such as `left` and `turn left` would match
//! each other.

use std::fmt;

use rovlink_core::{Direction, Velocity};

/// Wire form of the stop command.
pub const STOP: &str = "STOP";

/// Prefix of the autonomy command; followed by `0` or `1`.
const AUTONOMY_PREFIX: &str = "auto";

/// A single command for the addressed rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Halt all tracks.
    Stop,
    /// Drive in a direction at a velocity.
    Drive {
        direction: Direction,
        velocity: Velocity,
    },
    /// Switch autonomous mode on or off.
    Autonomy { on: bool },
}

impl Command {
    /// Build a directional command.
    pub fn drive(direction: Direction, velocity: Velocity) -> Self {
        Command::Drive {
            direction,
            velocity,
        }
    }

    /// The keep-alive sent while autonomous mode is on (`auto1`).
    pub fn heartbeat() -> Self {
        Command::Autonomy { on: true }
    }

    /// Encode the command to the bytes written on the socket.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Parse a wire string back into a command.
    ///
    /// Directional prefixes are matched longest first, so `LF1` is
    /// left-forward and never turn-left with a stray `F`.
    pub fn parse(wire: &str) -> Result<Command, ParseCommandError> {
        if wire == STOP {
            return Ok(Command::Stop);
        }

        if let Some(state) = wire.strip_prefix(AUTONOMY_PREFIX) {
            return match state {
                "0" => Ok(Command::Autonomy { on: false }),
                "1" => Ok(Command::Autonomy { on: true }),
                _ => Err(ParseCommandError(wire.to_string())),
            };
        }

        let mut by_length = Direction::ALL;
        by_length.sort_by_key(|d| std::cmp::Reverse(prefix(*d).len()));

        for direction in by_length {
            if let Some(rest) = wire.strip_prefix(prefix(direction)) {
                return parse_velocity(rest)
                    .map(|velocity| Command::drive(direction, velocity))
                    .ok_or_else(|| ParseCommandError(wire.to_string()));
            }
        }

        Err(ParseCommandError(wire.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Stop => f.write_str(STOP),
            Command::Drive {
                direction,
                velocity,
            } => write!(f, "{}{}", prefix(*direction), velocity),
            Command::Autonomy { on } => write!(f, "{AUTONOMY_PREFIX}{}", u8::from(*on)),
        }
    }
}

/// The wire prefix for a direction.
pub fn prefix(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "F",
        Direction::Backward => "B",
        Direction::Left => "L",
        Direction::Right => "R",
        Direction::LeftForward => "LF",
        Direction::RightForward => "RF",
        Direction::LeftBackward => "LB",
        Direction::RightBackward => "RB",
    }
}

/// Canonical decimal only: optional `-`, digits, no leading zeros.
fn parse_velocity(s: &str) -> Option<Velocity> {
    let value: i32 = s.parse().ok()?;
    (Velocity::new(value).to_string() == s).then(|| Velocity::new(value))
}

/// Error returned when a wire string is not a known command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command: {:?}", self.0)
    }
}

impl std::error::Error for ParseCommandError {}
