//! Core types used throughout rovlink.
//!
//! These are the operator-facing values the client keeps between commands:
//! which robot is addressed, how fast it should drive, and where the
//! session is in its lifecycle.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Identifier of one rover in the fleet.
///
/// Robots are numbered from 1, matching the labels on the operator's
/// robot picker ("1", "2", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RobotId(u8);

impl RobotId {
    /// The first robot, selected by default.
    pub const FIRST: RobotId = RobotId(1);

    /// Create a `RobotId` from its 1-based number. Returns `None` for 0.
    pub fn new(number: u8) -> Option<Self> {
        (number > 0).then_some(RobotId(number))
    }

    /// The 1-based robot number.
    pub fn number(&self) -> u8 {
        self.0
    }
}

impl Default for RobotId {
    fn default() -> Self {
        RobotId::FIRST
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string cannot be parsed into a [`RobotId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRobotIdError(String);

impl fmt::Display for ParseRobotIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid robot id: {:?}", self.0)
    }
}

impl std::error::Error for ParseRobotIdError {}

impl FromStr for RobotId {
    type Err = ParseRobotIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(RobotId::new)
            .ok_or_else(|| ParseRobotIdError(s.to_string()))
    }
}

/// Drive velocity sent as the suffix of every directional command.
///
/// The operator's slider covers [`Velocity::MIN`]..=[`Velocity::MAX`], but
/// the value is never clamped: whatever integer part the slider reports is
/// sent verbatim. The integer is rendered with `Display`, so the wire form
/// is always canonical (`"-2"`, `"0"`, `"1"`; never `"+1"` or `"-0"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Velocity(i32);

impl Velocity {
    /// Lowest slider position.
    pub const MIN: i32 = -2;

    /// Highest slider position.
    pub const MAX: i32 = 2;

    /// Velocity from an integer, unchanged.
    pub fn new(value: i32) -> Self {
        Velocity(value)
    }

    /// Velocity from a raw slider value, truncated toward zero.
    ///
    /// `1.9` becomes `1`, `-0.5` becomes `0`. Non-finite input saturates the
    /// same way an `as` cast does (`NaN` becomes `0`).
    pub fn from_slider(raw: f64) -> Self {
        Velocity(raw.trunc() as i32)
    }

    /// The integer value.
    pub fn value(&self) -> i32 {
        self.0
    }

    /// The declared slider range, for input widgets.
    pub fn range() -> RangeInclusive<i32> {
        Self::MIN..=Self::MAX
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Drive direction for a movement command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    LeftForward,
    RightForward,
    LeftBackward,
    RightBackward,
}

impl Direction {
    /// Every direction, in the order they appear on the operator pad.
    pub const ALL: [Direction; 8] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::LeftForward,
        Direction::RightForward,
        Direction::LeftBackward,
        Direction::RightBackward,
    ];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::LeftForward => "left-forward",
            Direction::RightForward => "right-forward",
            Direction::LeftBackward => "left-backward",
            Direction::RightBackward => "right-backward",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`Direction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDirectionError(String);

impl fmt::Display for ParseDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown direction: {}", self.0)
    }
}

impl std::error::Error for ParseDirectionError {}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "f" | "forward" => Ok(Direction::Forward),
            "b" | "backward" => Ok(Direction::Backward),
            "l" | "left" => Ok(Direction::Left),
            "r" | "right" => Ok(Direction::Right),
            "lf" | "left-forward" => Ok(Direction::LeftForward),
            "rf" | "right-forward" => Ok(Direction::RightForward),
            "lb" | "left-backward" => Ok(Direction::LeftBackward),
            "rb" | "right-backward" => Ok(Direction::RightBackward),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// Lifecycle state of the single session a client owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No socket is open.
    #[default]
    Disconnected,
    /// The connect retry loop is running.
    Connecting,
    /// A socket is open and commands are written to it.
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
        };
        write!(f, "{s}")
    }
}

/// Successful result of a connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new socket was opened after `attempts` tries.
    Connected {
        /// Number of attempts it took, including the successful one.
        attempts: u32,
    },
    /// A socket was already open; nothing was done.
    AlreadyConnected,
    /// Another connect request is still retrying; nothing was done.
    AlreadyConnecting,
}

/// Successful result of a disconnect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// An open socket (or a running connect loop) was shut down.
    Disconnected,
    /// Nothing was open. Benign.
    WasNotConnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_id_rejects_zero() {
        assert_eq!(RobotId::new(0), None);
        assert_eq!(RobotId::new(2).map(|r| r.number()), Some(2));
    }

    #[test]
    fn robot_id_parse() {
        assert_eq!("2".parse::<RobotId>().unwrap(), RobotId::new(2).unwrap());
        assert_eq!(" 1 ".parse::<RobotId>().unwrap(), RobotId::FIRST);
        assert!("0".parse::<RobotId>().is_err());
        assert!("two".parse::<RobotId>().is_err());
        assert!("".parse::<RobotId>().is_err());
    }

    #[test]
    fn robot_id_display() {
        assert_eq!(RobotId::new(4).unwrap().to_string(), "4");
    }

    #[test]
    fn velocity_truncates_toward_zero() {
        assert_eq!(Velocity::from_slider(1.9).value(), 1);
        assert_eq!(Velocity::from_slider(-1.9).value(), -1);
        assert_eq!(Velocity::from_slider(2.0).value(), 2);
    }

    #[test]
    fn velocity_has_no_sign_noise() {
        assert_eq!(Velocity::from_slider(-0.5).to_string(), "0");
        assert_eq!(Velocity::from_slider(-0.0).to_string(), "0");
        assert_eq!(Velocity::from_slider(0.99).to_string(), "0");
        assert_eq!(Velocity::from_slider(1.0).to_string(), "1");
        assert_eq!(Velocity::from_slider(-2.0).to_string(), "-2");
    }

    #[test]
    fn velocity_is_not_clamped() {
        assert_eq!(Velocity::from_slider(7.3).to_string(), "7");
        assert_eq!(Velocity::from_slider(-12.0).to_string(), "-12");
    }

    #[test]
    fn velocity_non_finite_saturates() {
        assert_eq!(Velocity::from_slider(f64::NAN).value(), 0);
        assert_eq!(Velocity::from_slider(f64::INFINITY).value(), i32::MAX);
    }

    #[test]
    fn velocity_range() {
        let r = Velocity::range();
        assert_eq!(*r.start(), -2);
        assert_eq!(*r.end(), 2);
        assert_eq!(Velocity::default().value(), 0);
    }

    #[test]
    fn direction_parse_short_and_long() {
        assert_eq!("rf".parse::<Direction>().unwrap(), Direction::RightForward);
        assert_eq!("LB".parse::<Direction>().unwrap(), Direction::LeftBackward);
        assert_eq!("forward".parse::<Direction>().unwrap(), Direction::Forward);
        assert!("up".parse::<Direction>().is_err());
    }

    #[test]
    fn direction_display_roundtrips_through_parse() {
        for d in Direction::ALL {
            assert_eq!(d.to_string().parse::<Direction>().unwrap(), d);
        }
    }

    #[test]
    fn session_state_defaults_to_disconnected() {
        assert_eq!(SessionState::default(), SessionState::Disconnected);
        assert_eq!(SessionState::Connecting.to_string(), "connecting");
    }
}
