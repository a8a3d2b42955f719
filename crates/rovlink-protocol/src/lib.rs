//! Rover control wire protocol for rovlink.
//!
//! Commands are short ASCII strings written to the rover's TCP socket with
//! no terminator, length prefix, or framing. A directional command is a
//! one- or two-letter prefix followed by the velocity in decimal
//! (`"F1"`, `"RB-2"`); `"STOP"` and `"auto0"`/`"auto1"` carry no velocity.
//!
//! - [`command`] -- the [`Command`] type, its encoder, and a parser for
//!   validating raw operator input.
//!
//! # Example
//!
//! ```
//! use rovlink_core::{Direction, Velocity};
//! use rovlink_protocol::Command;
//!
//! let cmd = Command::drive(Direction::RightForward, Velocity::new(1));
//! assert_eq!(cmd.encode(), b"RF1");
//! assert_eq!(Command::heartbeat().encode(), b"auto1");
//! ```

pub mod command;

pub use command::{Command, ParseCommandError, STOP};
