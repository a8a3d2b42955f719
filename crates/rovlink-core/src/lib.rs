//! rovlink-core: Core traits, types, and error definitions for rovlink.
//!
//! This crate defines the robot-agnostic abstractions shared by the
//! session, transport, and protocol crates. Operator front-ends depend on
//! these types without pulling in a concrete socket implementation.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to a rover
//! - [`Connector`] -- dials a [`Transport`] for a `host:port` address
//! - [`RoverEvent`] -- asynchronous state change notifications
//! - [`Velocity`], [`RobotId`] -- operator-selected drive parameters
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use rovlink_core::*`.
pub use error::{Error, Result};
pub use events::RoverEvent;
pub use transport::{Connector, Transport};
pub use types::*;
