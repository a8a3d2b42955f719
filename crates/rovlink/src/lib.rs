//! # rovlink -- remote control for a small rover fleet
//!
//! `rovlink` drives rovers over one TCP command session. An operator
//! front-end (buttons, a slider, a robot picker) calls into a
//! [`RoverClient`], which encodes each intent as a short ASCII command and
//! writes it straight to the rover.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rovlink::{Direction, RoverClientBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut client = RoverClientBuilder::new()
//!         .host("192.168.1.134")
//!         .port(5005)
//!         .build()?;
//!
//!     client.connect().await?;
//!     client.set_velocity(1.0);
//!     client.press(Direction::RightForward).await?; // sends "RF1"
//!     client.release().await?;                      // sends "STOP"
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                  | Purpose                                      |
//! |------------------------|----------------------------------------------|
//! | `rovlink-core`         | Traits ([`Transport`], [`Connector`]), types, errors |
//! | `rovlink-protocol`     | Command encoding and parsing                 |
//! | `rovlink-transport`    | TCP transport and connector                  |
//! | **`rovlink`**          | Session, heartbeat, client -- this crate     |
//!
//! ## Events
//!
//! [`RoverClient::subscribe`] returns a broadcast receiver of
//! [`RoverEvent`]s: connection progress, every command written, autonomy
//! changes, and any bytes the rover sent back in reply to a heartbeat.

pub mod builder;
pub mod client;
pub mod heartbeat;
pub mod image;
pub mod session;

#[cfg(test)]
mod test_log;

pub use rovlink_core::*;
pub use rovlink_protocol::command;
pub use rovlink_protocol::{Command, ParseCommandError, STOP};

pub use builder::{
    RoverClientBuilder, DEFAULT_HOST, DEFAULT_PORT, RESERVED_INBOUND_ADDR,
};
pub use client::RoverClient;
pub use heartbeat::Heartbeat;
pub use image::ImageStore;
pub use session::{RetryPolicy, Session};
