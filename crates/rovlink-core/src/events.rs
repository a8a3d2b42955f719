//! Asynchronous rover event types.
//!
//! Events are emitted by the client through a `tokio::sync::broadcast`
//! channel when session or operator state changes. Front-ends subscribe to
//! them to update status displays without polling.

use bytes::Bytes;

use crate::types::{RobotId, Velocity};

/// An event emitted by the rover client.
///
/// Subscribe via `RoverClient::subscribe()`. Events are delivered on a
/// best-effort basis through a bounded broadcast channel; slow consumers
/// may miss events while the heartbeat is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoverEvent {
    /// A connect request was accepted and the retry loop is starting.
    Connecting,

    /// A connection attempt failed and another will follow.
    ConnectRetry {
        /// The failed attempt number (1-based).
        attempt: u32,
    },

    /// The session is connected to the rover.
    Connected,

    /// The session was closed.
    Disconnected,

    /// A command was written to the socket.
    CommandSent {
        /// The wire form, e.g. `"RF1"`.
        command: String,
    },

    /// Autonomous mode was switched on or off.
    AutonomyChanged {
        /// `true` if autonomous mode is now on.
        on: bool,
    },

    /// The autonomy heartbeat task started.
    HeartbeatStarted,

    /// The autonomy heartbeat task stopped.
    HeartbeatStopped,

    /// Reply bytes read by the heartbeat. Opaque; never parsed.
    Reply {
        /// Raw payload as read from the socket.
        data: Bytes,
    },

    /// The operator selected a different robot.
    RobotSelected {
        /// The newly addressed robot.
        robot: RobotId,
    },

    /// The operator moved the velocity slider.
    VelocityChanged {
        /// The truncated velocity now in effect.
        velocity: Velocity,
    },
}
