//! RoverClient -- turns operator intents into rover commands.
//!
//! The client owns the operator's state (selected robot, velocity,
//! autonomous mode) and the [`Session`]. Each handler encodes one
//! [`Command`] with the current state and writes it immediately: no
//! queueing, no coalescing, so the rover sees commands in the order the
//! operator produced them.
//!
//! Every handler returns a [`Result`] but none of them panics on a dead
//! link. A failed send is logged at `error` level and handed back; the
//! front-end may show it or ignore it, and the next button press is sent
//! as usual.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use rovlink_core::error::{Error, Result};
use rovlink_core::events::RoverEvent;
use rovlink_core::types::{
    ConnectOutcome, Direction, DisconnectOutcome, RobotId, SessionState, Velocity,
};
use rovlink_protocol::Command;

use crate::heartbeat::Heartbeat;
use crate::image::ImageStore;
use crate::session::Session;

/// A rover remote control bound to one session.
///
/// Constructed via [`RoverClientBuilder`](crate::builder::RoverClientBuilder).
#[derive(Debug)]
pub struct RoverClient {
    session: Session,
    event_tx: broadcast::Sender<RoverEvent>,
    robot: RobotId,
    robot_count: u8,
    velocity: Velocity,
    autonomous: bool,
    heartbeat: Option<Heartbeat>,
    heartbeat_period: Duration,
    receive_buffer: usize,
    images: ImageStore,
}

impl RoverClient {
    /// Create a client from its constituent parts.
    ///
    /// This is called by [`RoverClientBuilder`](crate::builder::RoverClientBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        session: Session,
        event_tx: broadcast::Sender<RoverEvent>,
        robot: RobotId,
        robot_count: u8,
        heartbeat_period: Duration,
        receive_buffer: usize,
    ) -> Self {
        RoverClient {
            session,
            event_tx,
            robot,
            robot_count,
            velocity: Velocity::default(),
            autonomous: false,
            heartbeat: None,
            heartbeat_period,
            receive_buffer,
            images: ImageStore::new(),
        }
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<RoverEvent> {
        self.event_tx.subscribe()
    }

    /// The underlying session handle.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.session.state().await
    }

    /// Currently addressed robot.
    pub fn robot(&self) -> RobotId {
        self.robot
    }

    /// Number of robots the operator can pick from.
    pub fn robot_count(&self) -> u8 {
        self.robot_count
    }

    /// Velocity applied to the next directional command.
    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    /// Whether autonomous mode is on.
    pub fn is_autonomous(&self) -> bool {
        self.autonomous
    }

    /// Whether the autonomy heartbeat task is running.
    pub fn heartbeat_active(&self) -> bool {
        self.heartbeat.as_ref().is_some_and(Heartbeat::is_running)
    }

    // ---------------------------------------------------------------
    // Connection
    // ---------------------------------------------------------------

    /// Connect, retrying until the rover accepts. See [`Session::connect`].
    pub async fn connect(&self) -> Result<ConnectOutcome> {
        self.session.connect().await
    }

    /// Connect on a background task so the caller never waits on the
    /// retry loop.
    pub fn spawn_connect(&self) -> JoinHandle<Result<ConnectOutcome>> {
        self.session.spawn_connect()
    }

    /// Stop the heartbeat, leave autonomous mode, and close the session.
    ///
    /// Safe to call at any time; disconnecting an idle client reports
    /// [`DisconnectOutcome::WasNotConnected`].
    pub async fn disconnect(&mut self) -> Result<DisconnectOutcome> {
        self.stop_heartbeat().await;
        if self.autonomous {
            self.autonomous = false;
            self.emit(RoverEvent::AutonomyChanged { on: false });
        }
        self.session.disconnect().await
    }

    // ---------------------------------------------------------------
    // Operator state
    // ---------------------------------------------------------------

    /// Slider moved: truncate to an integer and use it from now on.
    ///
    /// Out-of-range values are kept as given; the slider bounds them.
    pub fn set_velocity(&mut self, raw: f64) -> Velocity {
        self.velocity = Velocity::from_slider(raw);
        debug!(raw, velocity = %self.velocity, "Velocity changed");
        self.emit(RoverEvent::VelocityChanged {
            velocity: self.velocity,
        });
        self.velocity
    }

    /// Robot picked from the roster. No traffic is sent.
    pub fn select_robot(&mut self, robot: RobotId) -> Result<()> {
        if robot.number() > self.robot_count {
            return Err(Error::InvalidParameter(format!(
                "robot {} is not in the roster (1..={})",
                robot, self.robot_count
            )));
        }
        self.robot = robot;
        info!(robot = %robot, "Robot #{} has been selected", robot);
        self.emit(RoverEvent::RobotSelected { robot });
        Ok(())
    }

    // ---------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------

    /// Drive in `direction` at the current velocity.
    pub async fn drive(&self, direction: Direction) -> Result<()> {
        self.send_command(Command::drive(direction, self.velocity))
            .await
    }

    /// Halt the rover.
    pub async fn stop(&self) -> Result<()> {
        self.send_command(Command::Stop).await
    }

    /// A direction button went down.
    pub async fn press(&self, direction: Direction) -> Result<()> {
        self.drive(direction).await
    }

    /// A direction button came back up.
    pub async fn release(&self) -> Result<()> {
        self.stop().await
    }

    /// Flip autonomous mode and tell the rover.
    ///
    /// Turning it on sends `auto1` and starts the heartbeat; turning it off
    /// stops the heartbeat before `auto0` goes out, so `auto0` is the last
    /// autonomy command on the wire. The mode and heartbeat follow the
    /// toggle even when the send fails.
    pub async fn toggle_autonomy(&mut self) -> Result<()> {
        let on = !self.autonomous;
        self.autonomous = on;

        let sent = if on {
            let sent = self.send_command(Command::Autonomy { on }).await;
            self.start_heartbeat().await;
            sent
        } else {
            self.stop_heartbeat().await;
            self.send_command(Command::Autonomy { on }).await
        };

        info!(autonomous = on, "Autonomous mode: {}", u8::from(on));
        self.emit(RoverEvent::AutonomyChanged { on });
        sent
    }

    /// Encode and write one command.
    pub async fn send_command(&self, command: Command) -> Result<()> {
        let wire = command.to_string();
        match self.session.send(wire.as_bytes()).await {
            Ok(()) => {
                debug!(command = %wire, robot = %self.robot, "Command sent");
                self.emit(RoverEvent::CommandSent { command: wire });
                Ok(())
            }
            Err(e) => {
                error!(command = %wire, robot = %self.robot, error = %e, "Command failed");
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------
    // Images
    // ---------------------------------------------------------------

    /// Keep `frame` as the selected robot's latest image.
    pub fn store_image(&mut self, frame: Bytes) {
        let bytes = frame.len();
        if self.images.store(self.robot, frame).is_some() {
            debug!(robot = %self.robot, bytes, "Replaced previous frame");
        }
    }

    /// Latest image received for `robot`.
    pub fn latest_image(&self, robot: RobotId) -> Option<&Bytes> {
        self.images.latest(robot)
    }

    async fn start_heartbeat(&mut self) {
        // At most one beat task, ever.
        self.stop_heartbeat().await;
        self.heartbeat = Some(Heartbeat::spawn(
            self.session.clone(),
            self.heartbeat_period,
            self.receive_buffer,
            self.event_tx.clone(),
        ));
    }

    async fn stop_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop().await;
        }
    }

    fn emit(&self, event: RoverEvent) {
        let _ = self.event_tx.send(event);
    }
}
