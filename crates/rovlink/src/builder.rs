//! RoverClientBuilder -- fluent builder for constructing [`RoverClient`] instances.
//!
//! Separates configuration from construction so that callers can set the
//! rover address, retry pacing, heartbeat period and receive limits before
//! the client exists. Building never touches the network; the client
//! starts disconnected.
//!
//! # Example
//!
//! ```no_run
//! use rovlink::RoverClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> rovlink::Result<()> {
//! let client = RoverClientBuilder::new()
//!     .host("10.0.0.7")
//!     .port(5005)
//!     .retry_interval(Duration::from_millis(250))
//!     .build()?;
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use rovlink_core::error::{Error, Result};
use rovlink_core::transport::Connector;
use rovlink_core::types::RobotId;
use rovlink_transport::tcp::DEFAULT_CONNECT_TIMEOUT;
use rovlink_transport::TcpConnector;

use crate::client::RoverClient;
use crate::session::{RetryPolicy, Session};

/// Rover control address used when none is configured.
pub const DEFAULT_HOST: &str = "192.168.1.134";

/// Rover control port used when none is configured.
pub const DEFAULT_PORT: u16 = 5005;

/// Address reserved for a future rover-to-client channel. Nothing binds it.
pub const RESERVED_INBOUND_ADDR: &str = "192.168.1.110:5006";

/// Largest reply read after a heartbeat.
pub const DEFAULT_RECEIVE_BUFFER: usize = 255;

/// How long a heartbeat waits for a reply before moving on.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(50);

/// Interval between autonomy heartbeats.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_millis(100);

/// Size of the robot roster.
pub const DEFAULT_ROBOT_COUNT: u8 = 3;

const EVENT_CAPACITY: usize = 256;

/// Fluent builder for [`RoverClient`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let client = RoverClientBuilder::new().build()?;
/// ```
pub struct RoverClientBuilder {
    host: String,
    port: u16,
    retry: RetryPolicy,
    connect_timeout: Duration,
    heartbeat_period: Duration,
    receive_buffer: usize,
    receive_timeout: Duration,
    robot_count: u8,
    initial_robot: RobotId,
    connector: Option<Arc<dyn Connector>>,
}

impl Default for RoverClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RoverClientBuilder {
    /// Create a builder with the default rover address and timings.
    pub fn new() -> Self {
        RoverClientBuilder {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            retry: RetryPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
            receive_buffer: DEFAULT_RECEIVE_BUFFER,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            robot_count: DEFAULT_ROBOT_COUNT,
            initial_robot: RobotId::FIRST,
            connector: None,
        }
    }

    /// Set the rover host name or IP address.
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the rover control port (default: 5005).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the pause between failed connection attempts (default: 500ms).
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry.interval = interval;
        self
    }

    /// Log a "still waiting" line every `n` failed attempts (default: 100).
    pub fn log_every(mut self, n: u32) -> Self {
        self.retry.log_every = n;
        self
    }

    /// Give up connecting after `n` attempts. Unbounded by default.
    pub fn max_connect_attempts(mut self, n: u32) -> Self {
        self.retry.max_attempts = Some(n);
        self
    }

    /// Set the timeout for a single TCP connection attempt (default: 5s).
    ///
    /// Ignored when a custom [`connector`](Self::connector) is supplied.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the autonomy heartbeat period (default: 100ms).
    pub fn heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = period;
        self
    }

    /// Set the largest reply read per heartbeat (default: 255 bytes).
    pub fn receive_buffer(mut self, bytes: usize) -> Self {
        self.receive_buffer = bytes;
        self
    }

    /// Set how long a heartbeat waits for a reply (default: 50ms).
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Set how many robots the operator can select (default: 3).
    pub fn robot_count(mut self, count: u8) -> Self {
        self.robot_count = count;
        self
    }

    /// Set the robot selected at startup (default: robot 1).
    pub fn initial_robot(mut self, robot: RobotId) -> Self {
        self.initial_robot = robot;
        self
    }

    /// Replace the TCP dialer.
    ///
    /// This is the entry point for testing: pass a `MockConnector` from
    /// `rovlink-test-harness` to run a client without a network.
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// The `host:port` the built client will dial.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build a disconnected [`RoverClient`].
    pub fn build(self) -> Result<RoverClient> {
        self.validate()?;

        let addr = self.addr();
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TcpConnector::new(self.connect_timeout)));
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let session = Session::new(
            addr,
            connector,
            self.retry,
            self.receive_timeout,
            event_tx.clone(),
        );

        Ok(RoverClient::new(
            session,
            event_tx,
            self.initial_robot,
            self.robot_count,
            self.heartbeat_period,
            self.receive_buffer,
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::InvalidParameter("host must not be empty".into()));
        }
        if self.retry.interval.is_zero() {
            return Err(Error::InvalidParameter(
                "retry_interval must be greater than zero".into(),
            ));
        }
        if self.retry.log_every == 0 {
            return Err(Error::InvalidParameter(
                "log_every must be greater than zero".into(),
            ));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(Error::InvalidParameter(
                "max_connect_attempts must be greater than zero".into(),
            ));
        }
        if self.heartbeat_period.is_zero() {
            return Err(Error::InvalidParameter(
                "heartbeat_period must be greater than zero".into(),
            ));
        }
        if self.receive_buffer == 0 {
            return Err(Error::InvalidParameter(
                "receive_buffer must be greater than zero".into(),
            ));
        }
        if self.robot_count == 0 {
            return Err(Error::InvalidParameter(
                "robot_count must be greater than zero".into(),
            ));
        }
        if self.initial_robot.number() > self.robot_count {
            return Err(Error::InvalidParameter(format!(
                "initial_robot {} is outside the roster (1..={})",
                self.initial_robot, self.robot_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rovlink_core::types::{SessionState, Velocity};
    use rovlink_test_harness::MockConnector;

    #[tokio::test]
    async fn builder_defaults() {
        let builder = RoverClientBuilder::new();
        assert_eq!(builder.addr(), "192.168.1.134:5005");

        let client = builder.connector(MockConnector::new()).build().unwrap();
        assert_eq!(client.robot(), RobotId::FIRST);
        assert_eq!(client.robot_count(), 3);
        assert_eq!(client.velocity(), Velocity::new(0));
        assert!(!client.is_autonomous());
        assert!(!client.heartbeat_active());
        assert_eq!(client.state().await, SessionState::Disconnected);
        assert_eq!(client.session().addr(), "192.168.1.134:5005");
        assert_eq!(client.session().retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn builder_overrides() {
        let client = RoverClientBuilder::new()
            .host("10.0.0.7")
            .port(6000)
            .retry_interval(Duration::from_millis(250))
            .log_every(10)
            .max_connect_attempts(4)
            .robot_count(5)
            .initial_robot(RobotId::new(4).unwrap())
            .connector(MockConnector::new())
            .build()
            .unwrap();

        assert_eq!(client.session().addr(), "10.0.0.7:6000");
        assert_eq!(
            client.session().retry_policy(),
            RetryPolicy {
                interval: Duration::from_millis(250),
                log_every: 10,
                max_attempts: Some(4),
            }
        );
        assert_eq!(client.robot().number(), 4);
        assert_eq!(client.robot_count(), 5);
    }

    #[test]
    fn build_does_not_dial() {
        let connector = MockConnector::new();
        let _client = RoverClientBuilder::new()
            .connector(connector.clone())
            .build()
            .unwrap();
        assert_eq!(connector.attempts(), 0);
    }

    #[test]
    fn rejects_invalid_settings() {
        let cases = [
            RoverClientBuilder::new().host(""),
            RoverClientBuilder::new().retry_interval(Duration::ZERO),
            RoverClientBuilder::new().log_every(0),
            RoverClientBuilder::new().max_connect_attempts(0),
            RoverClientBuilder::new().heartbeat_period(Duration::ZERO),
            RoverClientBuilder::new().receive_buffer(0),
            RoverClientBuilder::new().robot_count(0),
            RoverClientBuilder::new()
                .robot_count(2)
                .initial_robot(RobotId::new(3).unwrap()),
        ];

        for builder in cases {
            let result = builder.connector(MockConnector::new()).build();
            assert!(matches!(result, Err(Error::InvalidParameter(_))));
        }
    }

    #[test]
    fn reserved_inbound_address_is_distinct() {
        assert_ne!(
            RESERVED_INBOUND_ADDR,
            format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT)
        );
    }
}
