//! rovlink-test-harness: Test utilities and mock transports for rovlink.
//!
//! - [`MockTransport`] records every command the session writes and serves
//!   scripted replies, so dispatcher and heartbeat behavior can be asserted
//!   without a socket.
//! - [`MockConnector`] fails a configurable number of connection attempts
//!   before handing out a [`MockTransport`], for connect-retry tests.
//! - [`MockTcpServer`] is a real localhost listener standing in for a
//!   rover, for end-to-end tests over TCP.

pub mod mock_connector;
pub mod mock_tcp;
pub mod mock_transport;

pub use mock_connector::MockConnector;
pub use mock_tcp::MockTcpServer;
pub use mock_transport::{MockHandle, MockTransport};
