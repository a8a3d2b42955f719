//! Transport and connector traits for rover communication.
//!
//! The [`Transport`] trait abstracts over the socket to a rover. The session
//! layer in the `rovlink` crate operates on a `Transport` rather than on a
//! `TcpStream` directly, enabling both real network control and
//! deterministic unit testing with `MockTransport` from the
//! `rovlink-test-harness` crate.
//!
//! A [`Connector`] produces transports. The session's connect-retry loop
//! calls it once per attempt, so tests can script "fail k times, then
//! succeed" without a real listener.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a rover.
///
/// The wire protocol has no framing, so a transport moves raw bytes only.
///
/// Methods take `&self`: the session shares one transport between the
/// operator's sends and the heartbeat's reads. Implementations must keep
/// the two directions independent, so a `receive` waiting out its timeout
/// never delays a `send`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the rover.
    ///
    /// Implementations should return once every byte has been written to
    /// the underlying socket.
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the rover into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Waits up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing is received within the deadline.
    async fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// A `receive` in progress returns early. After calling `close()`,
    /// subsequent `send()` and `receive()` calls should return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Dials a [`Transport`] for a `host:port` address.
///
/// One call is one connection attempt. Retrying is the caller's job.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Make a single connection attempt to `addr`.
    async fn connect(&self, addr: &str) -> Result<Box<dyn Transport>>;
}
