//! Mock transport for deterministic testing of the session and dispatcher.
//!
//! [`MockTransport`] implements the [`Transport`] trait over shared state.
//! The session takes ownership of the boxed transport, so tests keep a
//! [`MockHandle`] to inspect what was sent and to script replies.
//!
//! # Example
//!
//! ```
//! use rovlink_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! let handle = mock.handle();
//! handle.queue_reply(b"ack");
//! // ... give `Box::new(mock)` to a session, drive it, then:
//! assert!(handle.sent_commands().is_empty());
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rovlink_core::error::{Error, Result};
use rovlink_core::transport::Transport;

#[derive(Debug, Default)]
struct MockState {
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport, one entry per `send()`.
    sent_log: Vec<Vec<u8>>,
    /// Replies handed out by `receive()`, oldest first.
    replies: VecDeque<Vec<u8>>,
    /// When set, every `send()` fails with `ConnectionLost`.
    fail_sends: bool,
    /// Number of `close()` calls.
    closes: u32,
}

/// Inspection and scripting handle for a [`MockTransport`].
///
/// Cheap to clone; all clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the log from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every `send()` payload so far, oldest first.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.lock().sent_log.clone()
    }

    /// Every `send()` payload decoded as UTF-8 (lossy), oldest first.
    pub fn sent_commands(&self) -> Vec<String> {
        self.lock()
            .sent_log
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    /// Number of sends equal to `command`.
    pub fn count_sent(&self, command: &str) -> usize {
        self.lock()
            .sent_log
            .iter()
            .filter(|b| b.as_slice() == command.as_bytes())
            .count()
    }

    /// Forget everything sent so far.
    pub fn clear_sent(&self) {
        self.lock().sent_log.clear();
    }

    /// Queue bytes for a later `receive()`.
    pub fn queue_reply(&self, reply: &[u8]) {
        self.lock().replies.push_back(reply.to_vec());
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Simulate the link going up or down.
    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Whether the transport is currently "connected".
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Number of times `close()` was called.
    pub fn close_count(&self) -> u32 {
        self.lock().closes
    }
}

/// A mock [`Transport`] for testing without a socket.
///
/// Sends are recorded. `receive()` pops the next queued reply, or waits out
/// its timeout and returns [`Error::Timeout`] when none is queued. After
/// `close()`, or after `set_connected(false)`, both return
/// [`Error::NotConnected`].
#[derive(Debug)]
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        Self::with_handle(MockHandle::default())
    }

    /// Create a connected transport sharing an existing handle's state.
    pub fn with_handle(handle: MockHandle) -> Self {
        handle.set_connected(true);
        MockTransport { handle }
    }

    /// A handle onto this transport's state.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        let mut state = self.handle.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.fail_sends {
            return Err(Error::ConnectionLost);
        }
        state.sent_log.push(data.to_vec());
        Ok(())
    }

    async fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        {
            let mut state = self.handle.lock();
            if !state.connected {
                return Err(Error::NotConnected);
            }

            if let Some(mut reply) = state.replies.pop_front() {
                let n = reply.len().min(buf.len());
                buf[..n].copy_from_slice(&reply[..n]);
                if n < reply.len() {
                    // Whatever did not fit stays queued for the next read.
                    state.replies.push_front(reply.split_off(n));
                }
                return Ok(n);
            }
        }

        // A quiet rover: the read sits out its whole timeout, as a socket would.
        tokio::time::sleep(timeout).await;
        if self.handle.is_connected() {
            Err(Error::Timeout)
        } else {
            Err(Error::NotConnected)
        }
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.handle.lock();
        state.connected = false;
        state.closes += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }
}
