//! Mock connector for connect-retry tests.
//!
//! [`MockConnector`] refuses the first `k` connection attempts and then
//! hands out [`MockTransport`]s that all share one [`MockHandle`], so a
//! test can assert on everything sent across reconnects.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rovlink_core::error::{Error, Result};
use rovlink_core::transport::{Connector, Transport};

use crate::mock_transport::{MockHandle, MockTransport};

/// A [`Connector`] that fails a fixed number of times before succeeding.
#[derive(Debug, Clone)]
pub struct MockConnector {
    failures: u32,
    attempts: Arc<AtomicU32>,
    handle: MockHandle,
}

impl MockConnector {
    /// A connector that succeeds on the first attempt.
    pub fn new() -> Self {
        Self::failing(0)
    }

    /// A connector whose first `failures` attempts are refused.
    pub fn failing(failures: u32) -> Self {
        MockConnector {
            failures,
            attempts: Arc::new(AtomicU32::new(0)),
            handle: MockHandle::default(),
        }
    }

    /// A connector that never succeeds.
    pub fn unreachable() -> Self {
        Self::failing(u32::MAX)
    }

    /// Total connection attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Handle shared by every transport this connector produces.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, addr: &str) -> Result<Box<dyn Transport>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(Error::Transport(format!("connection refused: {addr}")));
        }
        Ok(Box::new(MockTransport::with_handle(self.handle.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fails_then_succeeds() {
        let connector = MockConnector::failing(2);

        assert!(connector.connect("rover:5005").await.is_err());
        assert!(connector.connect("rover:5005").await.is_err());
        let transport = connector.connect("rover:5005").await.unwrap();

        assert!(transport.is_connected());
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test]
    async fn refusal_names_the_address() {
        let connector = MockConnector::unreachable();
        match connector.connect("10.0.0.7:5005").await {
            Err(Error::Transport(msg)) => assert!(msg.contains("10.0.0.7:5005")),
            _ => panic!("expected a refused connection"),
        }
    }

    #[tokio::test]
    async fn transports_share_one_handle() {
        let connector = MockConnector::new();
        let a = connector.connect("x:1").await.unwrap();
        a.send(b"F1").await.unwrap();
        a.close().await.unwrap();

        let b = connector.connect("x:1").await.unwrap();
        b.send(b"STOP").await.unwrap();

        assert_eq!(connector.handle().sent_commands(), vec!["F1", "STOP"]);
    }
}
