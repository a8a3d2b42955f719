//! Session -- the lifecycle of the one TCP connection a client owns.
//!
//! A [`Session`] moves between [`SessionState::Disconnected`],
//! [`SessionState::Connecting`] and [`SessionState::Connected`]. Connecting
//! runs a retry loop with a fixed backoff until the rover accepts the
//! connection; disconnecting closes the socket or cancels a running retry
//! loop.
//!
//! Sends and receives are best-effort. A failed write or read is returned
//! to the caller but never tears the session down: the link is advisory,
//! and the operator decides when to reconnect.
//!
//! `Session` is a cheap handle (`Clone`); the heartbeat task holds one
//! clone while the dispatcher holds another.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use rovlink_core::error::{Error, Result};
use rovlink_core::events::RoverEvent;
use rovlink_core::transport::{Connector, Transport};
use rovlink_core::types::{ConnectOutcome, DisconnectOutcome, SessionState};

/// How the connect loop paces and reports its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between a failed attempt and the next one.
    pub interval: Duration,
    /// Log a "still waiting" line every this many failed attempts.
    pub log_every: u32,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            interval: Duration::from_millis(500),
            log_every: 100,
            max_attempts: None,
        }
    }
}

/// Handle to the client's single rover session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    addr: String,
    connector: Arc<dyn Connector>,
    retry: RetryPolicy,
    receive_timeout: Duration,
    event_tx: broadcast::Sender<RoverEvent>,
    link: Mutex<Link>,
}

/// Mutable session state. `transport` is `Some` exactly when `state` is
/// `Connected`.
#[derive(Default)]
struct Link {
    state: SessionState,
    transport: Option<Arc<dyn Transport>>,
    connect_cancel: Option<CancellationToken>,
    /// Bumped by every accepted connect request, so a cancelled loop that
    /// finishes late cannot clobber a newer one.
    generation: u64,
}

impl Session {
    /// Create a disconnected session for `addr` (`host:port`).
    pub fn new(
        addr: impl Into<String>,
        connector: Arc<dyn Connector>,
        retry: RetryPolicy,
        receive_timeout: Duration,
        event_tx: broadcast::Sender<RoverEvent>,
    ) -> Self {
        Session {
            inner: Arc::new(SessionInner {
                addr: addr.into(),
                connector,
                retry,
                receive_timeout,
                event_tx,
                link: Mutex::new(Link::default()),
            }),
        }
    }

    /// The `host:port` this session dials.
    pub fn addr(&self) -> &str {
        &self.inner.addr
    }

    /// The retry policy used by [`connect`](Session::connect).
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.link.lock().await.state
    }

    /// Whether a socket is open.
    pub async fn is_connected(&self) -> bool {
        self.state().await == SessionState::Connected
    }

    /// Connect to the rover, retrying until it accepts.
    ///
    /// Returns [`ConnectOutcome::AlreadyConnected`] or
    /// [`ConnectOutcome::AlreadyConnecting`] without touching the network
    /// if a socket is open or another connect is still retrying. Fails only
    /// with [`Error::Cancelled`] (a disconnect arrived while retrying) or
    /// [`Error::RetriesExhausted`] (an attempt cap was configured).
    pub async fn connect(&self) -> Result<ConnectOutcome> {
        let (cancel, generation) = {
            let mut link = self.inner.link.lock().await;
            match link.state {
                SessionState::Connected => {
                    info!(addr = %self.inner.addr, "Already connected");
                    return Ok(ConnectOutcome::AlreadyConnected);
                }
                SessionState::Connecting => {
                    debug!(addr = %self.inner.addr, "Connect already in progress");
                    return Ok(ConnectOutcome::AlreadyConnecting);
                }
                SessionState::Disconnected => {}
            }
            let cancel = CancellationToken::new();
            link.state = SessionState::Connecting;
            link.connect_cancel = Some(cancel.clone());
            link.generation += 1;
            (cancel, link.generation)
        };

        info!(addr = %self.inner.addr, "Trying to connect to rover");
        self.emit(RoverEvent::Connecting);

        let dialed = self.dial_with_retry(&cancel).await;

        let mut link = self.inner.link.lock().await;
        let current = link.generation == generation && link.state == SessionState::Connecting;

        match dialed {
            Ok((transport, attempts)) if current => {
                link.state = SessionState::Connected;
                link.transport = Some(Arc::from(transport));
                link.connect_cancel = None;
                drop(link);

                info!(addr = %self.inner.addr, attempts, "Connected to rover");
                self.emit(RoverEvent::Connected);
                Ok(ConnectOutcome::Connected { attempts })
            }
            Ok((transport, _)) => {
                // A disconnect won the race; do not leak the socket.
                drop(link);
                let _ = transport.close().await;
                Err(Error::Cancelled)
            }
            Err(e) => {
                if current {
                    link.state = SessionState::Disconnected;
                    link.connect_cancel = None;
                }
                Err(e)
            }
        }
    }

    /// Run [`connect`](Session::connect) on a background task.
    ///
    /// The caller's control path returns immediately; the handle resolves
    /// once the rover accepts (or the loop is cancelled).
    pub fn spawn_connect(&self) -> JoinHandle<Result<ConnectOutcome>> {
        let session = self.clone();
        tokio::spawn(async move { session.connect().await })
    }

    async fn dial_with_retry(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(Box<dyn Transport>, u32)> {
        let retry = self.inner.retry;
        let log_every = retry.log_every.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            let dialed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                r = self.inner.connector.connect(&self.inner.addr) => r,
            };

            let err = match dialed {
                Ok(transport) => return Ok((transport, attempt)),
                Err(e) => e,
            };

            debug!(addr = %self.inner.addr, attempt, error = %err, "Connection attempt failed");

            if let Some(max) = retry.max_attempts {
                if attempt >= max {
                    warn!(addr = %self.inner.addr, attempts = attempt, "Giving up on rover");
                    return Err(Error::RetriesExhausted(attempt));
                }
            }

            if attempt % log_every == 0 {
                info!(addr = %self.inner.addr, attempts = attempt, "Still waiting for server to connect");
            }
            self.emit(RoverEvent::ConnectRetry { attempt });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(retry.interval) => {}
            }
        }
    }

    /// Close the socket, or cancel a connect that is still retrying.
    ///
    /// The session is `Disconnected` when this returns, whatever the
    /// outcome. Disconnecting an idle session is benign and reports
    /// [`DisconnectOutcome::WasNotConnected`].
    pub async fn disconnect(&self) -> Result<DisconnectOutcome> {
        info!(addr = %self.inner.addr, "Trying to disconnect from rover");

        let (previous, transport) = {
            let mut link = self.inner.link.lock().await;
            let previous = link.state;
            if let Some(cancel) = link.connect_cancel.take() {
                cancel.cancel();
            }
            link.state = SessionState::Disconnected;
            (previous, link.transport.take())
        };

        if previous == SessionState::Disconnected {
            info!(addr = %self.inner.addr, "Socket was not previously connected");
            return Ok(DisconnectOutcome::WasNotConnected);
        }

        let closed = match transport {
            Some(transport) => transport.close().await,
            None => Ok(()),
        };

        info!(addr = %self.inner.addr, "Socket disconnected");
        self.emit(RoverEvent::Disconnected);
        closed.map(|_| DisconnectOutcome::Disconnected)
    }

    /// Write `data` to the rover.
    ///
    /// Fails with [`Error::NotConnected`] unless the session is connected.
    /// Write errors are returned as-is; the session stays connected.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        self.transport().await?.send(data).await
    }

    /// Read at most `max_bytes` of whatever the rover has sent.
    ///
    /// Waits no longer than the configured receive timeout and reports
    /// silence as [`Error::Timeout`].
    pub async fn receive(&self, max_bytes: usize) -> Result<Bytes> {
        let transport = self.transport().await?;

        let mut buf = vec![0u8; max_bytes];
        let n = transport
            .receive(&mut buf, self.inner.receive_timeout)
            .await?;
        buf.truncate(n);
        trace!(bytes = n, "Received reply");
        Ok(Bytes::from(buf))
    }

    /// The open transport, if any. The link lock is released before any
    /// I/O, so a receive waiting out its timeout never holds up a send.
    async fn transport(&self) -> Result<Arc<dyn Transport>> {
        self.inner
            .link
            .lock()
            .await
            .transport
            .clone()
            .ok_or(Error::NotConnected)
    }

    fn emit(&self, event: RoverEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_tx.send(event);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("addr", &self.inner.addr)
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}
