//! TCP transport for rover communication.
//!
//! [`TcpTransport`] owns one `tokio` TCP stream split into its read and
//! write halves, each behind its own lock. The heartbeat can sit in a
//! `receive` for its whole timeout while operator commands keep going out
//! on the write half. [`TcpConnector`] is what the session's retry loop
//! calls to dial one.
//!
//! Commands are tiny (2-5 bytes) and latency-sensitive, so Nagle's algorithm
//! is disabled on every stream.

use async_trait::async_trait;
use rovlink_core::error::{Error, Result};
use rovlink_core::transport::{Connector, Transport};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Default per-attempt connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport to a rover.
#[derive(Debug)]
pub struct TcpTransport {
    reader: Mutex<Option<OwnedReadHalf>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Cancelled by `close()`; wakes a pending `receive`.
    closed: CancellationToken,
    addr: String,
}

impl TcpTransport {
    /// Dial `addr` (`host:port`) with the default timeout.
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Dial `addr`, giving up after `timeout`.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        debug!(addr, timeout_ms = timeout.as_millis(), "Dialing rover");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Err(_) => {
                debug!(addr, "Dial timed out");
                return Err(Error::Timeout);
            }
            Ok(Err(e)) => {
                debug!(addr, error = %e, "Dial failed");
                return Err(dial_error(e, addr));
            }
            Ok(Ok(stream)) => stream,
        };

        info!(addr, "Socket connected");
        Ok(Self::from_stream(stream, addr.to_string()))
    }

    /// Take over a stream that is already connected.
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(addr = %addr, error = %e, "Could not disable Nagle; commands may be delayed");
        }

        let (reader, writer) = stream.into_split();
        Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: CancellationToken::new(),
            addr,
        }
    }

    /// The `host:port` this transport talks to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(Error::NotConnected);
        }
        let mut writer = self.writer.lock().await;
        let half = writer.as_mut().ok_or(Error::NotConnected)?;

        trace!(
            addr = %self.addr,
            bytes = data.len(),
            data = %String::from_utf8_lossy(data),
            "Writing command"
        );
        half.write_all(data).await.map_err(link_error)?;
        half.flush().await.map_err(link_error)
    }

    async fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if self.closed.is_cancelled() {
            return Err(Error::NotConnected);
        }
        let mut reader = self.reader.lock().await;
        let half = reader.as_mut().ok_or(Error::NotConnected)?;

        let read = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(Error::NotConnected),
            read = tokio::time::timeout(timeout, half.read(buf)) => read,
        };

        match read {
            Err(_) => Err(Error::Timeout),
            Ok(Ok(0)) => {
                warn!(addr = %self.addr, "Rover closed the connection");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                trace!(addr = %self.addr, bytes = n, data = ?&buf[..n], "Read reply");
                Ok(n)
            }
            Ok(Err(e)) => Err(link_error(e)),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.cancel();

        // Writer first: the shutdown sends FIN. A pending receive has been
        // woken by the token, so the reader lock comes free promptly.
        if let Some(mut writer) = self.writer.lock().await.take() {
            debug!(addr = %self.addr, "Closing TCP connection");
            if let Err(e) = writer.shutdown().await {
                debug!(addr = %self.addr, error = %e, "Shutdown failed; dropping socket anyway");
            }
        }
        self.reader.lock().await.take();

        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }
}

/// Dials [`TcpTransport`]s for the session's connect loop.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    timeout: Duration,
}

impl TcpConnector {
    /// Connector with the given per-attempt timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: &str) -> Result<Box<dyn Transport>> {
        let transport = TcpTransport::connect_with_timeout(addr, self.timeout).await?;
        Ok(Box::new(transport))
    }
}

/// A refused dial is the normal "rover not up yet" case and gets its own
/// message; anything else passes through as I/O.
fn dial_error(e: std::io::Error, addr: &str) -> Error {
    if e.kind() == ErrorKind::ConnectionRefused {
        Error::Transport(format!("connection refused: {addr}"))
    } else {
        Error::Io(e)
    }
}

fn link_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected
        | ErrorKind::UnexpectedEof => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    /// A bound listener and a transport already connected to it.
    async fn pair() -> (TcpTransport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (transport, accepted) =
            tokio::join!(TcpTransport::connect(&addr), listener.accept());
        (transport.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn command_out_reply_in() {
        let (transport, mut rover) = pair().await;
        assert!(transport.is_connected());
        assert!(transport.addr().starts_with("127.0.0.1:"));

        transport.send(b"auto1").await.unwrap();
        let mut seen = [0u8; 5];
        rover.read_exact(&mut seen).await.unwrap();
        assert_eq!(&seen, b"auto1");

        rover.write_all(b"ok").await.unwrap();
        let mut buf = [0u8; 255];
        let n = transport
            .receive(&mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"ok");
    }

    #[tokio::test]
    async fn refused_dial_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        match TcpTransport::connect(&addr).await {
            Err(Error::Transport(msg)) => assert!(msg.contains("connection refused"), "{msg}"),
            other => panic!("expected Transport error, got: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn quiet_rover_times_out() {
        let (transport, _rover) = pair().await;

        let mut buf = [0u8; 255];
        let result = transport.receive(&mut buf, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn rover_hangup_is_connection_lost() {
        let (transport, rover) = pair().await;
        drop(rover);

        let mut buf = [0u8; 255];
        let result = transport.receive(&mut buf, Duration::from_secs(2)).await;
        assert!(
            matches!(result, Err(Error::ConnectionLost)),
            "expected ConnectionLost, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn send_is_not_held_up_by_pending_receive() {
        let (transport, mut rover) = pair().await;

        let mut buf = [0u8; 255];
        let (received, send_took) = tokio::join!(
            transport.receive(&mut buf, Duration::from_secs(2)),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let started = Instant::now();
                transport.send(b"F1").await.unwrap();
                let took = started.elapsed();

                // Answer only once the command is through.
                let mut seen = [0u8; 2];
                rover.read_exact(&mut seen).await.unwrap();
                rover.write_all(b"ack").await.unwrap();
                took
            }
        );

        assert!(send_took < Duration::from_millis(20), "send waited {send_took:?}");
        let n = received.unwrap();
        assert_eq!(&buf[..n], b"ack");
    }

    #[tokio::test]
    async fn close_wakes_pending_receive() {
        let (transport, _rover) = pair().await;

        let started = Instant::now();
        let mut buf = [0u8; 255];
        let (received, closed) = tokio::join!(
            transport.receive(&mut buf, Duration::from_secs(5)),
            async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                transport.close().await
            }
        );

        closed.unwrap();
        assert!(matches!(received, Err(Error::NotConnected)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn closed_transport_refuses_io() {
        let (transport, mut rover) = pair().await;
        transport.close().await.unwrap();

        assert!(matches!(transport.send(b"STOP").await, Err(Error::NotConnected)));
        let mut buf = [0u8; 8];
        assert!(matches!(
            transport.receive(&mut buf, Duration::ZERO).await,
            Err(Error::NotConnected)
        ));

        // Closing twice is a no-op.
        transport.close().await.unwrap();

        // The rover sees a clean end of stream.
        let mut rest = Vec::new();
        rover.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn connector_dials_transport() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let rover = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut seen = Vec::new();
            stream.read_to_end(&mut seen).await.unwrap();
            seen
        });

        let connector = TcpConnector::new(Duration::from_secs(1));
        let transport = connector.connect(&addr).await.unwrap();
        transport.send(b"F1").await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(rover.await.unwrap(), b"F1");
    }
}
