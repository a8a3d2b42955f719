//! Mock rover server for end-to-end testing over TCP.
//!
//! [`MockTcpServer`] listens on a random localhost port, accepts a single
//! client, and records every byte the client writes until the client
//! closes the connection. It can optionally answer each read with a fixed
//! reply, which is what a rover's acknowledgement looks like to the
//! heartbeat.
//!
//! # Example
//!
//! ```
//! use rovlink_test_harness::MockTcpServer;
//!
//! # async fn example() -> rovlink_core::Result<()> {
//! let mut server = MockTcpServer::new().await?;
//! server.reply_with(b"ack");
//! let addr = server.addr().to_string();
//! server.start();
//! // ... connect a client to `addr`, send commands, disconnect ...
//! let received = server.wait().await.unwrap();
//! # Ok(())
//! # }
//! ```

use rovlink_core::error::{Error, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A stand-in rover listening on localhost.
pub struct MockTcpServer {
    /// The address the server is listening on (e.g., "127.0.0.1:54321").
    addr: String,
    /// The bound listener, moved into the server task by `start()`.
    listener: Option<TcpListener>,
    /// Bytes written back after every read, if any.
    reply: Option<Vec<u8>>,
    /// Handle to the server task once started.
    server_handle: Option<JoinHandle<std::result::Result<Vec<u8>, String>>>,
}

impl MockTcpServer {
    /// Bind a new mock server on a random localhost port.
    ///
    /// The port is bound immediately, so a client may connect before
    /// [`start`](MockTcpServer::start); the connection waits in the
    /// backlog until the server task accepts it.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock TCP server: {}", e)))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();

        Ok(Self {
            addr,
            listener: Some(listener),
            reply: None,
            server_handle: None,
        })
    }

    /// Answer every read from the client with `reply`.
    pub fn reply_with(&mut self, reply: &[u8]) {
        self.reply = Some(reply.to_vec());
    }

    /// Get the address the server is listening on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Spawn the server task: accept one client and record its bytes
    /// until it disconnects.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let reply = self.reply.clone();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener
                .accept()
                .await
                .map_err(|e| format!("failed to accept connection: {}", e))?;

            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = match stream.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => n,
                    // A reset after the client is done is still a finished session.
                    Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => break,
                    Err(e) => return Err(format!("read error: {}", e)),
                };
                received.extend_from_slice(&buf[..n]);

                if let Some(reply) = &reply {
                    if stream.write_all(reply).await.is_err() {
                        break;
                    }
                }
            }

            Ok(received)
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the client to disconnect and return everything it sent.
    pub async fn wait(self) -> std::result::Result<Vec<u8>, String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("server task panicked: {}", e))?,
            None => Err("server was never started".into()),
        }
    }
}
