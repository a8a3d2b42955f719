//! Transport implementations for rovlink.
//!
//! This crate provides the concrete [`Transport`](rovlink_core::Transport)
//! and [`Connector`](rovlink_core::Connector) used to reach a rover:
//!
//! - [`TcpTransport`]: one TCP stream to the rover's command port
//! - [`TcpConnector`]: dials a [`TcpTransport`] with a per-attempt timeout
//!
//! # Example
//!
//! ```no_run
//! use rovlink_transport::TcpTransport;
//! use rovlink_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> rovlink_core::Result<()> {
//! let transport = TcpTransport::connect("192.168.1.134:5005").await?;
//!
//! transport.send(b"F1").await?;
//!
//! let mut buf = [0u8; 255];
//! let n = transport.receive(&mut buf, Duration::from_millis(50)).await?;
//! # Ok(())
//! # }
//! ```

pub mod tcp;

pub use tcp::{TcpConnector, TcpTransport};
