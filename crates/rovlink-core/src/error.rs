//! Error types for rovlink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Connection, send, and receive failures
//! are all captured here.
//!
//! Benign state conflicts (connecting twice, disconnecting when nothing is
//! open) are not errors: they are reported through
//! [`ConnectOutcome`](crate::types::ConnectOutcome) and
//! [`DisconnectOutcome`](crate::types::DisconnectOutcome).

/// The error type for all rovlink operations.
///
/// None of these is fatal to the process. Connect failures are retried by
/// the session, and send or receive failures are logged and handed back to
/// the caller as values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (refused connection, unreachable host).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a connection or for reply data.
    #[error("timeout waiting for data")]
    Timeout,

    /// No session is open. Sends and receives fail with this while
    /// the session is disconnected or still connecting.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the socket or it was reset.
    #[error("connection lost")]
    ConnectionLost,

    /// A connect retry loop was cancelled by a disconnect request.
    #[error("connect cancelled")]
    Cancelled,

    /// The connect retry loop hit its configured attempt cap.
    #[error("gave up connecting after {0} attempts")]
    RetriesExhausted(u32),

    /// An invalid parameter was passed to a builder or handler.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means "nothing arrived in time" rather than a
    /// broken link. Heartbeat receives treat it as quiet, not as a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout)
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
