//! Relay error taxonomy.
//!
//! No variant is fatal to the process: empty submissions are dropped silently,
//! auth failures are surfaced to the offending connection only, and store
//! failures abort the single event that triggered them while the connection
//! stays open.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// A submitted message carried no content at all.
    #[error("message has no content")]
    EmptyMessage,

    /// Chat requires an authenticated identity; history and search do not.
    #[error("Login required to send messages.")]
    AuthRequired,

    /// A connection id was opened twice without an intervening close.
    #[error("connection {0} is already open")]
    DuplicateConnection(String),

    /// An operation referenced a connection that was never opened or is
    /// already closed.
    #[error("connection {0} is not open")]
    UnknownConnection(String),

    /// Durable store failure. Not retried; the triggering event is abandoned.
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
