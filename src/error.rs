//! Error types and result handling.
//!
//! All fallible operations in this crate return [`Result`], an alias over
//! [`PulseError`]. The taxonomy separates failures that are fatal to client
//! construction (`TransportUnavailable`), failures reported synchronously to
//! the caller (`ClientDestroyed`, `DuplicateId`, `UnknownRequest`,
//! `InvalidConfig`), and failures that travel through a request's own callback
//! channel (`Transport`, `Timeout`, `Cancelled`).
//!
//! Per-request failures are never thrown into the poll tick: the tick converts
//! them into terminal request states and hands them to `on_error`.

use std::io;
use thiserror::Error;

/// Errors produced by the client façade and the transport engine.
#[derive(Error, Debug)]
pub enum PulseError {
    /// The transport engine could not be loaded or initialized.
    ///
    /// Fatal to client construction; surfaced immediately by
    /// [`PulseClient::new`](crate::PulseClient::new).
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The client has been destroyed and accepts no further requests.
    #[error("client has been destroyed")]
    ClientDestroyed,

    /// A request id collided with a live entry in the store.
    ///
    /// Defensive: cannot occur under correct id generation.
    #[error("duplicate request id: {0}")]
    DuplicateId(String),

    /// A cancel or status query named an id the client does not know.
    #[error("unknown request id: {0}")]
    UnknownRequest(String),

    /// The request configuration failed validation.
    #[error("invalid request configuration: {0}")]
    InvalidConfig(String),

    /// The transport reported a failure for a request.
    ///
    /// Delivered through the request's `on_error` callback, never thrown
    /// into the poll tick.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded its configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The request was cancelled by the caller.
    #[error("request was cancelled")]
    Cancelled,

    /// I/O failure, e.g. reading a file body from disk.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PulseError {
    /// Whether this error describes a terminal request outcome that should be
    /// delivered through `on_error` rather than returned to a caller.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            PulseError::Transport(_) | PulseError::Timeout | PulseError::Cancelled
        )
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failure_classification() {
        assert!(PulseError::Timeout.is_request_failure());
        assert!(PulseError::Cancelled.is_request_failure());
        assert!(PulseError::Transport("boom".into()).is_request_failure());
        assert!(!PulseError::ClientDestroyed.is_request_failure());
        assert!(!PulseError::DuplicateId("x".into()).is_request_failure());
    }

    #[test]
    fn test_display_messages() {
        let err = PulseError::UnknownRequest("req-1".into());
        assert_eq!(err.to_string(), "unknown request id: req-1");
        assert_eq!(PulseError::Timeout.to_string(), "request timed out");
    }
}
