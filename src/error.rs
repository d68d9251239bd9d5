//! Error types for live interview sessions.

use thiserror::Error;

/// Errors that can occur during a live interview session.
///
/// `Auth` and `Transport` are fatal to the session and unwind through the
/// disconnect path. `MediaAccess`, `Parse` and `Decode` are locally contained:
/// the offending item is dropped and the session continues. No error is
/// retried automatically; fatal errors return control to the caller, which may
/// re-invoke `connect()`.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Credential fetch failed or returned no usable token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Duplex connection failed to open or closed unexpectedly
    #[error("Transport error: {0}")]
    Transport(String),

    /// Microphone or camera unavailable; session degrades without the modality
    #[error("Media access error: {0}")]
    MediaAccess(String),

    /// An inbound message was not valid structured data; dropped per message
    #[error("Malformed server message: {0}")]
    Parse(String),

    /// A base64 audio payload could not be decoded; that chunk is dropped
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Operation requires a live session
    #[error("Not connected")]
    NotConnected,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Auth(_) | SessionError::Transport(_))
    }
}
