//! Live session state machine and event surface.
//!
//! [`LiveSession`] owns the full lifecycle of one interview: credential
//! fetch, WebSocket handshake, configuration, media pipelines, inbound
//! dispatch and teardown. [`context::SessionContext`] carries the per-session
//! mutable state shared with the pipeline tasks.

pub mod context;

mod client;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use client::LiveSession;

use crate::error::SessionError;

/// Lifecycle state of a live session.
///
/// ```text
/// Idle -> Authenticating -> AwaitingSetupAck -> Live -> Closing -> Idle
/// ```
///
/// `Failed` is reachable from any non-idle state on an unexpected mid-session
/// error; connect-time failures return to `Idle` with no partial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session; `connect()` may be called
    #[default]
    Idle,
    /// Fetching the session credential
    Authenticating,
    /// Transport open, configuration sent, waiting for acknowledgment
    AwaitingSetupAck,
    /// Streaming in both directions
    Live,
    /// Teardown in progress
    Closing,
    /// An unexpected error ended the session; `connect()` may be called again
    Failed,
}

impl SessionState {
    /// Convert to the canonical identifier.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::AwaitingSetupAck => "awaiting_setup_ack",
            Self::Live => "live",
            Self::Closing => "closing",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notifications emitted over the registered event callback.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Configuration acknowledged; the session is live
    Connected,
    /// The transcript changed; pull a fresh snapshot
    TurnUpdated,
    /// The candidate barged in; interviewer audio was flushed
    Interrupted,
    /// A session error occurred (fatal errors are followed by `Closed`)
    Error(SessionError),
    /// The session ended, locally or remotely
    Closed,
}

/// Callback invoked for session events.
pub type SessionEventCallback =
    Arc<dyn Fn(SessionEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Shared slot holding the registered event callback.
pub type EventHolder = Arc<tokio::sync::Mutex<Option<SessionEventCallback>>>;
