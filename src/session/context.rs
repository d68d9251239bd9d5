//! Per-session shared state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::audio::output::PlaybackScheduler;
use crate::error::{SessionError, SessionResult};
use crate::protocol::ClientMessage;
use crate::session::{EventHolder, SessionEvent};
use crate::transcript::Transcript;

/// Mutable state shared between one session and its pipeline tasks.
///
/// A fresh context is created per `connect()`. The epoch guard ties the
/// context to the session generation that created it: teardown bumps the
/// generation counter, and tasks holding a stale context observe
/// `is_current() == false` and stop touching shared state. This is what makes
/// rapid disconnect/reconnect safe — messages from a dying transport can
/// never reach the new session's scheduler or transcript.
pub struct SessionContext {
    epoch: Arc<AtomicU64>,
    epoch_id: u64,
    setup_acked: AtomicBool,
    interrupted: AtomicBool,
    muted: AtomicBool,
    outbound: Mutex<Option<mpsc::Sender<ClientMessage>>>,
    /// Playback scheduler for interviewer audio
    pub scheduler: Arc<PlaybackScheduler>,
    /// Transcript reconciler for this session
    pub transcript: Arc<Transcript>,
    events: EventHolder,
}

impl SessionContext {
    /// Create a standalone context with its own generation counter.
    ///
    /// Used directly in tests; sessions go through [`Self::with_parts`].
    pub fn new(scheduler: Arc<PlaybackScheduler>) -> Arc<Self> {
        Self::with_parts(
            scheduler,
            Arc::new(Transcript::new()),
            Arc::new(AtomicU64::new(0)),
            Arc::new(Mutex::new(None)),
        )
    }

    /// Create a context bound to the current value of a generation counter.
    pub fn with_parts(
        scheduler: Arc<PlaybackScheduler>,
        transcript: Arc<Transcript>,
        epoch: Arc<AtomicU64>,
        events: EventHolder,
    ) -> Arc<Self> {
        let epoch_id = epoch.load(Ordering::SeqCst);
        Arc::new(SessionContext {
            epoch,
            epoch_id,
            setup_acked: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            outbound: Mutex::new(None),
            scheduler,
            transcript,
            events,
        })
    }

    /// Whether this context still belongs to the live session generation.
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.epoch_id
    }

    /// Attach the outbound message channel once the transport is open.
    pub async fn attach_outbound(&self, tx: mpsc::Sender<ClientMessage>) {
        *self.outbound.lock().await = Some(tx);
    }

    /// Detach the outbound channel on teardown.
    pub async fn detach_outbound(&self) {
        *self.outbound.lock().await = None;
    }

    /// Queue a message for transmission.
    pub async fn send(&self, message: ClientMessage) -> SessionResult<()> {
        let guard = self.outbound.lock().await;
        let tx = guard.as_ref().ok_or(SessionError::NotConnected)?;
        tx.send(message)
            .await
            .map_err(|_| SessionError::NotConnected)
    }

    /// Whether captured media may currently be transmitted.
    ///
    /// Media is encoded regardless; this gate only withholds transmission
    /// until the configuration handshake completes, and while muted.
    pub fn may_transmit(&self) -> bool {
        self.setup_acked.load(Ordering::SeqCst) && !self.muted.load(Ordering::SeqCst)
    }

    /// Mark the configuration handshake as acknowledged.
    pub fn set_setup_acked(&self) {
        self.setup_acked.store(true, Ordering::SeqCst);
    }

    /// Whether the configuration handshake completed.
    pub fn is_setup_acked(&self) -> bool {
        self.setup_acked.load(Ordering::SeqCst)
    }

    /// Set or clear the barge-in interruption flag.
    pub fn set_interrupted(&self, value: bool) {
        self.interrupted.store(value, Ordering::SeqCst);
    }

    /// Whether a barge-in interruption awaits acknowledgment from the
    /// service. While set, inbound audio chunks are dropped.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Set or clear the microphone mute.
    pub fn set_muted(&self, value: bool) {
        self.muted.store(value, Ordering::SeqCst);
    }

    /// Whether the microphone is muted.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Invoke the registered event callback, if any.
    pub async fn emit(&self, event: SessionEvent) {
        trace!(?event, "session event");
        if let Some(cb) = self.events.lock().await.as_ref() {
            cb(event).await;
        }
    }
}
