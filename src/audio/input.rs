//! Microphone capture pipeline.
//!
//! Frames flow source → VAD → encoder → transport. Voice-activity detection
//! always runs first so barge-in works even while transmission is gated
//! (setup not yet acknowledged) or muted.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::audio::encode::encode_base64_frame;
use crate::audio::vad::EnergyVad;
use crate::protocol::ClientMessage;
use crate::session::context::SessionContext;
use crate::session::SessionEvent;

/// A source of captured mono float frames.
///
/// Implementations deliver blocks of nominally 4096 samples in [-1, 1].
/// Returning `None` ends the capture stream.
#[async_trait]
pub trait AudioSource: Send {
    /// Native sample rate of the captured frames.
    fn sample_rate(&self) -> u32;

    /// Await the next captured frame.
    async fn next_frame(&mut self) -> Option<Vec<f32>>;
}

/// An [`AudioSource`] fed by the host through an mpsc channel.
///
/// Used when the host application owns the capture device (or in tests).
pub struct ChannelSource {
    sample_rate: u32,
    rx: mpsc::Receiver<Vec<f32>>,
}

impl ChannelSource {
    /// Create a channel-backed source at the given sample rate, returning the
    /// sender the host pushes frames into. Dropping the sender ends capture.
    pub fn new(sample_rate: u32) -> (mpsc::Sender<Vec<f32>>, Self) {
        let (tx, rx) = mpsc::channel(64);
        (tx, ChannelSource { sample_rate, rx })
    }
}

#[async_trait]
impl AudioSource for ChannelSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        self.rx.recv().await
    }
}

/// The running capture task for one session.
pub struct AudioInputPipeline {
    handle: JoinHandle<()>,
}

impl AudioInputPipeline {
    /// Spawn the capture loop over the given source.
    ///
    /// Per frame: run VAD; on speech while interviewer audio is playing,
    /// hard-flush playback and raise the interruption flag (barge-in); then
    /// encode and transmit, but only while the session gate is open.
    pub fn start(mut source: Box<dyn AudioSource>, ctx: Arc<SessionContext>) -> Self {
        let handle = tokio::spawn(async move {
            let vad = EnergyVad::default();
            let src_rate = source.sample_rate();
            debug!(src_rate, "audio input pipeline started");

            while let Some(frame) = source.next_frame().await {
                if !ctx.is_current() {
                    break;
                }

                if vad.is_speech(&frame) && ctx.scheduler.is_playing() {
                    ctx.scheduler.flush();
                    ctx.set_interrupted(true);
                    ctx.emit(SessionEvent::Interrupted).await;
                    debug!("barge-in: flushed interviewer audio");
                }

                let encoded = encode_base64_frame(&frame, src_rate);
                if ctx.may_transmit() {
                    if ctx.send(ClientMessage::audio_chunk(encoded)).await.is_err() {
                        break;
                    }
                    trace!(samples = frame.len(), "audio frame transmitted");
                }
            }
            debug!("audio input pipeline ended");
        });

        AudioInputPipeline { handle }
    }

    /// Stop the capture loop. Safe to call more than once.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for AudioInputPipeline {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
