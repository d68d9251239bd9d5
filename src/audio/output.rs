//! Gapless playback scheduling for interviewer audio.
//!
//! Inbound chunks arrive faster than realtime in bursts. The scheduler keeps a
//! running `next_start_time` on the sink's clock so consecutive chunks are
//! placed back to back with no gaps and no overlap, regardless of network
//! arrival jitter.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::trace;

use crate::audio::encode::{OUTPUT_SAMPLE_RATE, pcm16_to_f32};
use crate::recording::WavRecorder;

/// Lead applied when the schedule clock has fallen behind real time, so the
/// first chunk of a new burst is not scheduled in the past.
pub const SCHEDULE_LEAD_SECONDS: f64 = 0.05;

/// A handle to one scheduled chunk, cancellable until it finishes playing.
pub trait ScheduledHandle: Send {
    /// Stop this chunk if it has not finished playing.
    fn cancel(&self);
}

/// An audio output device abstraction.
///
/// `now()` and `schedule()` share one monotonic clock measured in seconds.
/// Implementations must tolerate `schedule` being called from any task.
pub trait PlaybackSink: Send + Sync {
    /// Current time on the output clock, in seconds.
    fn now(&self) -> f64;

    /// Schedule mono samples at `sample_rate` to start at `start_time`.
    fn schedule(&self, samples: Vec<f32>, sample_rate: u32, start_time: f64)
    -> Box<dyn ScheduledHandle>;
}

/// A sink that keeps a real clock but discards all audio.
///
/// Used for headless operation and anywhere playback hardware is absent.
pub struct NullSink {
    origin: Instant,
}

impl NullSink {
    /// Create a sink whose clock starts at zero.
    pub fn new() -> Self {
        NullSink {
            origin: Instant::now(),
        }
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

struct NullHandle;

impl ScheduledHandle for NullHandle {
    fn cancel(&self) {}
}

impl PlaybackSink for NullSink {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn schedule(
        &self,
        _samples: Vec<f32>,
        _sample_rate: u32,
        _start_time: f64,
    ) -> Box<dyn ScheduledHandle> {
        Box::new(NullHandle)
    }
}

struct SchedulerInner {
    queue: VecDeque<Vec<i16>>,
    next_start_time: f64,
    /// Handles for chunks scheduled but possibly still playing, paired with
    /// their end time so finished ones can be pruned.
    scheduled: Vec<(f64, Box<dyn ScheduledHandle>)>,
    recorder: Option<Arc<WavRecorder>>,
}

/// FIFO scheduler that places decoded PCM chunks gaplessly on a sink.
pub struct PlaybackScheduler {
    sink: Arc<dyn PlaybackSink>,
    inner: Mutex<SchedulerInner>,
    playing: AtomicBool,
}

impl PlaybackScheduler {
    /// Create a scheduler driving the given sink.
    pub fn new(sink: Arc<dyn PlaybackSink>) -> Self {
        PlaybackScheduler {
            sink,
            inner: Mutex::new(SchedulerInner {
                queue: VecDeque::new(),
                next_start_time: 0.0,
                scheduled: Vec::new(),
                recorder: None,
            }),
            playing: AtomicBool::new(false),
        }
    }

    /// Attach a recorder that receives every chunk handed to the sink.
    pub fn set_recorder(&self, recorder: Option<Arc<WavRecorder>>) {
        self.inner.lock().recorder = recorder;
    }

    /// Enqueue a decoded chunk and drain the queue onto the sink.
    ///
    /// Each chunk starts exactly where the previous one ends; when the
    /// schedule clock has fallen behind real time (queue under-run between
    /// bursts), it resets to now plus a small lead.
    pub fn enqueue(&self, chunk: Vec<i16>) {
        if chunk.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        inner.queue.push_back(chunk);
        self.drain(&mut inner);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn drain(&self, inner: &mut SchedulerInner) {
        let now = self.sink.now();
        inner.scheduled.retain(|(end, _)| *end > now);

        while let Some(chunk) = inner.queue.pop_front() {
            if inner.next_start_time < now {
                inner.next_start_time = now + SCHEDULE_LEAD_SECONDS;
            }
            let duration = chunk.len() as f64 / OUTPUT_SAMPLE_RATE as f64;
            let start = inner.next_start_time;

            if let Some(recorder) = &inner.recorder {
                recorder.append(&chunk);
            }

            let handle = self
                .sink
                .schedule(pcm16_to_f32(&chunk), OUTPUT_SAMPLE_RATE, start);
            trace!(start, duration, samples = chunk.len(), "scheduled chunk");
            inner.scheduled.push((start + duration, handle));
            inner.next_start_time = start + duration;
        }
    }

    /// Hard flush: cancel everything scheduled, drop everything queued, and
    /// reset the schedule clock. Used on barge-in and on disconnect.
    pub fn flush(&self) {
        let mut inner = self.inner.lock();
        for (_, handle) in inner.scheduled.drain(..) {
            handle.cancel();
        }
        inner.queue.clear();
        inner.next_start_time = 0.0;
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Clear the playing flag without flushing (turn completion).
    pub fn clear_playing(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Whether interviewer audio is currently playing or pending.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Number of chunks waiting to be scheduled (normally zero; chunks drain
    /// immediately on enqueue).
    pub fn queue_len(&self) -> usize {
        self.inner.lock().queue.len()
    }
}
