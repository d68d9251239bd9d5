//! Real microphone capture through `cpal`, behind the `cpal-backend` feature.
//!
//! The cpal stream handle is not `Send`, so it lives on a dedicated thread
//! that parks until the source is dropped. Captured frames are downmixed to
//! mono, blocked into nominal 4096-sample chunks and handed to the async side
//! over a channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::audio::encode::CAPTURE_BLOCK_SIZE;
use crate::audio::input::AudioSource;
use crate::error::{SessionError, SessionResult};

/// Microphone-backed [`AudioSource`] using the default system input device.
pub struct CpalMicSource {
    sample_rate: u32,
    rx: mpsc::Receiver<Vec<f32>>,
    stop: Arc<AtomicBool>,
}

impl CpalMicSource {
    /// Open the default input device and start capturing.
    ///
    /// Fails with [`SessionError::MediaAccess`] when no device is available or
    /// the stream cannot be built; the session then continues without the
    /// microphone modality.
    pub fn open() -> SessionResult<Self> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<SessionResult<u32>>();
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || match build_capture_stream(frame_tx) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    while !stop_flag.load(Ordering::Relaxed) {
                        std::thread::sleep(Duration::from_millis(50));
                    }
                    drop(stream);
                    debug!("microphone capture stopped");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| SessionError::MediaAccess(format!("capture thread: {e}")))?;

        let sample_rate = ready_rx
            .recv()
            .map_err(|_| SessionError::MediaAccess("capture thread exited".to_string()))??;
        debug!(sample_rate, "microphone capture started");

        Ok(CpalMicSource {
            sample_rate,
            rx: frame_rx,
            stop,
        })
    }
}

#[async_trait]
impl AudioSource for CpalMicSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        self.rx.recv().await
    }
}

impl Drop for CpalMicSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn build_capture_stream(sender: mpsc::Sender<Vec<f32>>) -> SessionResult<(Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| SessionError::MediaAccess("no default input device".to_string()))?;

    let input_config = device
        .default_input_config()
        .map_err(|e| SessionError::MediaAccess(format!("input config: {e}")))?;

    let stream_config: StreamConfig = input_config.clone().into();
    let sample_format = input_config.sample_format();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels as usize;

    let err_fn = |err| warn!(error = %err, "input stream error");

    let stream = match sample_format {
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                blocker(channels, sender, |s: &f32| *s),
                err_fn,
                None,
            )
            .map_err(|e| SessionError::MediaAccess(format!("build stream: {e}")))?,
        SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                blocker(channels, sender, |s: &i16| *s as f32 / i16::MAX as f32),
                err_fn,
                None,
            )
            .map_err(|e| SessionError::MediaAccess(format!("build stream: {e}")))?,
        SampleFormat::U16 => device
            .build_input_stream(
                &stream_config,
                blocker(channels, sender, |s: &u16| (*s as f32 - 32768.0) / 32768.0),
                err_fn,
                None,
            )
            .map_err(|e| SessionError::MediaAccess(format!("build stream: {e}")))?,
        other => {
            return Err(SessionError::MediaAccess(format!(
                "unsupported input sample format {other:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| SessionError::MediaAccess(format!("start stream: {e}")))?;

    Ok((stream, sample_rate))
}

/// Build a device callback that downmixes interleaved frames to mono and
/// emits fixed-size blocks. Blocks are dropped, not queued, when the async
/// side falls behind; the device callback must never block.
fn blocker<T>(
    channels: usize,
    sender: mpsc::Sender<Vec<f32>>,
    convert: impl Fn(&T) -> f32 + Send + 'static,
) -> impl FnMut(&[T], &cpal::InputCallbackInfo) + Send + 'static {
    let mut pending: Vec<f32> = Vec::with_capacity(CAPTURE_BLOCK_SIZE * 2);
    move |data: &[T], _| {
        for frame in data.chunks(channels.max(1)) {
            let sum: f32 = frame.iter().map(&convert).sum();
            pending.push(sum / frame.len() as f32);
        }
        while pending.len() >= CAPTURE_BLOCK_SIZE {
            let block: Vec<f32> = pending.drain(..CAPTURE_BLOCK_SIZE).collect();
            if sender.try_send(block).is_err() {
                warn!("capture consumer behind; dropping audio block");
            }
        }
    }
}
