//! Webcam frame sampling.
//!
//! Video is context for the interviewer, not a media stream: a low-rate
//! sampler grabs one frame at a time, downscales it, JPEG-encodes at reduced
//! quality and transmits it as a realtime media chunk once the configuration
//! handshake completes. The mute flag does not apply to video. There is no
//! frame queue; a slow capture simply lowers the rate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageBuffer, Rgb, RgbImage};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::error::{SessionError, SessionResult};
use crate::protocol::ClientMessage;
use crate::session::context::SessionContext;

/// Interval between sampled frames (2 Hz).
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum transmitted frame width in pixels; larger frames are downscaled
/// preserving aspect ratio.
pub const MAX_FRAME_WIDTH: u32 = 320;

/// JPEG quality for transmitted frames.
pub const JPEG_QUALITY: u8 = 60;

/// One raw captured frame, tightly packed RGB8.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Interleaved RGB bytes, `width * height * 3` long
    pub data: Vec<u8>,
}

/// A source of webcam frames.
#[async_trait]
pub trait VideoSource: Send {
    /// Capture the current frame, or `None` when no frame is available yet.
    async fn capture_frame(&mut self) -> Option<RgbFrame>;
}

/// Downscale and JPEG-encode a frame, returning the base64 payload.
///
/// Frames with unusable dimensions fail with [`SessionError::Decode`] and
/// are skipped by the sampler.
pub fn encode_frame(frame: &RgbFrame) -> SessionResult<String> {
    if frame.width == 0 || frame.height == 0 {
        return Err(SessionError::Decode("zero-dimension frame".to_string()));
    }

    let image: RgbImage =
        ImageBuffer::<Rgb<u8>, _>::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| {
                SessionError::Decode(format!(
                    "frame buffer too short for {}x{}",
                    frame.width, frame.height
                ))
            })?;

    let image = if frame.width > MAX_FRAME_WIDTH {
        let scaled_height =
            (frame.height as f64 * MAX_FRAME_WIDTH as f64 / frame.width as f64).round() as u32;
        image::imageops::resize(
            &image,
            MAX_FRAME_WIDTH,
            scaled_height.max(1),
            FilterType::Triangle,
        )
    } else {
        image
    };

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    image
        .write_with_encoder(encoder)
        .map_err(|e| SessionError::Decode(format!("jpeg encode: {e}")))?;

    Ok(BASE64_STANDARD.encode(&jpeg))
}

/// The running webcam sampling task for one session.
pub struct VideoSampler {
    handle: JoinHandle<()>,
}

impl VideoSampler {
    /// Spawn the 2 Hz sampling loop over the given source.
    ///
    /// One frame is in flight at a time; the next tick is not serviced until
    /// the previous frame is captured, encoded and handed to the transport.
    pub fn start(mut source: Box<dyn VideoSource>, ctx: Arc<SessionContext>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SAMPLE_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!("video sampler started");

            loop {
                interval.tick().await;
                if !ctx.is_current() {
                    break;
                }
                // Video waits for the configuration ack only; the mute flag
                // gates the audio path, not the webcam.
                if !ctx.is_setup_acked() {
                    continue;
                }

                let Some(frame) = source.capture_frame().await else {
                    continue;
                };
                match encode_frame(&frame) {
                    Ok(payload) => {
                        if ctx.send(ClientMessage::video_chunk(payload)).await.is_err() {
                            break;
                        }
                        trace!(width = frame.width, height = frame.height, "frame sent");
                    }
                    Err(e) => warn!(error = %e, "skipping unusable frame"),
                }
            }
            debug!("video sampler ended");
        });

        VideoSampler { handle }
    }

    /// Stop the sampling loop. Safe to call more than once.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for VideoSampler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
