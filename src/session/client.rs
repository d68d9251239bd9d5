//! The live interview session client.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::audio::encode::decode_base64_pcm16;
use crate::audio::input::{AudioInputPipeline, AudioSource};
use crate::audio::output::{PlaybackScheduler, PlaybackSink};
use crate::auth::fetch_credential;
use crate::config::{InterviewOptions, OPENING_TURN_TEXT};
use crate::error::{SessionError, SessionResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::recording::WavRecorder;
use crate::session::context::SessionContext;
use crate::session::{EventHolder, SessionEvent, SessionEventCallback, SessionState};
use crate::transcript::{ReportEntry, Speaker, Transcript, Turn};
use crate::video::{VideoSampler, VideoSource};

/// Capacity of the outbound message channel.
const WS_CHANNEL_CAPACITY: usize = 256;

/// A live mock-interview session.
///
/// One `LiveSession` drives at most one live transport at a time. Calling
/// [`connect`](Self::connect) while a session is running tears the old one
/// down first; messages still in flight on the old transport are rejected by
/// the generation guard in [`SessionContext`].
pub struct LiveSession {
    options: InterviewOptions,
    http: reqwest::Client,
    sink: Arc<dyn PlaybackSink>,
    state: Arc<RwLock<SessionState>>,
    /// Session generation counter; bumped on every teardown
    epoch: Arc<AtomicU64>,
    events: EventHolder,
    ctx: Mutex<Option<Arc<SessionContext>>>,
    ws_task: Mutex<Option<JoinHandle<()>>>,
    audio_pipeline: Mutex<Option<AudioInputPipeline>>,
    video_sampler: Mutex<Option<VideoSampler>>,
    recorder: Mutex<Option<Arc<WavRecorder>>>,
    session_id: Mutex<Option<Uuid>>,
}

impl LiveSession {
    /// Create a session client for the given options and playback sink.
    pub fn new(options: InterviewOptions, sink: Arc<dyn PlaybackSink>) -> Self {
        LiveSession {
            options,
            http: reqwest::Client::new(),
            sink,
            state: Arc::new(RwLock::new(SessionState::Idle)),
            epoch: Arc::new(AtomicU64::new(0)),
            events: Arc::new(tokio::sync::Mutex::new(None)),
            ctx: Mutex::new(None),
            ws_task: Mutex::new(None),
            audio_pipeline: Mutex::new(None),
            video_sampler: Mutex::new(None),
            recorder: Mutex::new(None),
            session_id: Mutex::new(None),
        }
    }

    /// Register the event callback.
    ///
    /// Registered synchronously when possible so events arriving right after
    /// `connect()` are not missed.
    pub fn on_event(&self, callback: SessionEventCallback) {
        if let Ok(mut guard) = self.events.try_lock() {
            *guard = Some(callback);
        } else {
            let holder = self.events.clone();
            tokio::spawn(async move {
                *holder.lock().await = Some(callback);
            });
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Whether the session is live and streaming.
    pub fn is_connected(&self) -> bool {
        matches!(self.state(), SessionState::Live)
    }

    /// Whether the microphone is muted.
    pub fn is_muted(&self) -> bool {
        self.ctx
            .lock()
            .as_ref()
            .map(|ctx| ctx.is_muted())
            .unwrap_or(false)
    }

    /// Mute or unmute the microphone.
    ///
    /// Muting gates transmission only: capture, voice-activity detection and
    /// encoding keep running, so unmuting resumes instantly.
    pub fn mute(&self, muted: bool) {
        if let Some(ctx) = self.ctx.lock().as_ref() {
            ctx.set_muted(muted);
            debug!(muted, "microphone mute changed");
        }
    }

    /// Snapshot of the current transcript.
    pub fn transcript(&self) -> Vec<Turn> {
        self.ctx
            .lock()
            .as_ref()
            .map(|ctx| ctx.transcript.snapshot())
            .unwrap_or_default()
    }

    /// Write the recorded interviewer audio as a WAV file.
    ///
    /// Only available when the session was created with
    /// `record_output = true`; the recorder survives `disconnect()` so the
    /// artifact can be exported after the session ends.
    pub fn finalize_recording(&self, path: &Path) -> SessionResult<()> {
        let recorder = self
            .recorder
            .lock()
            .clone()
            .ok_or_else(|| SessionError::Internal("recording not enabled".to_string()))?;
        recorder.finalize(path)
    }

    /// Start a session: fetch a credential, open the transport, send the
    /// configuration and spawn the media pipelines.
    ///
    /// Any running session is torn down first. Failures before the session is
    /// established return the state machine to `Idle` with no partial state.
    /// The media pipelines start immediately but withhold transmission until
    /// the service acknowledges the configuration.
    pub async fn connect(
        &self,
        audio_source: Option<Box<dyn AudioSource>>,
        video_source: Option<Box<dyn VideoSource>>,
    ) -> SessionResult<()> {
        self.disconnect().await;

        let session_id = Uuid::new_v4();
        *self.session_id.lock() = Some(session_id);
        *self.state.write() = SessionState::Authenticating;
        info!(%session_id, role = %self.options.role, "starting interview session");

        let credential = match fetch_credential(&self.http, &self.options.token_endpoint).await {
            Ok(c) => c,
            Err(e) => return self.fail_connect(e).await,
        };

        let url = match credential.websocket_url(self.options.live_endpoint.as_deref()) {
            Ok(u) => u,
            Err(e) => return self.fail_connect(e).await,
        };

        let request = match http::Request::builder()
            .uri(url.as_str())
            .header("Sec-WebSocket-Key", generate_key())
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", url.host_str().unwrap_or_default())
            .body(())
        {
            Ok(r) => r,
            Err(e) => {
                return self
                    .fail_connect(SessionError::Transport(format!("bad request: {e}")))
                    .await;
            }
        };

        let ws_stream = match connect_async(request).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                return self
                    .fail_connect(SessionError::Transport(e.to_string()))
                    .await;
            }
        };
        info!(host = url.host_str().unwrap_or_default(), "transport open");

        // New session generation.
        let scheduler = Arc::new(PlaybackScheduler::new(self.sink.clone()));
        let recorder = if self.options.record_output {
            let recorder = Arc::new(WavRecorder::new());
            scheduler.set_recorder(Some(recorder.clone()));
            Some(recorder)
        } else {
            None
        };
        *self.recorder.lock() = recorder;

        let ctx = SessionContext::with_parts(
            scheduler,
            Arc::new(Transcript::new()),
            self.epoch.clone(),
            self.events.clone(),
        );
        *self.ctx.lock() = Some(ctx.clone());

        let (out_tx, mut out_rx) = mpsc::channel::<ClientMessage>(WS_CHANNEL_CAPACITY);
        ctx.attach_outbound(out_tx.clone()).await;

        // Exactly one setup message per session, queued before anything else
        // can reach the channel.
        if out_tx.send(ClientMessage::setup(&self.options)).await.is_err() {
            return self
                .fail_connect(SessionError::Transport("outbound channel closed".to_string()))
                .await;
        }
        *self.state.write() = SessionState::AwaitingSetupAck;

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let state = self.state.clone();
        let task_ctx = ctx.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(message) = out_rx.recv() => {
                        let json = match serde_json::to_string(&message) {
                            Ok(j) => j,
                            Err(e) => {
                                error!(error = %e, "failed to serialize outbound message");
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            error!(error = %e, "failed to send on transport");
                            break;
                        }
                    }

                    inbound = ws_stream.next() => {
                        if !task_ctx.is_current() {
                            break;
                        }
                        match inbound {
                            Some(Ok(Message::Text(text))) => {
                                match ServerMessage::parse(&text) {
                                    Ok(message) => {
                                        Self::dispatch(&task_ctx, &state, message).await;
                                    }
                                    Err(e) => {
                                        warn!(error = %e, "dropping malformed server message");
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    error!(error = %e, "failed to send pong");
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("transport closed by peer");
                                if task_ctx.is_current() {
                                    task_ctx.scheduler.flush();
                                    task_ctx.detach_outbound().await;
                                    *state.write() = SessionState::Idle;
                                    task_ctx.emit(SessionEvent::Closed).await;
                                }
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                error!(error = %e, "transport error");
                                if task_ctx.is_current() {
                                    let err = SessionError::Transport(e.to_string());
                                    task_ctx.scheduler.flush();
                                    task_ctx.detach_outbound().await;
                                    *state.write() = SessionState::Failed;
                                    task_ctx.emit(SessionEvent::Error(err)).await;
                                    task_ctx.emit(SessionEvent::Closed).await;
                                }
                                break;
                            }
                        }
                    }

                    else => break,
                }
            }
        });
        *self.ws_task.lock() = Some(handle);

        // Pipelines start now and self-gate until the handshake completes:
        // VAD must run from the first frame, transmission must not.
        if let Some(source) = audio_source {
            *self.audio_pipeline.lock() = Some(AudioInputPipeline::start(source, ctx.clone()));
        }
        if let Some(source) = video_source {
            *self.video_sampler.lock() = Some(VideoSampler::start(source, ctx.clone()));
        }

        Ok(())
    }

    /// Unwind a connect-time failure: no partial state, back to `Idle`.
    async fn fail_connect(&self, error: SessionError) -> SessionResult<()> {
        error!(error = %error, "session connect failed");
        *self.ctx.lock() = None;
        *self.state.write() = SessionState::Idle;
        if let Some(cb) = self.events.lock().await.as_ref() {
            cb(SessionEvent::Error(error.clone())).await;
        }
        Err(error)
    }

    /// End the session and return the sealed transcript as the report
    /// payload for the external analysis endpoint.
    ///
    /// Safe from any state; repeated calls are no-ops returning an empty
    /// payload. Closes the transport, stops the pipelines, flushes playback
    /// and clears all per-session state.
    pub async fn disconnect(&self) -> Vec<ReportEntry> {
        let Some(ctx) = self.ctx.lock().take() else {
            *self.state.write() = SessionState::Idle;
            return Vec::new();
        };
        *self.state.write() = SessionState::Closing;

        // Invalidate this generation; tasks still holding the old context
        // observe staleness and stop touching shared state.
        self.epoch.fetch_add(1, Ordering::SeqCst);

        if let Some(pipeline) = self.audio_pipeline.lock().take() {
            pipeline.stop();
        }
        if let Some(sampler) = self.video_sampler.lock().take() {
            sampler.stop();
        }
        if let Some(task) = self.ws_task.lock().take() {
            task.abort();
        }

        ctx.detach_outbound().await;
        ctx.scheduler.flush();
        ctx.transcript.seal_all();
        let report = ctx.transcript.to_report_payload();
        ctx.transcript.clear();

        *self.state.write() = SessionState::Idle;
        ctx.emit(SessionEvent::Closed).await;
        info!(turns = report.len(), "session closed");
        report
    }

    /// Handle one parsed inbound message.
    async fn dispatch(
        ctx: &Arc<SessionContext>,
        state: &Arc<RwLock<SessionState>>,
        message: ServerMessage,
    ) {
        if message.setup_complete.is_some() && !ctx.is_setup_acked() {
            ctx.set_setup_acked();
            *state.write() = SessionState::Live;
            debug!("setup acknowledged; session live");

            // The interviewer speaks first. One synthetic opening turn kicks
            // the conversation off without the candidate saying anything.
            if let Err(e) = ctx.send(ClientMessage::user_text_turn(OPENING_TURN_TEXT)).await {
                warn!(error = %e, "failed to send opening turn");
            }
            ctx.emit(SessionEvent::Connected).await;
        }

        let Some(content) = message.server_content else {
            return;
        };

        // The service acknowledged a barge-in: anything still scheduled from
        // the abandoned turn is flushed, and the flag raised by the capture
        // path clears so chunks of the fresh reply queue normally again.
        if content.interrupted == Some(true) {
            ctx.scheduler.flush();
            ctx.set_interrupted(false);
            ctx.emit(SessionEvent::Interrupted).await;
            debug!("interruption acknowledged by service");
        }

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                let Some(inline) = part.inline_data else {
                    continue;
                };
                if inline.data.is_empty() {
                    continue;
                }
                // Chunks from a turn the candidate already interrupted are
                // dropped, not queued.
                if ctx.is_interrupted() {
                    trace!("dropping audio chunk during interruption");
                    continue;
                }
                match decode_base64_pcm16(&inline.data) {
                    Ok(samples) => ctx.scheduler.enqueue(samples),
                    Err(e) => warn!(error = %e, "dropping undecodable audio chunk"),
                }
            }
        }

        let now = now_ms();
        let mut transcript_changed = false;

        if let Some(transcription) = content.output_transcription {
            if let Some(text) = transcription.text {
                ctx.transcript.push_fragment(Speaker::Interviewer, &text, now);
                transcript_changed = true;
            }
        }
        if let Some(transcription) = content.input_transcription {
            if let Some(text) = transcription.text {
                ctx.transcript.push_fragment(Speaker::User, &text, now);
                transcript_changed = true;
            }
        }

        if content.turn_complete == Some(true) {
            ctx.transcript.seal_last();
            ctx.set_interrupted(false);
            ctx.scheduler.clear_playing();
            transcript_changed = true;
            debug!("turn complete");
        }

        if transcript_changed {
            ctx.emit(SessionEvent::TurnUpdated).await;
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
