//! End-to-end session tests against an in-process mock voice service.
//!
//! The credential endpoint is mocked with wiremock; the live service is a
//! local WebSocket accept loop that records everything the client sends and
//! lets each test inject scripted server messages.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::prelude::*;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use interview_live::audio::{ChannelSource, NullSink, PlaybackSink, ScheduledHandle};
use interview_live::{InterviewOptions, LiveSession, SessionError, SessionState, Speaker};

/// In-process stand-in for the live voice service.
///
/// Accepts any number of connections; inbound text frames are recorded as
/// `(connection index, json)` pairs, and each connection gets an injection
/// channel for server-to-client messages. With `auto_ack`, a `setup` message
/// is answered with `setupComplete` immediately.
struct MockVoiceService {
    uri: String,
    inbound: Arc<Mutex<Vec<(usize, Value)>>>,
    senders: Arc<Mutex<Vec<mpsc::UnboundedSender<String>>>>,
}

const CLOSE_SENTINEL: &str = "<close>";

impl MockVoiceService {
    async fn start(auto_ack: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let inbound: Arc<Mutex<Vec<(usize, Value)>>> = Arc::new(Mutex::new(Vec::new()));
        let senders: Arc<Mutex<Vec<mpsc::UnboundedSender<String>>>> =
            Arc::new(Mutex::new(Vec::new()));

        let inbound_accept = inbound.clone();
        let senders_accept = senders.clone();
        tokio::spawn(async move {
            let mut connection_index = 0usize;
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let ws = match accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(_) => continue,
                };
                let (tx, mut rx) = mpsc::unbounded_channel::<String>();
                senders_accept.lock().push(tx);
                let inbound = inbound_accept.clone();
                let index = connection_index;
                connection_index += 1;

                tokio::spawn(async move {
                    let (mut sink, mut stream) = ws.split();
                    loop {
                        tokio::select! {
                            Some(out) = rx.recv() => {
                                if out == CLOSE_SENTINEL {
                                    let _ = sink.send(Message::Close(None)).await;
                                    break;
                                }
                                if sink.send(Message::Text(out.into())).await.is_err() {
                                    break;
                                }
                            }
                            msg = stream.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    let value: Value =
                                        serde_json::from_str(text.as_str()).unwrap();
                                    let is_setup = value.get("setup").is_some();
                                    inbound.lock().push((index, value));
                                    if is_setup && auto_ack {
                                        let ack = r#"{"setupComplete": {}}"#;
                                        if sink.send(Message::Text(ack.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Ok(_)) => {}
                                Some(Err(_)) => break,
                            }
                        }
                    }
                });
            }
        });

        MockVoiceService {
            uri: format!("ws://{addr}"),
            inbound,
            senders,
        }
    }

    /// Inject a server-to-client message. Sends to a dead connection are
    /// ignored, which is exactly what the stale-transport tests rely on.
    fn send_to(&self, connection: usize, message: &str) {
        let _ = self.senders.lock()[connection].send(message.to_string());
    }

    fn close(&self, connection: usize) {
        let _ = self.senders.lock()[connection].send(CLOSE_SENTINEL.to_string());
    }

    fn received(&self) -> Vec<(usize, Value)> {
        self.inbound.lock().clone()
    }

    fn count_with_key(&self, key: &str) -> usize {
        self.received()
            .iter()
            .filter(|(_, v)| v.get(key).is_some())
            .count()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn mock_token_endpoint() -> MockServer {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": "test-key", "type": "apiKey"})),
        )
        .mount(&server)
        .await;
    server
}

fn options_for(token: &MockServer, service: &MockVoiceService) -> InterviewOptions {
    let mut options = InterviewOptions::new("Backend Engineer");
    options.token_endpoint = token.uri();
    options.live_endpoint = Some(service.uri.clone());
    options
}

async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {what}");
}

fn loud_frame() -> Vec<f32> {
    vec![0.5; 4096]
}

fn pcm_base64(samples: &[i16]) -> String {
    let mut bytes = Vec::new();
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    BASE64_STANDARD.encode(&bytes)
}

/// Sink recording every scheduled chunk for playback assertions.
struct CollectingSink {
    origin: Instant,
    scheduled: Mutex<Vec<(usize, f64)>>,
}

impl CollectingSink {
    fn new() -> Self {
        CollectingSink {
            origin: Instant::now(),
            scheduled: Mutex::new(Vec::new()),
        }
    }
}

struct NoopHandle;

impl ScheduledHandle for NoopHandle {
    fn cancel(&self) {}
}

impl PlaybackSink for CollectingSink {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn schedule(
        &self,
        samples: Vec<f32>,
        _sample_rate: u32,
        start_time: f64,
    ) -> Box<dyn ScheduledHandle> {
        self.scheduled.lock().push((samples.len(), start_time));
        Box::new(NoopHandle)
    }
}

#[tokio::test]
async fn test_no_transmission_before_setup_ack() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(false).await;
    let session = LiveSession::new(options_for(&token, &service), Arc::new(NullSink::new()));

    let (frames, source) = ChannelSource::new(16_000);
    session.connect(Some(Box::new(source)), None).await.unwrap();

    eventually("setup message", || service.count_with_key("setup") == 1).await;
    assert_eq!(session.state(), SessionState::AwaitingSetupAck);

    // Captured audio before the ack is encoded but never transmitted.
    for _ in 0..5 {
        frames.send(loud_frame()).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(service.count_with_key("realtime_input"), 0);

    // Ack arrives: the gate opens, the opening turn goes out, audio flows.
    service.send_to(0, r#"{"setupComplete": {}}"#);
    eventually("live state", || session.state() == SessionState::Live).await;
    eventually("opening turn", || {
        service.count_with_key("client_content") == 1
    })
    .await;

    frames.send(loud_frame()).await.unwrap();
    eventually("audio transmission", || {
        service.count_with_key("realtime_input") > 0
    })
    .await;

    // Still exactly one setup for the whole session.
    assert_eq!(service.count_with_key("setup"), 1);

    // The opening turn is a complete user text turn sent after setup.
    let received = service.received();
    let opening = received
        .iter()
        .find(|(_, v)| v.get("client_content").is_some())
        .unwrap();
    assert_eq!(opening.1["client_content"]["turn_complete"], true);
    assert_eq!(opening.1["client_content"]["turns"][0]["role"], "user");

    session.disconnect().await;
}

#[tokio::test]
async fn test_inbound_audio_and_transcript_flow() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;
    let sink = Arc::new(CollectingSink::new());
    let session = LiveSession::new(options_for(&token, &service), sink.clone());

    session.connect(None, None).await.unwrap();
    eventually("live state", || session.state() == SessionState::Live).await;

    let audio = pcm_base64(&[1000i16; 2400]);
    service.send_to(
        0,
        &json!({
            "serverContent": {
                "modelTurn": {"parts": [{"inlineData": {"mimeType": "audio/pcm", "data": audio}}]},
                "outputTranscription": {"text": "Tell me about"}
            }
        })
        .to_string(),
    );
    service.send_to(
        0,
        r#"{"serverContent": {"outputTranscription": {"text": "your last project."}, "turnComplete": true}}"#,
    );

    eventually("scheduled audio", || !sink.scheduled.lock().is_empty()).await;
    eventually("sealed turn", || {
        session
            .transcript()
            .first()
            .is_some_and(|t| t.is_complete)
    })
    .await;

    let turns = session.transcript();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].speaker, Speaker::Interviewer);
    assert_eq!(turns[0].text, "Tell me about your last project.");

    let report = session.disconnect().await;
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].role, "interviewer");
    assert_eq!(report[0].content, "Tell me about your last project.");
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_malformed_inbound_messages_are_dropped() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;
    let session = LiveSession::new(options_for(&token, &service), Arc::new(NullSink::new()));

    session.connect(None, None).await.unwrap();
    eventually("live state", || session.state() == SessionState::Live).await;

    service.send_to(0, "this is not json at all");
    service.send_to(0, r#"{"serverContent": {"modelTurn": {"parts": [{"inlineData": {"data": "!!!bad-base64"}}]}}}"#);
    service.send_to(
        0,
        r#"{"serverContent": {"inputTranscription": {"text": "still here"}}}"#,
    );

    eventually("transcript after garbage", || !session.transcript().is_empty()).await;
    assert_eq!(session.transcript()[0].text, "still here");
    assert_eq!(session.state(), SessionState::Live);

    session.disconnect().await;
}

#[tokio::test]
async fn test_mute_gates_audio_transmission() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;
    let session = LiveSession::new(options_for(&token, &service), Arc::new(NullSink::new()));

    let (frames, source) = ChannelSource::new(16_000);
    session.connect(Some(Box::new(source)), None).await.unwrap();
    eventually("live state", || session.state() == SessionState::Live).await;

    frames.send(loud_frame()).await.unwrap();
    eventually("audio flowing", || service.count_with_key("realtime_input") > 0).await;

    session.mute(true);
    assert!(session.is_muted());
    let before = service.count_with_key("realtime_input");
    for _ in 0..5 {
        frames.send(loud_frame()).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(service.count_with_key("realtime_input"), before);

    session.mute(false);
    frames.send(loud_frame()).await.unwrap();
    eventually("audio resumed", || {
        service.count_with_key("realtime_input") > before
    })
    .await;

    session.disconnect().await;
}

#[tokio::test]
async fn test_rapid_reconnect_keeps_single_live_transport() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;
    let session = LiveSession::new(options_for(&token, &service), Arc::new(NullSink::new()));

    session.connect(None, None).await.unwrap();
    eventually("first session live", || session.state() == SessionState::Live).await;

    // Reconnect tears the first session down before opening the second.
    session.connect(None, None).await.unwrap();
    eventually("second setup", || service.count_with_key("setup") == 2).await;
    eventually("second session live", || {
        session.state() == SessionState::Live
    })
    .await;

    // A message injected on the stale transport never reaches the new
    // session's transcript.
    service.send_to(
        0,
        r#"{"serverContent": {"outputTranscription": {"text": "stale message"}}}"#,
    );
    service.send_to(
        1,
        r#"{"serverContent": {"outputTranscription": {"text": "fresh message"}}}"#,
    );

    eventually("fresh transcript", || !session.transcript().is_empty()).await;
    let turns = session.transcript();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "fresh message");

    session.disconnect().await;
}

#[tokio::test]
async fn test_remote_close_returns_to_idle_without_reconnect() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;
    let session = LiveSession::new(options_for(&token, &service), Arc::new(NullSink::new()));

    session.connect(None, None).await.unwrap();
    eventually("live state", || session.state() == SessionState::Live).await;

    service.close(0);
    eventually("idle after remote close", || {
        session.state() == SessionState::Idle
    })
    .await;
    assert!(!session.is_connected());

    // No automatic reconnect: the service sees no new setup.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(service.count_with_key("setup"), 1);
}

#[tokio::test]
async fn test_auth_failure_leaves_idle_state() {
    let token = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "Service account credentials not configured",
            "token": null
        })))
        .mount(&token)
        .await;

    let service = MockVoiceService::start(true).await;
    let session = LiveSession::new(options_for(&token, &service), Arc::new(NullSink::new()));

    let result = session.connect(None, None).await;
    match result {
        Err(SessionError::Auth(msg)) => assert!(msg.contains("not configured")),
        other => panic!("expected Auth error, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(service.count_with_key("setup"), 0);
}

#[tokio::test]
async fn test_transport_failure_leaves_idle_state() {
    let token = mock_token_endpoint().await;
    let mut options = InterviewOptions::new("Backend Engineer");
    options.token_endpoint = token.uri();
    // Nothing listens here.
    options.live_endpoint = Some("ws://127.0.0.1:1/live".to_string());

    let session = LiveSession::new(options, Arc::new(NullSink::new()));
    let result = session.connect(None, None).await;
    assert!(matches!(result, Err(SessionError::Transport(_))));
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_setup_message_carries_interview_configuration() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;

    let mut options = options_for(&token, &service);
    options.role = "Site Reliability Engineer".to_string();
    options.resume_text = "Ran a 2000-node fleet.".to_string();

    let session = LiveSession::new(options, Arc::new(NullSink::new()));
    session.connect(None, None).await.unwrap();
    eventually("setup message", || service.count_with_key("setup") == 1).await;

    let received = service.received();
    let setup = &received
        .iter()
        .find(|(_, v)| v.get("setup").is_some())
        .unwrap()
        .1["setup"];
    assert_eq!(
        setup["generation_config"]["response_modalities"][0],
        "AUDIO"
    );
    assert_eq!(
        setup["generation_config"]["speech_config"]["voice_config"]["prebuilt_voice_config"]
            ["voice_name"],
        "Kore"
    );
    let prompt = setup["system_instruction"]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(prompt.contains("Site Reliability Engineer"));
    assert!(prompt.contains("2000-node fleet"));

    session.disconnect().await;
}

#[tokio::test]
async fn test_video_frames_sampled_while_live() {
    struct FakeCamera;

    #[async_trait::async_trait]
    impl interview_live::video::VideoSource for FakeCamera {
        async fn capture_frame(&mut self) -> Option<interview_live::video::RgbFrame> {
            Some(interview_live::video::RgbFrame {
                width: 640,
                height: 480,
                data: vec![90u8; 640 * 480 * 3],
            })
        }
    }

    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;
    let session = LiveSession::new(options_for(&token, &service), Arc::new(NullSink::new()));

    session
        .connect(None, Some(Box::new(FakeCamera)))
        .await
        .unwrap();
    eventually("live state", || session.state() == SessionState::Live).await;

    let jpeg_count = || {
        service
            .received()
            .iter()
            .filter(|(_, v)| {
                v["realtime_input"]["media_chunks"][0]["mime_type"] == "image/jpeg"
            })
            .count()
    };
    eventually("jpeg frame", || jpeg_count() > 0).await;

    // The mute flag gates the audio path only; webcam frames keep flowing.
    session.mute(true);
    let muted_at = jpeg_count();
    eventually("jpeg frames while muted", || jpeg_count() > muted_at).await;

    session.disconnect().await;
}

#[tokio::test]
async fn test_recording_captures_interviewer_audio() {
    let token = mock_token_endpoint().await;
    let service = MockVoiceService::start(true).await;

    let mut options = options_for(&token, &service);
    options.record_output = true;

    let session = LiveSession::new(options, Arc::new(NullSink::new()));
    session.connect(None, None).await.unwrap();
    eventually("live state", || session.state() == SessionState::Live).await;

    let audio = pcm_base64(&[500i16; 4800]);
    service.send_to(
        0,
        &json!({
            "serverContent": {
                "modelTurn": {"parts": [{"inlineData": {"data": audio}}]}
            }
        })
        .to_string(),
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("interview.wav");
    eventually("recorded audio", || {
        session.finalize_recording(&path).is_ok()
            && hound::WavReader::open(&path).map(|r| r.len()).unwrap_or(0) == 4800
    })
    .await;

    session.disconnect().await;

    // The recorder survives disconnect so the artifact can still be written.
    session.finalize_recording(&path).unwrap();
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 24_000);
    assert_eq!(reader.len(), 4800);
}
