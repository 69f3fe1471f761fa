//! End-to-end tests of the relay router with fake audio adapters and a
//! tempdir spool.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use relay_server::{app, config::Config, AppState};
use relay_spool::SpoolWriter;
use relay_voice::{FakeSynthesizer, FakeTranscoder, Synthesizer, Transcoder};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const TOKEN: &str = "secret-token";
const OWNER: &str = "+15559876543";

struct TestRelay {
    app: Router,
    synth: Arc<FakeSynthesizer>,
    transcoder: Arc<FakeTranscoder>,
    spool_dir: TempDir,
    sounds_dir: TempDir,
}

fn test_config(spool: &Path, sounds: &Path) -> Config {
    let mut config = Config::default();
    config.auth.token = TOKEN.to_string();
    config.dialer.spool_dir = spool.to_string_lossy().into_owned();
    config.dialer.sounds_dir = sounds.to_string_lossy().into_owned();
    config.dialer.trunk = "TestTrunk".to_string();
    config.dialer.caller_number = "+15550000000".to_string();
    config.dialer.default_destination = Some(OWNER.to_string());
    config
}

fn build_relay(
    synth: Arc<FakeSynthesizer>,
    transcoder: Arc<FakeTranscoder>,
    mutate: impl FnOnce(&mut Config),
) -> TestRelay {
    let spool_dir = tempfile::tempdir().unwrap();
    let sounds_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(spool_dir.path(), sounds_dir.path());
    mutate(&mut config);

    let spool = SpoolWriter::new(spool_dir.path(), sounds_dir.path());
    let state = AppState::new(
        &config,
        synth.clone() as Arc<dyn Synthesizer>,
        transcoder.clone() as Arc<dyn Transcoder>,
        spool,
    );

    TestRelay {
        app: app(state),
        synth,
        transcoder,
        spool_dir,
        sounds_dir,
    }
}

fn relay() -> TestRelay {
    build_relay(FakeSynthesizer::new(), FakeTranscoder::new(), |_| {})
}

fn call_request(token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/call")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("X-Relay-Token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect()
}

#[tokio::test]
async fn health_needs_no_token() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn missing_token_does_no_work() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            None,
            json!({"to": "+15551234567", "message": "Database backup failed on node 3"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "unauthorized");
    // Generic body, no hint at what lives behind the endpoint.
    assert_eq!(json["reason"], "unauthorized");

    assert_eq!(relay.synth.call_count(), 0);
    assert_eq!(relay.transcoder.call_count(), 0);
    assert!(entries(relay.spool_dir.path()).is_empty());
    assert!(entries(relay.sounds_dir.path()).is_empty());
}

#[tokio::test]
async fn wrong_token_does_no_work() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            Some("wrong-token"),
            json!({"message": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(relay.synth.call_count(), 0);
    assert_eq!(relay.transcoder.call_count(), 0);
    assert!(entries(relay.spool_dir.path()).is_empty());
}

#[tokio::test]
async fn accepted_call_spools_descriptor_and_audio() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15551234567", "message": "Database backup failed on node 3"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "accepted");
    assert_eq!(json["to"], "+15551234567");

    let job_id = json["jobId"].as_str().unwrap();
    let sound = json["sound"].as_str().unwrap();
    assert_eq!(sound, format!("alert-{}", job_id));

    // Both artifacts exist and reference each other.
    let descriptor_path = relay.spool_dir.path().join(format!("alert-{}.call", job_id));
    let audio_path = relay.sounds_dir.path().join(format!("{}.wav", sound));
    let descriptor = std::fs::read_to_string(&descriptor_path).unwrap();
    assert_eq!(
        descriptor,
        format!(
            "Channel: PJSIP/+15551234567@TestTrunk\n\
             Application: Playback\n\
             Data: custom/{sound}\n\
             MaxRetries: 2\n\
             RetryTime: 30\n\
             WaitTime: 45\n\
             CallerID: Alert Relay <+15550000000>\n"
        )
    );

    // The audio is the fake pipeline's output: transcode(synthesize(msg)).
    let audio = std::fs::read(&audio_path).unwrap();
    assert_eq!(audio, b"PCM8000:RAW:Database backup failed on node 3");

    assert_eq!(relay.synth.call_count(), 1);
    assert_eq!(relay.transcoder.call_count(), 1);
}

#[tokio::test]
async fn omitted_destination_uses_configured_owner() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(Some(TOKEN), json!({"message": "Disk full"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["to"], OWNER);

    let job_id = json["jobId"].as_str().unwrap();
    let descriptor = std::fs::read_to_string(
        relay.spool_dir.path().join(format!("alert-{}.call", job_id)),
    )
    .unwrap();
    assert!(descriptor.starts_with(&format!("Channel: PJSIP/{}@TestTrunk\n", OWNER)));
}

#[tokio::test]
async fn no_destination_anywhere_is_rejected() {
    let relay = build_relay(FakeSynthesizer::new(), FakeTranscoder::new(), |config| {
        config.dialer.default_destination = None;
    });
    let response = relay
        .app
        .oneshot(call_request(Some(TOKEN), json!({"message": "Disk full"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "no_destination");
    assert_eq!(relay.synth.call_count(), 0);
}

#[tokio::test]
async fn empty_message_is_rejected_with_zero_files() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15551234567", "message": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_message");

    assert_eq!(relay.synth.call_count(), 0);
    assert!(entries(relay.spool_dir.path()).is_empty());
    assert!(entries(relay.sounds_dir.path()).is_empty());
}

#[tokio::test]
async fn overlong_message_is_rejected() {
    let relay = build_relay(FakeSynthesizer::new(), FakeTranscoder::new(), |config| {
        config.call.max_message_chars = 10;
    });
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15551234567", "message": "a message well over ten characters"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_message");
    assert_eq!(relay.synth.call_count(), 0);
}

#[tokio::test]
async fn malformed_destination_is_rejected_before_synthesis() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({"to": "12345", "message": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_destination");

    assert_eq!(relay.synth.call_count(), 0);
    assert!(entries(relay.spool_dir.path()).is_empty());
}

#[tokio::test]
async fn synthesis_failure_leaves_no_artifacts() {
    let relay = build_relay(FakeSynthesizer::failing(), FakeTranscoder::new(), |_| {});
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15551234567", "message": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "synthesis_failed");

    assert_eq!(relay.synth.call_count(), 1);
    assert_eq!(relay.transcoder.call_count(), 0);
    assert!(entries(relay.spool_dir.path()).is_empty());
    assert!(entries(relay.sounds_dir.path()).is_empty());
}

#[tokio::test]
async fn transcode_failure_leaves_no_artifacts() {
    let relay = build_relay(FakeSynthesizer::new(), FakeTranscoder::failing(), |_| {});
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15551234567", "message": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "transcode_failed");

    assert_eq!(relay.synth.call_count(), 1);
    assert_eq!(relay.transcoder.call_count(), 1);
    assert!(entries(relay.spool_dir.path()).is_empty());
    assert!(entries(relay.sounds_dir.path()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn spool_deadline_leaves_no_artifacts() {
    // A zero spool deadline drops the write future at its first await,
    // past the writer's own failure cleanup; the handler must reclaim
    // whatever the abandoned write left, staged descriptor included.
    let relay = build_relay(FakeSynthesizer::new(), FakeTranscoder::new(), |config| {
        config.call.spool_timeout_secs = 0;
    });
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15551234567", "message": "hello"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = body_json(response).await;
    assert_eq!(json["error"], "timeout");

    assert!(entries(relay.spool_dir.path()).is_empty());
    assert!(entries(relay.sounds_dir.path()).is_empty());
}

#[tokio::test]
async fn concurrent_calls_get_distinct_jobs() {
    let relay = relay();
    let app_a = relay.app.clone();
    let app_b = relay.app.clone();

    let (ra, rb) = tokio::join!(
        app_a.oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15551111111", "message": "incident one"}),
        )),
        app_b.oneshot(call_request(
            Some(TOKEN),
            json!({"to": "+15552222222", "message": "incident two"}),
        ))
    );

    let ja = body_json(ra.unwrap()).await;
    let jb = body_json(rb.unwrap()).await;
    assert_ne!(ja["jobId"], jb["jobId"]);

    // Two descriptors, two audio files, no cross-overwrite.
    assert_eq!(entries(relay.spool_dir.path()).len(), 2);
    assert_eq!(entries(relay.sounds_dir.path()).len(), 2);

    let audio_a = std::fs::read(
        relay
            .sounds_dir
            .path()
            .join(format!("alert-{}.wav", ja["jobId"].as_str().unwrap())),
    )
    .unwrap();
    assert_eq!(audio_a, b"PCM8000:RAW:incident one");
}

#[tokio::test]
async fn retry_override_lands_in_descriptor() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({
                "to": "+15551234567",
                "message": "hello",
                "retry": {"max_retries": 5, "retry_delay_secs": 60, "wait_secs": 20}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let job_id = json["jobId"].as_str().unwrap();

    let descriptor = std::fs::read_to_string(
        relay.spool_dir.path().join(format!("alert-{}.call", job_id)),
    )
    .unwrap();
    assert!(descriptor.contains("MaxRetries: 5\n"));
    assert!(descriptor.contains("RetryTime: 60\n"));
    assert!(descriptor.contains("WaitTime: 20\n"));
}

#[tokio::test]
async fn out_of_bounds_retry_override_is_rejected() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({
                "to": "+15551234567",
                "message": "hello",
                "retry": {"max_retries": 100}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_retry");
    assert_eq!(relay.synth.call_count(), 0);
}

#[tokio::test]
async fn caller_label_overrides_display_name() {
    let relay = relay();
    let response = relay
        .app
        .oneshot(call_request(
            Some(TOKEN),
            json!({
                "to": "+15551234567",
                "message": "hello",
                "callerLabel": "Backup Monitor"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    let job_id = json["jobId"].as_str().unwrap();

    let descriptor = std::fs::read_to_string(
        relay.spool_dir.path().join(format!("alert-{}.call", job_id)),
    )
    .unwrap();
    assert!(descriptor.contains("CallerID: Backup Monitor <+15550000000>\n"));
}
