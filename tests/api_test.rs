// tests/api_test.rs — Integration test: HTTP surface with a mock gateway

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use devicepulse::api::{build_router, ApiState};
use devicepulse::core::frame::DeviceClass;
use devicepulse::gateway::{ChatTurn, DiagnosticGateway};
use devicepulse::infra::config::SimulationConfig;
use devicepulse::reports::store::{InMemoryReportStore, ReportStore};

/// Canned-response gateway: no network, echoes enough of its inputs to
/// verify the handlers forwarded them.
struct MockGateway;

#[async_trait::async_trait]
impl DiagnosticGateway for MockGateway {
    async fn summarize(&self, device: DeviceClass, root_cause: &str) -> String {
        format!("Your {device} shows signs of {root_cause}.")
    }
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> String {
        format!("analyzed {} bytes of {mime_type}", image.len())
    }
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> String {
        format!("transcribed {} bytes of {mime_type}", audio.len())
    }
    async fn chat(&self, message: &str, history: &[ChatTurn]) -> String {
        format!("reply to '{message}' after {} turns", history.len())
    }
}

fn test_state() -> (ApiState, Arc<InMemoryReportStore>) {
    let store = Arc::new(InMemoryReportStore::new());
    let state = ApiState {
        reports: store.clone(),
        gateway: Arc::new(MockGateway),
        simulation: SimulationConfig::default(),
    };
    (state, store)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_start_report_returns_report_id() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let resp = app
        .oneshot(json_request(
            "POST",
            "/reports/start",
            json!({"sessionId": "sess-1", "device": "smartphone"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let report_id = body["reportId"].as_str().unwrap();
    assert!(report_id.starts_with("smartphone-"));
}

#[tokio::test]
async fn test_start_report_is_convergent_per_session_and_device() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let first = json_body(
        app.clone()
            .oneshot(json_request(
                "POST",
                "/reports/start",
                json!({"sessionId": "sess-1", "device": "smartwatch"}),
            ))
            .await
            .unwrap(),
    )
    .await;
    let second = json_body(
        app.oneshot(json_request(
            "POST",
            "/reports/start",
            json!({"sessionId": "sess-1", "device": "smartwatch"}),
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(first["reportId"], second["reportId"]);
}

#[tokio::test]
async fn test_fresh_report_has_all_sections_null() {
    let (state, store) = test_state();
    let app = build_router(state);

    let report = store.create("sess-1", DeviceClass::Smartfridge);
    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/reports/{}", report.report_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["device"], "smartfridge");
    assert!(body["finalStatus"].is_null());
    assert!(body["rootCause"].is_null());
    assert!(body["summary"].is_null());
    assert!(body["evidence"]["logAnalysis"].is_null());
    assert!(body["evidence"]["visualAnalysis"].is_null());
    assert!(body["evidence"]["audioTranscript"].is_null());
}

#[tokio::test]
async fn test_get_unknown_report_is_404() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/reports/no-such-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_merges_sections_and_get_reflects_them() {
    let (state, store) = test_state();
    let app = build_router(state);

    let report = store.create("sess-1", DeviceClass::Smartphone);
    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/reports/{}/update", report.report_id),
            json!({
                "visualAnalysis": "Cracked screen, top-left corner",
                "audioTranscript": "It started after I dropped it"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(
        app.oneshot(
            Request::builder()
                .uri(format!("/reports/{}", report.report_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(
        body["evidence"]["visualAnalysis"],
        "Cracked screen, top-left corner"
    );
    assert_eq!(
        body["evidence"]["audioTranscript"],
        "It started after I dropped it"
    );
}

#[tokio::test]
async fn test_update_unknown_report_is_404_and_store_unchanged() {
    let (state, store) = test_state();
    let app = build_router(state);

    let resp = app
        .oneshot(json_request(
            "PUT",
            "/reports/no-such-id/update",
            json!({"audioTranscript": "hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(store.all().is_empty());
}

#[tokio::test]
async fn test_list_reports() {
    let (state, store) = test_state();
    let app = build_router(state);

    store.create("sess-1", DeviceClass::Smartphone);
    store.create("sess-2", DeviceClass::Smartwatch);

    let body = json_body(
        app.oneshot(Request::builder().uri("/reports").body(Body::empty()).unwrap())
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_summarize_forwards_to_gateway() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let body = json_body(
        app.oneshot(json_request(
            "POST",
            "/diagnose/summarize",
            json!({"device": "smartphone", "root_cause": "Battery Failure"}),
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(
        body["summary"],
        "Your smartphone shows signs of Battery Failure."
    );
}

#[tokio::test]
async fn test_chat_forwards_history() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let body = json_body(
        app.oneshot(json_request(
            "POST",
            "/diagnose/chat",
            json!({
                "message": "why is it hot?",
                "history": [
                    {"role": "user", "text": "hi"},
                    {"role": "assistant", "text": "hello"}
                ]
            }),
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(body["reply"], "reply to 'why is it hot?' after 2 turns");
}

fn multipart_request(uri: &str, field_name: &str, filename: &str, mime: &str, data: &[u8]) -> Request<Body> {
    let boundary = "devicepulse-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field_name}\"; \
             filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_visual_upload_returns_analysis() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let resp = app
        .oneshot(multipart_request(
            "/diagnose/visual",
            "deviceImage",
            "phone.jpg",
            "image/jpeg",
            b"fake-jpeg-bytes",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["analysis"], "analyzed 15 bytes of image/jpeg");
}

#[tokio::test]
async fn test_transcribe_upload_returns_transcript() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let resp = app
        .oneshot(multipart_request(
            "/diagnose/transcribe",
            "audio",
            "complaint.webm",
            "audio/webm",
            b"fake-audio",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["transcript"], "transcribed 10 bytes of audio/webm");
}

#[tokio::test]
async fn test_visual_upload_without_file_is_400() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let boundary = "devicepulse-test-boundary";
    let body = format!("--{boundary}--\r\n");
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/diagnose/visual")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health() {
    let (state, _store) = test_state();
    let app = build_router(state);

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
}
