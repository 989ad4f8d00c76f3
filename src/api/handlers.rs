// src/api/handlers.rs

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::{types::*, ApiState};
use crate::reports::{NormalizedReport, ReportUpdate};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Report '{id}' not found"),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// POST /reports/start — Find or create the report for (session, device).
///
/// Find-or-create keeps this path convergent with the WebSocket `start`
/// control message: both resolve to the same report for one session.
pub async fn start_report(
    State(state): State<ApiState>,
    Json(body): Json<StartReportRequest>,
) -> Result<Json<StartReportResponse>, ApiError> {
    if body.session_id.trim().is_empty() {
        return Err(bad_request("sessionId cannot be empty"));
    }

    let report = state
        .reports
        .find_by_session(&body.session_id, body.device)
        .unwrap_or_else(|| state.reports.create(&body.session_id, body.device));

    Ok(Json(StartReportResponse {
        report_id: report.report_id,
    }))
}

/// GET /reports — All reports, newest first, in normalized form.
pub async fn list_reports(State(state): State<ApiState>) -> Json<Vec<NormalizedReport>> {
    let reports = state
        .reports
        .all()
        .iter()
        .map(NormalizedReport::from)
        .collect();
    Json(reports)
}

/// GET /reports/:report_id — Normalized report view.
pub async fn get_report(
    State(state): State<ApiState>,
    Path(report_id): Path<String>,
) -> Result<Json<NormalizedReport>, ApiError> {
    let report = state.reports.get(&report_id).ok_or_else(|| not_found(&report_id))?;
    Ok(Json(NormalizedReport::from(&report)))
}

/// PUT /reports/:report_id/update — Merge into the named section(s).
pub async fn update_report(
    State(state): State<ApiState>,
    Path(report_id): Path<String>,
    Json(update): Json<ReportUpdate>,
) -> Result<Json<NormalizedReport>, ApiError> {
    let report = state
        .reports
        .merge_update(&report_id, update)
        .map_err(|_| not_found(&report_id))?;
    Ok(Json(NormalizedReport::from(&report)))
}

/// POST /diagnose/summarize — Plain-language failure summary.
pub async fn summarize(
    State(state): State<ApiState>,
    Json(body): Json<SummarizeRequest>,
) -> Json<SummarizeResponse> {
    let summary = state.gateway.summarize(body.device, &body.root_cause).await;
    Json(SummarizeResponse { summary })
}

/// POST /diagnose/visual — Multipart image upload, returns the AI damage
/// assessment.
pub async fn analyze_visual(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let upload = read_upload(multipart, &["deviceImage", "image"], "image/jpeg").await?;
    let analysis = state.gateway.analyze_image(&upload.data, &upload.mime_type).await;
    Ok(Json(AnalysisResponse { analysis }))
}

/// POST /diagnose/transcribe — Multipart audio upload, returns the
/// transcript.
pub async fn transcribe_audio(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let upload = read_upload(multipart, &["audio", "deviceAudio"], "audio/webm").await?;
    let transcript = state.gateway.transcribe(&upload.data, &upload.mime_type).await;
    Ok(Json(TranscriptResponse { transcript }))
}

/// POST /diagnose/chat — One support-chat turn.
pub async fn chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let reply = state.gateway.chat(&body.message, &body.history).await;
    Json(ChatResponse { reply })
}

/// GET /health — Simple health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

struct Upload {
    data: Vec<u8>,
    mime_type: String,
}

/// Pull the first matching file field out of a multipart body. Accepts any
/// field carrying a filename as a fallback so differently-named client
/// forms still work.
async fn read_upload(
    mut multipart: Multipart,
    field_names: &[&str],
    default_mime: &str,
) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if field_names.contains(&name.as_str()) || field.file_name().is_some() {
            let mime_type = field
                .content_type()
                .unwrap_or(default_mime)
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {e}")))?;
            if data.is_empty() {
                return Err(bad_request("uploaded file is empty"));
            }
            return Ok(Upload {
                data: data.to_vec(),
                mime_type,
            });
        }
    }
    Err(bad_request("missing file field"))
}
