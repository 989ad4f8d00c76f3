// src/api/types.rs

use serde::{Deserialize, Serialize};

use crate::core::frame::DeviceClass;
use crate::gateway::ChatTurn;

/// Request body for starting (or resuming) a report.
#[derive(Debug, Clone, Deserialize)]
pub struct StartReportRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub device: DeviceClass,
}

#[derive(Debug, Serialize)]
pub struct StartReportResponse {
    #[serde(rename = "reportId")]
    pub report_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeRequest {
    pub device: DeviceClass,
    pub root_cause: String,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
