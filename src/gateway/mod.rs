// src/gateway/mod.rs — Diagnostic gateway boundary
//
// Stateless request/response calls against a hosted generative-AI provider.
// Every operation degrades to a static fallback string instead of erroring:
// the rest of the system never branches on whether an AI call succeeded.

pub mod gemini;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::frame::DeviceClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn of the support conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[async_trait]
pub trait DiagnosticGateway: Send + Sync {
    /// Plain-language failure summary for a device owner.
    async fn summarize(&self, device: DeviceClass, root_cause: &str) -> String;

    /// Damage assessment of an uploaded device photo.
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> String;

    /// Transcript of an uploaded audio complaint.
    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> String;

    /// One support-chat turn over the prior history.
    async fn chat(&self, message: &str, history: &[ChatTurn]) -> String;
}

/// Degraded responses returned when the provider is unreachable or keeps
/// failing. Always present, never an error.
pub mod fallback {
    pub const SUMMARY: &str = "The diagnostic summary service is temporarily unavailable. \
        Based on the recorded telemetry, please contact support for a detailed assessment.";
    pub const ANALYSIS: &str = "The visual analysis service is temporarily unavailable. \
        Please try uploading the photo again in a few minutes.";
    pub const TRANSCRIPT: &str = "The transcription service is temporarily unavailable. \
        Please type your complaint instead.";
    pub const REPLY: &str = "Sorry, I couldn't reach the assistant service just now. \
        Please try again in a moment.";
}
