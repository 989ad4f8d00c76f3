// src/gateway/gemini.rs — Google Generative AI (Gemini) gateway

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::frame::DeviceClass;
use crate::gateway::retry::{with_fallback, RetryPolicy};
use crate::gateway::{fallback, ChatRole, ChatTurn, DiagnosticGateway};
use crate::infra::config::GatewayConfig;
use crate::infra::errors::DevicePulseError;

pub struct GeminiGateway {
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GeminiGateway {
    /// Build the gateway from config. A missing API key does not fail
    /// construction: every call then degrades straight to its fallback.
    pub fn new(config: &GatewayConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; diagnostic endpoints will serve fallback responses",
                config.api_key_env
            );
        }
        Self {
            api_key,
            model: config.model.clone(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(config.timeout_seconds),
            retry: RetryPolicy::from(config),
        }
    }

    fn base_url(&self) -> &str {
        "https://generativelanguage.googleapis.com/v1beta"
    }

    /// One generateContent round trip. Classifies transport errors, 429 and
    /// 5xx as retriable; everything else fails fast to the fallback.
    async fn generate(&self, body: Value) -> Result<String, DevicePulseError> {
        let api_key = self.api_key.as_deref().ok_or(DevicePulseError::Gateway {
            message: "no API key configured".into(),
            retriable: false,
        })?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url(),
            self.model,
            api_key,
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| DevicePulseError::Gateway {
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retriable =
                status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            let text = response.text().await.unwrap_or_default();
            return Err(DevicePulseError::Gateway {
                message: format!("HTTP {status}: {text}"),
                retriable,
            });
        }

        let value: Value = response.json().await.map_err(|e| DevicePulseError::Gateway {
            message: e.to_string(),
            retriable: false,
        })?;

        extract_text(&value).ok_or(DevicePulseError::Gateway {
            message: "empty completion".into(),
            retriable: false,
        })
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &Value) -> Option<String> {
    let parts = response
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn user_content(parts: Vec<Value>) -> Value {
    json!({"contents": [{"role": "user", "parts": parts}]})
}

fn inline_part(mime_type: &str, data: &[u8]) -> Value {
    json!({
        "inline_data": {
            "mime_type": mime_type,
            "data": base64::engine::general_purpose::STANDARD.encode(data),
        }
    })
}

#[async_trait]
impl DiagnosticGateway for GeminiGateway {
    async fn summarize(&self, device: DeviceClass, root_cause: &str) -> String {
        let prompt = format!(
            "You are a support assistant for smart devices. A {device} is predicted \
             to fail. The diagnosed root cause is: {root_cause}. Write a short, \
             plain-language summary (2-3 sentences) for the device owner explaining \
             the problem and the recommended next step."
        );
        let body = user_content(vec![json!({"text": prompt})]);
        with_fallback(&self.retry, "summarize", fallback::SUMMARY.to_string(), || {
            self.generate(body.clone())
        })
        .await
    }

    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> String {
        let prompt = "You are inspecting a photo of a consumer electronic device for \
            physical damage. Respond with exactly these sections, each heading wrapped \
            in ** markers: **Signs of Physical Damage:** what you can see. \
            **Overall Damage Severity Classification:** one of Minor, Moderate, Severe. \
            **Justification:** why you chose that severity.";
        let body = user_content(vec![
            json!({"text": prompt}),
            inline_part(mime_type, image),
        ]);
        with_fallback(
            &self.retry,
            "analyze_image",
            fallback::ANALYSIS.to_string(),
            || self.generate(body.clone()),
        )
        .await
    }

    async fn transcribe(&self, audio: &[u8], mime_type: &str) -> String {
        let prompt = "Transcribe this audio recording of a customer describing a \
            device problem. Return only the transcript text.";
        let body = user_content(vec![
            json!({"text": prompt}),
            inline_part(mime_type, audio),
        ]);
        with_fallback(
            &self.retry,
            "transcribe",
            fallback::TRANSCRIPT.to_string(),
            || self.generate(body.clone()),
        )
        .await
    }

    async fn chat(&self, message: &str, history: &[ChatTurn]) -> String {
        let mut contents: Vec<Value> = history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                };
                json!({"role": role, "parts": [{"text": turn.text}]})
            })
            .collect();
        contents.push(json!({"role": "user", "parts": [{"text": message}]}));

        let body = json!({
            "system_instruction": {
                "parts": [{"text": "You are a friendly support assistant helping a \
                    customer diagnose problems with their smart device. Keep answers \
                    short and practical."}]
            },
            "contents": contents,
        });
        with_fallback(&self.retry, "chat", fallback::REPLY.to_string(), || {
            self.generate(body.clone())
        })
        .await
    }
}
