// src/reports/mod.rs — Diagnostic report model
//
// A report is the durable artifact of one monitoring session: three
// independently-nullable evidence sections (predictive telemetry, visual
// analysis, audio transcript) that outlive the session that created them.

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::frame::{DeviceClass, TelemetryFrame};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: String,
    pub session_id: String,
    pub device: DeviceClass,
    pub created_at: DateTime<Utc>,
    pub predictive: Option<PredictiveSection>,
    pub visual: Option<VisualSection>,
    pub audio: Option<AudioSection>,
}

/// Last-known telemetry frame plus its derived verdict line and, once a
/// client requested one, the AI-written summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveSection {
    pub frame: TelemetryFrame,
    pub verdict: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSection {
    pub analysis: String,
    /// Base64-encoded source image, when the client chose to attach it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSection {
    pub transcript: String,
}

/// One evidence section, used for wholesale section replacement.
#[derive(Debug, Clone)]
pub enum SectionData {
    Predictive(PredictiveSection),
    Visual(VisualSection),
    Audio(AudioSection),
}

/// Partial update applied by `PUT /reports/{id}/update`. Each provided
/// field merges into the corresponding section; absent fields leave their
/// sections untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUpdate {
    pub visual_analysis: Option<String>,
    pub audio_transcript: Option<String>,
    pub predictive: Option<PredictiveUpdate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictiveUpdate {
    pub summary: Option<String>,
    pub verdict: Option<String>,
}

/// Flattened client-facing view of a report: the derived verdict fields
/// come from the predictive section, the evidence block collects all three
/// sections. Absent sections yield nulls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReport {
    pub report_id: String,
    pub device: DeviceClass,
    pub created_at: DateTime<Utc>,
    pub final_status: Option<String>,
    pub root_cause: Option<String>,
    pub summary: Option<String>,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub log_analysis: Option<String>,
    pub visual_analysis: Option<String>,
    pub audio_transcript: Option<String>,
}

impl From<&Report> for NormalizedReport {
    fn from(report: &Report) -> Self {
        let predictive = report.predictive.as_ref();
        Self {
            report_id: report.report_id.clone(),
            device: report.device,
            created_at: report.created_at,
            final_status: predictive.map(|p| p.frame.status_label.clone()),
            root_cause: predictive.and_then(|p| p.frame.root_cause.clone()),
            summary: predictive.and_then(|p| p.summary.clone()),
            evidence: Evidence {
                log_analysis: predictive.map(|p| p.verdict.clone()),
                visual_analysis: report.visual.as_ref().map(|v| v.analysis.clone()),
                audio_transcript: report.audio.as_ref().map(|a| a.transcript.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triggers;

    #[test]
    fn test_fresh_report_normalizes_to_nulls() {
        let report = Report {
            report_id: "smartphone-0-x".into(),
            session_id: "sess".into(),
            device: DeviceClass::Smartphone,
            created_at: Utc::now(),
            predictive: None,
            visual: None,
            audio: None,
        };
        let normalized = NormalizedReport::from(&report);
        assert!(normalized.final_status.is_none());
        assert!(normalized.root_cause.is_none());
        assert!(normalized.summary.is_none());
        assert!(normalized.evidence.log_analysis.is_none());
        assert!(normalized.evidence.visual_analysis.is_none());
        assert!(normalized.evidence.audio_transcript.is_none());
    }

    #[test]
    fn test_normalized_view_pulls_from_sections() {
        let frame = triggers::synthesize(DeviceClass::Smartphone, "critical_cpu");
        let report = Report {
            report_id: "smartphone-0-x".into(),
            session_id: "sess".into(),
            device: DeviceClass::Smartphone,
            created_at: Utc::now(),
            predictive: Some(PredictiveSection {
                verdict: frame.verdict(),
                summary: Some("Your phone is overheating.".into()),
                frame,
            }),
            visual: Some(VisualSection {
                analysis: "Cracked rear panel".into(),
                image: None,
            }),
            audio: Some(AudioSection {
                transcript: "It gets hot while charging".into(),
            }),
        };
        let normalized = NormalizedReport::from(&report);
        assert_eq!(normalized.final_status.as_deref(), Some("Critical"));
        assert_eq!(normalized.root_cause.as_deref(), Some("CPU Overheating"));
        assert_eq!(normalized.summary.as_deref(), Some("Your phone is overheating."));
        assert_eq!(
            normalized.evidence.visual_analysis.as_deref(),
            Some("Cracked rear panel")
        );
        assert_eq!(
            normalized.evidence.audio_transcript.as_deref(),
            Some("It gets hot while charging")
        );
    }
}
