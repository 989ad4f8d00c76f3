// src/reports/store.rs — Report store
//
// Keyed record store behind a trait so the server wires in one shared
// instance and tests substitute their own. The in-memory implementation is
// process-lifetime with no eviction; reports are never deleted.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use uuid::Uuid;

use crate::core::frame::DeviceClass;
use crate::infra::errors::DevicePulseError;
use crate::reports::{Report, ReportUpdate, SectionData, VisualSection};

pub trait ReportStore: Send + Sync {
    /// Create a fresh report with all sections absent.
    fn create(&self, session_id: &str, device: DeviceClass) -> Report;

    fn get(&self, report_id: &str) -> Option<Report>;

    /// Legacy lookup keyed by (session, device), used only by triggers that
    /// arrive before a report id is known. `report_id` is the source of
    /// truth everywhere else.
    fn find_by_session(&self, session_id: &str, device: DeviceClass) -> Option<Report>;

    /// Replace one section wholesale. Fails if the report id is unknown and
    /// leaves the store unchanged in that case.
    fn update_section(
        &self,
        report_id: &str,
        section: SectionData,
    ) -> Result<Report, DevicePulseError>;

    /// Merge a partial update into the named sections under a single lock
    /// acquisition. Fails if the report id is unknown.
    fn merge_update(
        &self,
        report_id: &str,
        update: ReportUpdate,
    ) -> Result<Report, DevicePulseError>;

    /// All reports, newest first.
    fn all(&self) -> Vec<Report>;
}

#[derive(Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<String, Report>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportStore for InMemoryReportStore {
    fn create(&self, session_id: &str, device: DeviceClass) -> Report {
        let now = Utc::now();
        let report = Report {
            report_id: format!("{device}-{}-{}", now.timestamp_millis(), Uuid::new_v4()),
            session_id: session_id.to_string(),
            device,
            created_at: now,
            predictive: None,
            visual: None,
            audio: None,
        };
        let mut reports = self.reports.write().unwrap_or_else(|e| e.into_inner());
        reports.insert(report.report_id.clone(), report.clone());
        report
    }

    fn get(&self, report_id: &str) -> Option<Report> {
        let reports = self.reports.read().unwrap_or_else(|e| e.into_inner());
        reports.get(report_id).cloned()
    }

    fn find_by_session(&self, session_id: &str, device: DeviceClass) -> Option<Report> {
        let reports = self.reports.read().unwrap_or_else(|e| e.into_inner());
        reports
            .values()
            .filter(|r| r.session_id == session_id && r.device == device)
            .max_by_key(|r| r.created_at)
            .cloned()
    }

    fn update_section(
        &self,
        report_id: &str,
        section: SectionData,
    ) -> Result<Report, DevicePulseError> {
        let mut reports = self.reports.write().unwrap_or_else(|e| e.into_inner());
        let report = reports
            .get_mut(report_id)
            .ok_or_else(|| DevicePulseError::ReportNotFound {
                id: report_id.to_string(),
            })?;
        match section {
            SectionData::Predictive(data) => report.predictive = Some(data),
            SectionData::Visual(data) => report.visual = Some(data),
            SectionData::Audio(data) => report.audio = Some(data),
        }
        Ok(report.clone())
    }

    fn merge_update(
        &self,
        report_id: &str,
        update: ReportUpdate,
    ) -> Result<Report, DevicePulseError> {
        let mut reports = self.reports.write().unwrap_or_else(|e| e.into_inner());
        let report = reports
            .get_mut(report_id)
            .ok_or_else(|| DevicePulseError::ReportNotFound {
                id: report_id.to_string(),
            })?;

        if let Some(analysis) = update.visual_analysis {
            match report.visual.as_mut() {
                Some(visual) => visual.analysis = analysis,
                None => {
                    report.visual = Some(VisualSection {
                        analysis,
                        image: None,
                    })
                }
            }
        }

        if let Some(transcript) = update.audio_transcript {
            report.audio = Some(crate::reports::AudioSection { transcript });
        }

        if let Some(predictive) = update.predictive {
            match report.predictive.as_mut() {
                Some(section) => {
                    if let Some(summary) = predictive.summary {
                        section.summary = Some(summary);
                    }
                    if let Some(verdict) = predictive.verdict {
                        section.verdict = verdict;
                    }
                }
                // Nothing to merge into: a predictive section cannot be
                // created without a frame. Logged and skipped to keep the
                // request alive.
                None => tracing::debug!(
                    report_id,
                    "Ignoring predictive update for report with no telemetry yet"
                ),
            }
        }

        Ok(report.clone())
    }

    fn all(&self) -> Vec<Report> {
        let reports = self.reports.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<Report> = reports.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::triggers;
    use crate::reports::{AudioSection, PredictiveSection};

    #[test]
    fn test_create_and_get() {
        let store = InMemoryReportStore::new();
        let report = store.create("sess-1", DeviceClass::Smartphone);
        assert!(report.report_id.starts_with("smartphone-"));
        assert!(report.predictive.is_none());

        let fetched = store.get(&report.report_id).unwrap();
        assert_eq!(fetched, report);
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn test_find_by_session_returns_newest_matching() {
        let store = InMemoryReportStore::new();
        let first = store.create("sess-1", DeviceClass::Smartwatch);
        store.create("sess-2", DeviceClass::Smartwatch);
        store.create("sess-1", DeviceClass::Smartfridge);

        let found = store
            .find_by_session("sess-1", DeviceClass::Smartwatch)
            .unwrap();
        assert_eq!(found.report_id, first.report_id);
        assert!(store
            .find_by_session("sess-3", DeviceClass::Smartwatch)
            .is_none());
    }

    #[test]
    fn test_update_section_replaces_wholesale() {
        let store = InMemoryReportStore::new();
        let report = store.create("sess-1", DeviceClass::Smartphone);

        let frame = triggers::synthesize(DeviceClass::Smartphone, "critical_cpu");
        store
            .update_section(
                &report.report_id,
                SectionData::Predictive(PredictiveSection {
                    verdict: frame.verdict(),
                    summary: Some("old summary".into()),
                    frame: frame.clone(),
                }),
            )
            .unwrap();

        // Next predictive write replaces the whole section, summary included.
        let updated = store
            .update_section(
                &report.report_id,
                SectionData::Predictive(PredictiveSection {
                    verdict: frame.verdict(),
                    summary: None,
                    frame,
                }),
            )
            .unwrap();
        assert!(updated.predictive.unwrap().summary.is_none());
    }

    #[test]
    fn test_update_unknown_id_fails_and_leaves_store_unchanged() {
        let store = InMemoryReportStore::new();
        let report = store.create("sess-1", DeviceClass::Smartfridge);

        let result = store.update_section(
            "missing-id",
            SectionData::Audio(AudioSection {
                transcript: "hello".into(),
            }),
        );
        assert!(matches!(
            result,
            Err(DevicePulseError::ReportNotFound { .. })
        ));
        assert!(store.get(&report.report_id).unwrap().audio.is_none());
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn test_merge_update_touches_only_named_sections() {
        let store = InMemoryReportStore::new();
        let report = store.create("sess-1", DeviceClass::Smartphone);
        store
            .update_section(
                &report.report_id,
                SectionData::Visual(VisualSection {
                    analysis: "initial".into(),
                    image: Some("abc123".into()),
                }),
            )
            .unwrap();

        let merged = store
            .merge_update(
                &report.report_id,
                ReportUpdate {
                    visual_analysis: Some("cracked screen".into()),
                    audio_transcript: Some("it rattles".into()),
                    predictive: None,
                },
            )
            .unwrap();

        let visual = merged.visual.unwrap();
        assert_eq!(visual.analysis, "cracked screen");
        // Merging the analysis keeps the attached image.
        assert_eq!(visual.image.as_deref(), Some("abc123"));
        assert_eq!(merged.audio.unwrap().transcript, "it rattles");
        assert!(merged.predictive.is_none());
    }

    #[test]
    fn test_merge_predictive_summary_onto_existing_section() {
        let store = InMemoryReportStore::new();
        let report = store.create("sess-1", DeviceClass::Smartphone);
        let frame = triggers::synthesize(DeviceClass::Smartphone, "battery_failure");
        store
            .update_section(
                &report.report_id,
                SectionData::Predictive(PredictiveSection {
                    verdict: frame.verdict(),
                    summary: None,
                    frame,
                }),
            )
            .unwrap();

        let merged = store
            .merge_update(
                &report.report_id,
                ReportUpdate {
                    predictive: Some(crate::reports::PredictiveUpdate {
                        summary: Some("Battery is degrading fast.".into()),
                        verdict: None,
                    }),
                    ..Default::default()
                },
            )
            .unwrap();
        let predictive = merged.predictive.unwrap();
        assert_eq!(predictive.summary.as_deref(), Some("Battery is degrading fast."));
        assert!(!predictive.verdict.is_empty());
    }

    #[test]
    fn test_all_orders_newest_first() {
        let store = InMemoryReportStore::new();
        let a = store.create("sess-1", DeviceClass::Smartphone);
        let b = store.create("sess-2", DeviceClass::Smartwatch);
        let all = store.all();
        assert_eq!(all.len(), 2);
        // created_at for b is >= a; ties keep both present
        assert!(all.iter().any(|r| r.report_id == a.report_id));
        assert!(all.iter().any(|r| r.report_id == b.report_id));
        assert!(all[0].created_at >= all[1].created_at);
    }
}
