// src/core/frame.rs — Canonical telemetry frame
//
// The simulation engine's stdout protocol grew two shapes over time: a
// current one keyed by `predictive_probability` / `current_health_*` and a
// legacy one keyed by `probability` / `final_status_*` with an inline
// forecast table. Both are normalized into one tagged frame type here, at
// the channel boundary, so nothing downstream branches on payload shape.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infra::errors::DevicePulseError;

/// Device classes the simulation engine knows how to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Smartphone,
    Smartwatch,
    Smartfridge,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Smartphone => "smartphone",
            DeviceClass::Smartwatch => "smartwatch",
            DeviceClass::Smartfridge => "smartfridge",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceClass {
    type Err = DevicePulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smartphone" => Ok(DeviceClass::Smartphone),
            "smartwatch" => Ok(DeviceClass::Smartwatch),
            "smartfridge" => Ok(DeviceClass::Smartfridge),
            other => Err(DevicePulseError::UnknownDevice(other.to_string())),
        }
    }
}

/// Health verdict for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Normal,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Normal => "Normal",
            HealthStatus::Warning => "Warning",
            HealthStatus::Critical => "Critical",
        }
    }

    /// Thresholds used by the classification model: <0.3 normal,
    /// <0.7 warning, otherwise critical.
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.3 {
            HealthStatus::Normal
        } else if probability < 0.7 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

impl FromStr for HealthStatus {
    type Err = DevicePulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(HealthStatus::Normal),
            "warning" => Ok(HealthStatus::Warning),
            "critical" => Ok(HealthStatus::Critical),
            other => Err(DevicePulseError::MalformedFrame(format!(
                "unknown health status '{other}'"
            ))),
        }
    }
}

/// One (time offset, predicted metric) forecast pair. The legacy engine
/// emitted capitalized keys; accept both, emit the canonical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(alias = "Time")]
    pub time: String,
    #[serde(alias = "Predicted Metric")]
    pub predicted_metric: String,
}

/// One timestamped health/prediction snapshot, organic or synthetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub timestamp: String,
    pub probability: f64,
    pub status: HealthStatus,
    pub status_label: String,
    pub is_anomaly_predicted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_anomaly_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Vec<ForecastPoint>>,
    /// Names the fault scenario for manually triggered frames; absent on
    /// organic frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl TelemetryFrame {
    /// Parse one stdout line from the simulation process into a canonical
    /// frame. Lines that are not JSON objects, carry no probability, or
    /// violate the frame invariants are rejected (the supervisor logs and
    /// drops them).
    pub fn parse_line(line: &str) -> Result<Self, DevicePulseError> {
        let raw: Value = serde_json::from_str(line.trim())
            .map_err(|e| DevicePulseError::MalformedFrame(e.to_string()))?;
        Self::from_raw(&raw)
    }

    pub fn from_raw(raw: &Value) -> Result<Self, DevicePulseError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| DevicePulseError::MalformedFrame("not a JSON object".into()))?;

        let probability = obj
            .get("predictive_probability")
            .or_else(|| obj.get("probability"))
            .and_then(Value::as_f64)
            .ok_or_else(|| DevicePulseError::MalformedFrame("missing probability".into()))?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(DevicePulseError::MalformedFrame(format!(
                "probability {probability} outside [0,1]"
            )));
        }

        let style = obj
            .get("current_health_style")
            .or_else(|| obj.get("final_status_style"))
            .and_then(Value::as_str);
        let status = match style {
            Some(s) => s.parse()?,
            None => HealthStatus::from_probability(probability),
        };

        let status_label = obj
            .get("current_health_status")
            .or_else(|| obj.get("final_status_text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.label().to_string());

        let timestamp = obj
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(now_timestamp);

        let is_anomaly_predicted = obj
            .get("is_anomaly_predicted")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let root_cause = obj
            .get("root_cause")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty() && *s != "None")
            .map(str::to_string);

        // Invariant: a predicted-anomaly time only makes sense when an
        // anomaly is actually predicted.
        let first_anomaly_time = if is_anomaly_predicted {
            obj.get("first_anomaly_time")
                .and_then(Value::as_str)
                .map(str::to_string)
        } else {
            None
        };

        let forecast = match obj.get("forecast") {
            Some(v) => Some(
                serde_json::from_value::<Vec<ForecastPoint>>(v.clone())
                    .map_err(|e| DevicePulseError::MalformedFrame(e.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            timestamp,
            probability,
            status,
            status_label,
            is_anomaly_predicted,
            root_cause,
            first_anomaly_time,
            forecast,
            trigger: None,
        })
    }

    /// One-line verdict recorded alongside the frame in the report's
    /// predictive section.
    pub fn verdict(&self) -> String {
        match (self.status, self.root_cause.as_deref()) {
            (HealthStatus::Normal, _) => "Status confirmed by predictive scan.".into(),
            (HealthStatus::Warning, Some(cause)) => {
                format!("Early warning signs point to {cause}.")
            }
            (HealthStatus::Warning, None) => "Early warning signs detected by predictive scan.".into(),
            (HealthStatus::Critical, Some(cause)) => {
                format!("Immediate attention required: {cause}.")
            }
            (HealthStatus::Critical, None) => "Immediate attention required.".into(),
        }
    }
}

/// Wall-clock HH:MM:SS, matching what the simulation engine stamps on its
/// own frames.
pub fn now_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
