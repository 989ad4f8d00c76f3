// src/core/triggers.rs — Synthetic fault-scenario frames
//
// A trigger skips the wait for the simulation to produce a fault organically:
// the coordinator synthesizes the frame from this static catalogue and feeds
// it through the same delivery path as process-emitted frames. The mapping is
// deterministic so a given (device, event) pair always yields the same
// status/probability fields; only the timestamp varies.

use crate::core::frame::{DeviceClass, ForecastPoint, HealthStatus, TelemetryFrame};

struct Scenario {
    status: HealthStatus,
    probability: f64,
    root_cause: &'static str,
    first_anomaly_time: &'static str,
    forecast: &'static [(&'static str, &'static str)],
}

/// Probability assigned to unknown event names, which synthesize a default
/// low-risk frame instead of being rejected.
const DEFAULT_PROBABILITY: f64 = 0.05;

fn scenario(device: DeviceClass, event: &str) -> Option<Scenario> {
    use DeviceClass::*;
    use HealthStatus::*;

    let scenario = match (device, event) {
        (Smartphone, "battery_failure") => Scenario {
            status: Warning,
            probability: 0.58,
            root_cause: "Battery Failure",
            first_anomaly_time: "+40 min",
            forecast: &[
                ("+10 min", "82.10"),
                ("+20 min", "74.60"),
                ("+30 min", "63.20"),
                ("+40 min", "48.90"),
                ("+50 min", "31.40"),
            ],
        },
        (Smartphone, "critical_cpu") => Scenario {
            status: Critical,
            probability: 0.91,
            root_cause: "CPU Overheating",
            first_anomaly_time: "+20 min",
            forecast: &[
                ("+10 min", "78.40"),
                ("+20 min", "86.90"),
                ("+30 min", "92.30"),
                ("+40 min", "95.70"),
                ("+50 min", "97.10"),
            ],
        },
        (Smartphone, "memory_failure") => Scenario {
            status: Critical,
            probability: 0.87,
            root_cause: "Memory Failure",
            first_anomaly_time: "+30 min",
            forecast: &[
                ("+10 min", "88.20"),
                ("+20 min", "91.50"),
                ("+30 min", "94.80"),
                ("+40 min", "96.30"),
                ("+50 min", "98.00"),
            ],
        },
        (Smartwatch, "battery_failure") => Scenario {
            status: Warning,
            probability: 0.55,
            root_cause: "Battery Failure",
            first_anomaly_time: "+60 min",
            forecast: &[
                ("+10 min", "41.00"),
                ("+20 min", "36.50"),
                ("+30 min", "29.80"),
                ("+40 min", "22.10"),
                ("+50 min", "15.60"),
            ],
        },
        (Smartwatch, "heart_rate_sensor") => Scenario {
            status: Critical,
            probability: 0.89,
            root_cause: "Heart Rate Sensor Failure",
            first_anomaly_time: "+20 min",
            forecast: &[
                ("+10 min", "132.00"),
                ("+20 min", "148.00"),
                ("+30 min", "0.00"),
                ("+40 min", "0.00"),
                ("+50 min", "0.00"),
            ],
        },
        (Smartwatch, "water_seal") => Scenario {
            status: Warning,
            probability: 0.61,
            root_cause: "Water Seal Failure",
            first_anomaly_time: "+90 min",
            forecast: &[
                ("+10 min", "1.02"),
                ("+20 min", "1.08"),
                ("+30 min", "1.17"),
                ("+40 min", "1.29"),
                ("+50 min", "1.44"),
            ],
        },
        (Smartfridge, "compressor_failure") => Scenario {
            status: Critical,
            probability: 0.92,
            root_cause: "Compressor Failure",
            first_anomaly_time: "+30 min",
            forecast: &[
                ("+10 min", "6.80"),
                ("+20 min", "9.40"),
                ("+30 min", "12.70"),
                ("+40 min", "15.90"),
                ("+50 min", "18.60"),
            ],
        },
        (Smartfridge, "thermostat_failure") => Scenario {
            status: Warning,
            probability: 0.64,
            root_cause: "Thermostat Failure",
            first_anomaly_time: "+50 min",
            forecast: &[
                ("+10 min", "4.90"),
                ("+20 min", "5.60"),
                ("+30 min", "6.40"),
                ("+40 min", "7.30"),
                ("+50 min", "8.10"),
            ],
        },
        (Smartfridge, "seal_failure") => Scenario {
            status: Warning,
            probability: 0.57,
            root_cause: "Seal Failure",
            first_anomaly_time: "+120 min",
            forecast: &[
                ("+10 min", "4.20"),
                ("+20 min", "4.50"),
                ("+30 min", "4.90"),
                ("+40 min", "5.30"),
                ("+50 min", "5.80"),
            ],
        },
        _ => return None,
    };
    Some(scenario)
}

/// Synthesize the frame for a fault scenario. Unknown event names produce a
/// default normal frame rather than an error, to keep the channel alive.
pub fn synthesize(device: DeviceClass, event: &str) -> TelemetryFrame {
    let timestamp = crate::core::frame::now_timestamp();

    match scenario(device, event) {
        Some(s) => TelemetryFrame {
            timestamp,
            probability: s.probability,
            status: s.status,
            status_label: s.status.label().to_string(),
            is_anomaly_predicted: true,
            root_cause: Some(s.root_cause.to_string()),
            first_anomaly_time: Some(s.first_anomaly_time.to_string()),
            forecast: Some(
                s.forecast
                    .iter()
                    .map(|(time, metric)| ForecastPoint {
                        time: (*time).to_string(),
                        predicted_metric: (*metric).to_string(),
                    })
                    .collect(),
            ),
            trigger: Some(event.to_string()),
        },
        None => {
            tracing::debug!(device = %device, event, "Unknown trigger event, synthesizing default frame");
            TelemetryFrame {
                timestamp,
                probability: DEFAULT_PROBABILITY,
                status: HealthStatus::Normal,
                status_label: HealthStatus::Normal.label().to_string(),
                is_anomaly_predicted: false,
                root_cause: None,
                first_anomaly_time: None,
                forecast: None,
                trigger: Some(event.to_string()),
            }
        }
    }
}
