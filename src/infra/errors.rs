// src/infra/errors.rs — Error types for DevicePulse

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevicePulseError {
    // Upstream provider errors (retriable depending on cause)
    #[error("Gateway error: {message}")]
    Gateway { message: String, retriable: bool },

    // Resource errors
    #[error("Report '{id}' not found")]
    ReportNotFound { id: String },

    #[error("Unknown device class '{0}'")]
    UnknownDevice(String),

    // Telemetry boundary
    #[error("Malformed telemetry frame: {0}")]
    MalformedFrame(String),

    // Process supervision
    #[error("Failed to spawn simulation process: {0}")]
    Spawn(#[source] std::io::Error),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DevicePulseError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, DevicePulseError::Gateway { retriable: true, .. })
    }
}
