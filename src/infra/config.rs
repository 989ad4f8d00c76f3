// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 5001,
        }
    }
}

/// How to launch the external simulation process. The device class is
/// appended as the final argument at spawn time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Capacity of the per-session supervisor event channel.
    pub event_buffer: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            command: "python3".into(),
            args: vec!["-u".into(), "ml/simulation_engine.py".into()],
            event_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Name of the environment variable holding the provider API key.
    pub api_key_env: String,
    pub model: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// Per-attempt request timeout. Total wait is bounded by
    /// max_attempts * (timeout + retry_delay).
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key_env: "GEMINI_API_KEY".into(),
            model: "gemini-2.0-flash".into(),
            max_attempts: 3,
            retry_delay_ms: 500,
            timeout_seconds: 20,
        }
    }
}

impl Config {
    /// Load from `./devicepulse.toml` if present, otherwise defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = Path::new("devicepulse.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}
