use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::{
    clamp_health_interval_secs, clamp_worker_threads, default_backend_url, default_bind_address,
    default_health_interval_secs, default_port, default_worker_threads,
};
use crate::iris::SampleRanges;

/// Aggregate settings loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

impl AppConfig {
    pub(super) fn normalized(mut self) -> Self {
        self.server.worker_threads = clamp_worker_threads(self.server.worker_threads);
        self.dashboard.health_interval_secs =
            clamp_health_interval_secs(self.dashboard.health_interval_secs);
        let backend_url = self.dashboard.backend_url.trim();
        self.dashboard.backend_url = if backend_url.is_empty() {
            default_backend_url()
        } else {
            backend_url.trim_end_matches('/').to_string()
        };
        if self.server.sample_ranges.validate().is_err() {
            tracing::warn!("Ignoring invalid sample_ranges in config; using defaults");
            self.server.sample_ranges = SampleRanges::default();
        }
        self
    }
}

/// Prediction service settings.
///
/// Config keys: `bind_address`, `port`, `model_path`, `worker_threads`, `sample_ranges`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Serialized classifier; `None` resolves to `models/iris_model.json` in the app folder.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default)]
    pub sample_ranges: SampleRanges,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            model_path: None,
            worker_threads: default_worker_threads(),
            sample_ranges: SampleRanges::default(),
        }
    }
}

impl ServerSettings {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Dashboard settings.
///
/// Config keys: `backend_url`, `health_interval_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Seconds between automatic backend health checks.
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            health_interval_secs: default_health_interval_secs(),
        }
    }
}

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No suitable config directory available")]
    NoConfigDir,
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
}
