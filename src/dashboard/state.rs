//! Plain data rendered by the dashboard; the controller owns every mutation.

use std::path::PathBuf;
use std::time::Instant;

use egui::Color32;

use crate::client::BackendHealth;

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub health: HealthState,
    pub config: ConfigPanelState,
    pub input: InputState,
    pub prediction: PredictionState,
    pub toasts: Vec<Toast>,
    pub status: StatusBarState,
}

/// Sidebar backend indicator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthState {
    /// `None` until the first check completes.
    pub last: Option<BackendHealth>,
    pub checking: bool,
}

impl HealthState {
    /// Sidebar text for the current health.
    pub fn summary(&self) -> &'static str {
        match &self.last {
            None => "Checking backend…",
            Some(BackendHealth::Online { .. }) => "✅ Backend online",
            Some(BackendHealth::Unhealthy { .. }) => "⚠️ Backend reachable but not healthy",
            Some(BackendHealth::Offline { .. }) => "❌ Backend offline",
        }
    }

    /// True only when the backend explicitly reported that it has no model.
    pub fn model_missing(&self) -> bool {
        matches!(
            self.last,
            Some(BackendHealth::Online {
                model_loaded: false
            })
        )
    }
}

/// Editable backend settings shown in the sidebar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPanelState {
    pub backend_url: String,
    pub backend_url_input: String,
    pub last_error: Option<String>,
}

/// A JSON document loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub name: String,
    pub path: Option<PathBuf>,
    pub value: serde_json::Value,
    /// Pretty-printed copy of `value` for the preview pane.
    pub preview: String,
}

/// A sample fetched from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSample {
    pub value: serde_json::Value,
    pub preview: String,
}

/// Which payload the next prediction will use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    File,
    RandomSample,
}

/// Uploaded file and random sample slots; a file takes precedence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputState {
    pub file: Option<LoadedFile>,
    pub sample: Option<LoadedSample>,
    pub fetching_sample: bool,
}

impl InputState {
    pub fn active_source(&self) -> Option<InputSource> {
        if self.file.is_some() {
            Some(InputSource::File)
        } else if self.sample.is_some() {
            Some(InputSource::RandomSample)
        } else {
            None
        }
    }

    /// Payload for the next prediction.
    pub fn active_value(&self) -> Option<&serde_json::Value> {
        match self.active_source()? {
            InputSource::File => self.file.as_ref().map(|file| &file.value),
            InputSource::RandomSample => self.sample.as_ref().map(|sample| &sample.value),
        }
    }

    /// Preview heading and pretty JSON for the active payload.
    pub fn active_preview(&self) -> Option<(&'static str, &str)> {
        match self.active_source()? {
            InputSource::File => self
                .file
                .as_ref()
                .map(|file| ("🔎 File Preview", file.preview.as_str())),
            InputSource::RandomSample => self
                .sample
                .as_ref()
                .map(|sample| ("🔎 Random Sample Preview", sample.preview.as_str())),
        }
    }
}

/// Result area state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionState {
    pub in_flight: bool,
    pub result: Option<PredictionResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: i64,
    pub species: &'static str,
}

impl PredictionResult {
    pub fn message(&self) -> String {
        format!("✅ The flower predicted is: {}", self.species)
    }
}

/// Severity for toasts and the status bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    Idle,
    Busy,
    Info,
    Success,
    Warning,
    Error,
}

/// Short-lived notification drawn over the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub text: String,
    pub tone: StatusTone,
    pub created_at: Instant,
}

/// Status badge + text shown in the footer.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusBarState {
    pub text: String,
    pub badge_label: String,
    pub badge_color: Color32,
}

impl Default for StatusBarState {
    fn default() -> Self {
        Self::idle()
    }
}

impl StatusBarState {
    /// Default status shown before any input is loaded.
    pub fn idle() -> Self {
        Self {
            text: "Upload a JSON file or use a random sample to get started".into(),
            badge_label: "Idle".into(),
            badge_color: Color32::from_rgb(42, 42, 42),
        }
    }
}
