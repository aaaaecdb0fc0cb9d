//! Dashboard behaviour, kept free of rendering so it can be driven headless.

mod jobs;

use std::path::{Path, PathBuf};
use std::sync::mpsc::TryRecvError;
use std::time::{Duration, Instant};

use egui::Color32;
use rfd::FileDialog;

use self::jobs::{ControllerJobs, JobMessage};
use super::ui::style;
use super::state::{
    DashboardState, LoadedFile, LoadedSample, PredictionResult, StatusTone, Toast,
};
use crate::client::{BackendClient, BackendHealth, ClientError, SamplePayload, extract_input};
use crate::config::{self, DashboardSettings};
use crate::iris::species_label;

/// How long a toast stays on screen.
pub const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 5;
const MAX_INPUT_FILE_BYTES: u64 = 1024 * 1024;

const MSG_NO_INPUT: &str = "Please upload a JSON file or use the random sample button first.";
const MSG_MISSING_INPUT_FIELD: &str = "Please upload a valid JSON file with input_test field.";
const MSG_MODEL_MISSING: &str =
    "Model not found. Run irisview-model-export to generate iris_model.json";
const MSG_BACKEND_CONNECTION: &str = "Problem with backend connection.";
const MSG_SAMPLE_CONNECTION: &str = "Error connecting to backend for random sample.";

/// Maintains dashboard state and bridges backend calls to the egui UI.
pub struct DashboardController {
    pub ui: DashboardState,
    settings: DashboardSettings,
    client: Result<BackendClient, ClientError>,
    jobs: ControllerJobs,
    last_health_check: Option<Instant>,
    persist_settings: bool,
    next_toast_id: u64,
}

impl DashboardController {
    pub fn new(settings: DashboardSettings) -> Self {
        let client = BackendClient::new(&settings.backend_url);
        let mut controller = Self {
            ui: DashboardState::default(),
            settings,
            client,
            jobs: ControllerJobs::new(),
            last_health_check: None,
            persist_settings: false,
            next_toast_id: 0,
        };
        controller.sync_config_panel();
        controller
    }

    /// Load persisted settings; later backend URL edits are saved back to disk.
    pub fn load_configuration(&mut self) -> Result<(), config::ConfigError> {
        let cfg = config::load_or_default()?;
        self.apply_settings(cfg.dashboard);
        self.persist_settings = true;
        Ok(())
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// True while any backend call is outstanding.
    pub fn is_busy(&self) -> bool {
        self.jobs.any_in_progress()
    }

    /// Per-frame update: drain finished jobs, expire toasts, run scheduled health checks.
    pub fn tick(&mut self, now: Instant) {
        self.poll_jobs();
        self.prune_toasts(now);
        let interval = Duration::from_secs(self.settings.health_interval_secs);
        let due = self
            .last_health_check
            .is_none_or(|last| now.saturating_duration_since(last) >= interval);
        if due {
            self.refresh_health_at(now);
        }
    }

    /// Ping the backend now.
    pub fn refresh_health(&mut self) {
        self.refresh_health_at(Instant::now());
    }

    fn refresh_health_at(&mut self, now: Instant) {
        self.last_health_check = Some(now);
        match &self.client {
            Ok(client) => {
                if self.jobs.begin_health_check(client.clone()) {
                    self.ui.health.checking = true;
                }
            }
            Err(err) => {
                self.ui.health.last = Some(BackendHealth::Offline {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Replace the backend URL from the sidebar input, saving it when persistence is on.
    pub fn apply_backend_url_input(&mut self) {
        let input = self.ui.config.backend_url_input.trim().to_string();
        if let Err(err) = BackendClient::new(&input) {
            self.ui.config.last_error = Some(err.to_string());
            return;
        }
        let mut settings = self.settings.clone();
        settings.backend_url = input.trim_end_matches('/').to_string();
        self.apply_settings(settings);
        if self.persist_settings {
            if let Err(err) = self.save_settings() {
                tracing::error!("Failed to save dashboard settings: {err}");
                self.ui.config.last_error = Some(err.to_string());
                return;
            }
        }
        self.set_status(
            format!("Backend set to {}", self.settings.backend_url),
            StatusTone::Info,
        );
    }

    fn apply_settings(&mut self, settings: DashboardSettings) {
        self.client = BackendClient::new(&settings.backend_url);
        self.settings = settings;
        self.jobs.switch_backend();
        self.ui.health.last = None;
        self.ui.health.checking = false;
        self.ui.input.fetching_sample = false;
        self.ui.prediction.in_flight = false;
        self.sync_config_panel();
        self.refresh_health();
    }

    fn save_settings(&self) -> Result<(), config::ConfigError> {
        config::save_dashboard(&self.settings)
    }

    fn sync_config_panel(&mut self) {
        self.ui.config.backend_url = self.settings.backend_url.clone();
        self.ui.config.backend_url_input = self.settings.backend_url.clone();
        self.ui.config.last_error = match &self.client {
            Ok(_) => None,
            Err(err) => Some(err.to_string()),
        };
    }

    /// Ask the backend for a synthesized sample.
    pub fn request_random_sample(&mut self) {
        let client = match &self.client {
            Ok(client) => client.clone(),
            Err(err) => {
                let message = err.to_string();
                self.push_toast(message, StatusTone::Error);
                return;
            }
        };
        if self.jobs.begin_sample_fetch(client) {
            self.ui.input.fetching_sample = true;
            self.set_status("Fetching random sample…", StatusTone::Busy);
        }
    }

    /// Open a file dialog filtered to JSON and load the chosen file.
    pub fn pick_input_file(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_title("Choose a test prediction file")
            .pick_file()
        else {
            return;
        };
        self.load_input_file(&path);
    }

    /// Load and preview a JSON file from disk.
    pub fn load_input_file(&mut self, path: &Path) {
        let name = display_name(path);
        match read_input_file(path) {
            Ok(bytes) => self.load_input_bytes(name, Some(path.to_path_buf()), &bytes),
            Err(err) => {
                tracing::error!("Failed to read {}: {err}", path.display());
                self.push_toast(format!("Could not read {name}: {err}"), StatusTone::Error);
            }
        }
    }

    /// Load JSON bytes that did not come from a path (e.g. drag-and-drop payloads).
    pub fn load_input_bytes(&mut self, name: String, path: Option<PathBuf>, bytes: &[u8]) {
        let value: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("No valid JSON file provided ({name}): {err}");
                self.push_toast(format!("{name} is not valid JSON: {err}"), StatusTone::Error);
                return;
            }
        };
        let preview = pretty(&value);
        tracing::info!("Loaded input file {name}");
        self.set_status(format!("Loaded {name}"), StatusTone::Info);
        self.ui.input.file = Some(LoadedFile {
            name,
            path,
            value,
            preview,
        });
    }

    /// Forget the uploaded file; a previously fetched sample becomes active again.
    pub fn clear_input_file(&mut self) {
        if self.ui.input.file.take().is_some() {
            self.set_status("Input file cleared", StatusTone::Idle);
        }
    }

    /// Send the active payload's `input_test` object to the prediction endpoint.
    pub fn predict(&mut self) {
        if self.ui.prediction.in_flight {
            return;
        }
        let Some(payload) = self.ui.input.active_value() else {
            self.push_toast(MSG_NO_INPUT, StatusTone::Error);
            return;
        };
        let Some(input) = extract_input(payload).cloned() else {
            tracing::error!("Input has no usable {} object", crate::wire::INPUT_FIELD);
            self.push_toast(MSG_MISSING_INPUT_FIELD, StatusTone::Warning);
            return;
        };
        if self.ui.health.model_missing() {
            tracing::warn!("Backend reports that no model is loaded");
            self.push_toast(MSG_MODEL_MISSING, StatusTone::Error);
            return;
        }
        let client = match &self.client {
            Ok(client) => client.clone(),
            Err(err) => {
                let message = err.to_string();
                self.push_toast(message, StatusTone::Error);
                return;
            }
        };
        if self.jobs.begin_predict(client, input) {
            self.ui.prediction.in_flight = true;
            self.ui.prediction.result = None;
            self.set_status("🔮 Model is predicting...", StatusTone::Busy);
        }
    }

    /// Apply every finished background job.
    pub fn poll_jobs(&mut self) {
        loop {
            let message = match self.jobs.try_recv_message() {
                Ok(message) => message,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            };
            match message {
                JobMessage::HealthChecked(health) => {
                    self.jobs.clear_health_check();
                    self.apply_health(health);
                }
                JobMessage::SampleFetched(result) => {
                    self.jobs.clear_sample_fetch();
                    self.apply_sample(result);
                }
                JobMessage::Predicted(result) => {
                    self.jobs.clear_predict();
                    self.apply_prediction(result);
                }
            }
        }
    }

    fn apply_health(&mut self, health: BackendHealth) {
        self.ui.health.checking = false;
        match &health {
            BackendHealth::Offline { reason } => tracing::error!("Backend offline: {reason}"),
            BackendHealth::Unhealthy { status } => {
                tracing::warn!("Backend answered health check with {status}")
            }
            BackendHealth::Online { model_loaded } => {
                tracing::debug!("Backend online (model_loaded={model_loaded})")
            }
        }
        self.ui.health.last = Some(health);
    }

    fn apply_sample(&mut self, result: Result<SamplePayload, ClientError>) {
        self.ui.input.fetching_sample = false;
        match result {
            Ok(sample) => {
                let preview = pretty(&sample.raw);
                self.ui.input.sample = Some(LoadedSample {
                    value: sample.raw,
                    preview,
                });
                self.push_toast("🎉 Random sample loaded!", StatusTone::Success);
            }
            Err(ClientError::Status { code, body }) => {
                tracing::error!("Random sample request failed with {code}: {body}");
                self.push_toast(
                    format!("Failed to fetch random sample: {code}"),
                    StatusTone::Error,
                );
            }
            Err(err) => {
                tracing::error!("Random sample request failed: {err}");
                self.push_toast(MSG_SAMPLE_CONNECTION, StatusTone::Error);
            }
        }
    }

    fn apply_prediction(&mut self, result: Result<i64, ClientError>) {
        self.ui.prediction.in_flight = false;
        match result {
            Ok(label) => {
                let prediction = PredictionResult {
                    label,
                    species: species_label(label),
                };
                tracing::info!("Predicted label {label} ({})", prediction.species);
                self.set_status(prediction.message(), StatusTone::Success);
                self.ui.prediction.result = Some(prediction);
            }
            Err(ClientError::Status { code, body }) => {
                tracing::error!("Prediction request failed with {code}: {body}");
                self.push_toast(
                    format!("Server returned {code}. Try again."),
                    StatusTone::Error,
                );
            }
            Err(err) => {
                tracing::error!("Prediction request failed: {err}");
                self.push_toast(MSG_BACKEND_CONNECTION, StatusTone::Error);
            }
        }
    }

    /// Show a toast and mirror it in the status bar.
    pub fn push_toast(&mut self, text: impl Into<String>, tone: StatusTone) {
        let text = text.into();
        self.set_status(text.clone(), tone);
        self.next_toast_id += 1;
        self.ui.toasts.push(Toast {
            id: self.next_toast_id,
            text,
            tone,
            created_at: Instant::now(),
        });
        let excess = self.ui.toasts.len().saturating_sub(MAX_TOASTS);
        self.ui.toasts.drain(..excess);
    }

    pub fn dismiss_toast(&mut self, id: u64) {
        self.ui.toasts.retain(|toast| toast.id != id);
    }

    fn prune_toasts(&mut self, now: Instant) {
        self.ui
            .toasts
            .retain(|toast| now.saturating_duration_since(toast.created_at) < TOAST_TTL);
    }

    fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        let (label, color) = status_badge(tone);
        self.ui.status.text = text.into();
        self.ui.status.badge_label = label;
        self.ui.status.badge_color = color;
    }
}

fn status_badge(tone: StatusTone) -> (String, Color32) {
    let label = match tone {
        StatusTone::Idle => "Idle",
        StatusTone::Busy => "Working",
        StatusTone::Info => "Info",
        StatusTone::Success => "Done",
        StatusTone::Warning => "Warning",
        StatusTone::Error => "Error",
    };
    (label.into(), style::tone_color(tone))
}

fn read_input_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let len = std::fs::metadata(path)?.len();
    if len > MAX_INPUT_FILE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("file is {len} bytes (limit {MAX_INPUT_FILE_BYTES})"),
        ));
    }
    std::fs::read(path)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    /// Controller pointed at a closed local port so nothing is ever reached.
    fn offline_controller() -> DashboardController {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        DashboardController::new(DashboardSettings {
            backend_url: format!("http://{addr}"),
            health_interval_secs: 10,
        })
    }

    fn last_toast(controller: &DashboardController) -> &str {
        &controller.ui.toasts.last().expect("toast").text
    }

    #[test]
    fn predict_without_input_asks_for_one() {
        let mut controller = offline_controller();
        controller.predict();
        assert_eq!(last_toast(&controller), MSG_NO_INPUT);
        assert!(!controller.ui.prediction.in_flight);
    }

    #[test]
    fn predict_requires_input_test_field() {
        let mut controller = offline_controller();
        controller.load_input_bytes("bad.json".into(), None, br#"{"features": [1, 2, 3, 4]}"#);
        assert!(controller.ui.input.file.is_some());
        controller.predict();
        assert_eq!(last_toast(&controller), MSG_MISSING_INPUT_FIELD);
    }

    #[test]
    fn predict_refuses_when_backend_has_no_model() {
        let mut controller = offline_controller();
        controller.ui.health.last = Some(BackendHealth::Online {
            model_loaded: false,
        });
        controller.load_input_bytes(
            "input.json".into(),
            None,
            json!({"input_test": {"sepal_length": 5.1}}).to_string().as_bytes(),
        );
        controller.predict();
        assert_eq!(last_toast(&controller), MSG_MODEL_MISSING);
        assert!(!controller.is_busy());
    }

    #[test]
    fn invalid_json_file_is_reported_and_not_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();
        let mut controller = offline_controller();
        controller.load_input_file(&path);
        assert!(controller.ui.input.file.is_none());
        assert!(last_toast(&controller).starts_with("broken.json is not valid JSON"));
    }

    #[test]
    fn loaded_file_is_previewed_pretty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.json");
        std::fs::write(&path, r#"{"input_test":{"sepal_length":5.1}}"#).unwrap();
        let mut controller = offline_controller();
        controller.load_input_file(&path);
        let file = controller.ui.input.file.as_ref().unwrap();
        assert_eq!(file.name, "input.json");
        assert_eq!(file.path.as_deref(), Some(path.as_path()));
        assert!(file.preview.contains("\n"));
        let (title, preview) = controller.ui.input.active_preview().unwrap();
        assert_eq!(title, "🔎 File Preview");
        assert!(preview.contains("sepal_length"));
    }

    #[test]
    fn clearing_file_falls_back_to_sample() {
        let mut controller = offline_controller();
        controller.ui.input.sample = Some(LoadedSample {
            value: json!({"input_test": {}}),
            preview: "{}".into(),
        });
        controller.load_input_bytes("input.json".into(), None, b"{}");
        controller.clear_input_file();
        assert_eq!(
            controller.ui.input.active_preview().unwrap().0,
            "🔎 Random Sample Preview"
        );
    }

    #[test]
    fn prediction_results_map_through_label_table() {
        let mut controller = offline_controller();
        controller.apply_prediction(Ok(1));
        let result = controller.ui.prediction.result.clone().unwrap();
        assert_eq!(result.species, "Versicolor 🌿");
        assert_eq!(result.message(), "✅ The flower predicted is: Versicolor 🌿");

        controller.apply_prediction(Ok(7));
        assert_eq!(
            controller.ui.prediction.result.as_ref().unwrap().species,
            "Unknown ❓"
        );
    }

    #[test]
    fn prediction_errors_become_toasts() {
        let mut controller = offline_controller();
        controller.apply_prediction(Err(ClientError::Status {
            code: 500,
            body: "{}".into(),
        }));
        assert_eq!(last_toast(&controller), "Server returned 500. Try again.");
        controller.apply_prediction(Err(ClientError::Transport("refused".into())));
        assert_eq!(last_toast(&controller), MSG_BACKEND_CONNECTION);
    }

    #[test]
    fn sample_errors_become_toasts() {
        let mut controller = offline_controller();
        controller.apply_sample(Err(ClientError::Status {
            code: 503,
            body: String::new(),
        }));
        assert_eq!(last_toast(&controller), "Failed to fetch random sample: 503");
        controller.apply_sample(Err(ClientError::Transport("refused".into())));
        assert_eq!(last_toast(&controller), MSG_SAMPLE_CONNECTION);
    }

    #[test]
    fn toasts_expire_and_are_capped() {
        let mut controller = offline_controller();
        for idx in 0..(MAX_TOASTS + 2) {
            controller.push_toast(format!("toast {idx}"), StatusTone::Info);
        }
        assert_eq!(controller.ui.toasts.len(), MAX_TOASTS);
        assert_eq!(controller.ui.toasts[0].text, "toast 2");
        assert_eq!(controller.ui.status.text, format!("toast {}", MAX_TOASTS + 1));

        let later = Instant::now() + TOAST_TTL + Duration::from_millis(1);
        controller.prune_toasts(later);
        assert!(controller.ui.toasts.is_empty());
    }

    #[test]
    fn dismiss_removes_single_toast() {
        let mut controller = offline_controller();
        controller.push_toast("one", StatusTone::Info);
        controller.push_toast("two", StatusTone::Info);
        let first = controller.ui.toasts[0].id;
        controller.dismiss_toast(first);
        assert_eq!(controller.ui.toasts.len(), 1);
        assert_eq!(controller.ui.toasts[0].text, "two");
    }

    #[test]
    fn rejects_invalid_backend_url_input() {
        let mut controller = offline_controller();
        let before = controller.settings().backend_url.clone();
        controller.ui.config.backend_url_input = "localhost:8000".into();
        controller.apply_backend_url_input();
        assert!(controller.ui.config.last_error.is_some());
        assert_eq!(controller.settings().backend_url, before);
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    fn wait_for_health(controller: &mut DashboardController) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while controller.ui.health.checking && Instant::now() < deadline {
            controller.poll_jobs();
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!controller.ui.health.checking, "health check never finished");
    }

    #[test]
    fn results_from_previous_backend_are_ignored() {
        let mut controller = offline_controller();
        controller.ui.prediction.in_flight = true;
        let stale = controller.jobs.generation();

        controller.ui.config.backend_url_input = closed_port_url();
        controller.apply_backend_url_input();
        assert!(!controller.ui.prediction.in_flight);

        controller.jobs.deliver(
            stale,
            JobMessage::HealthChecked(BackendHealth::Online {
                model_loaded: false,
            }),
        );
        controller.jobs.deliver(stale, JobMessage::Predicted(Ok(2)));
        controller.poll_jobs();

        assert!(!controller.ui.health.model_missing());
        assert!(controller.ui.prediction.result.is_none());
    }

    #[test]
    fn health_is_rechecked_once_interval_elapses() {
        let mut controller = offline_controller();
        let interval = Duration::from_secs(controller.settings().health_interval_secs);
        let start = Instant::now();
        controller.tick(start);
        assert!(controller.ui.health.checking);
        wait_for_health(&mut controller);

        controller.tick(start + interval - Duration::from_millis(1));
        assert!(!controller.ui.health.checking);

        controller.tick(start + interval);
        assert!(controller.ui.health.checking);
        wait_for_health(&mut controller);
        assert!(matches!(
            controller.ui.health.last,
            Some(BackendHealth::Offline { .. })
        ));
    }

    #[test]
    fn invalid_configured_url_marks_backend_offline() {
        let mut controller = DashboardController::new(DashboardSettings {
            backend_url: "not a url".into(),
            health_interval_secs: 10,
        });
        assert!(controller.ui.config.last_error.is_some());
        controller.refresh_health();
        assert!(matches!(
            controller.ui.health.last,
            Some(BackendHealth::Offline { .. })
        ));
    }
}
