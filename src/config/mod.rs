//! Settings stored in `config.toml` under the `.irisview` directory.
//!
//! Config keys (TOML): `[server]` with `bind_address`, `port`, `model_path`,
//! `worker_threads`, `sample_ranges`; `[dashboard]` with `backend_url`,
//! `health_interval_secs`.

mod defaults;
mod io;
mod types;

pub use io::{
    BACKEND_URL_ENV, CONFIG_FILE_NAME, MODEL_PATH_ENV, apply_env_overrides, config_path,
    default_model_path, load_from_path, load_or_default, save, save_dashboard, save_to_path,
};
pub use defaults::{MAX_WORKER_THREADS, clamp_worker_threads};
pub use types::{AppConfig, ConfigError, DashboardSettings, ServerSettings};
