use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_dirs;

use super::types::{AppConfig, ConfigError, DashboardSettings};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Overrides `dashboard.backend_url`.
pub const BACKEND_URL_ENV: &str = "IRISVIEW_BACKEND_URL";
/// Overrides `server.model_path`.
pub const MODEL_PATH_ENV: &str = "IRISVIEW_MODEL_PATH";

const DEFAULT_MODEL_FILE_NAME: &str = "iris_model.json";

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Model location used when `server.model_path` is unset.
pub fn default_model_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::models_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(DEFAULT_MODEL_FILE_NAME))
}

/// Load configuration from disk, returning defaults if missing.
///
/// Environment overrides are applied after the file is read.
pub fn load_or_default() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    let mut config = load_from_path(&path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load configuration from a specific file, returning defaults if it does not exist.
pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<AppConfig>(&text)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
        .map(AppConfig::normalized)
}

/// Apply `IRISVIEW_*` overrides using the provided lookup.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup(BACKEND_URL_ENV).filter(|url| !url.trim().is_empty()) {
        config.dashboard.backend_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(path) = lookup(MODEL_PATH_ENV).filter(|path| !path.trim().is_empty()) {
        config.server.model_path = Some(PathBuf::from(path.trim()));
    }
}

/// Persist configuration to disk, overwriting any previous contents.
pub fn save(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_path()?;
    save_to_path(config, &path)
}

/// Replace only the `[dashboard]` section of the file on disk.
///
/// Reads the file without environment overrides so process-only values are not persisted.
pub fn save_dashboard(settings: &DashboardSettings) -> Result<(), ConfigError> {
    let path = config_path()?;
    let mut config = load_from_path(&path)?;
    config.dashboard = settings.clone();
    save_to_path(&config, &path)
}

/// Save configuration to a specific path, creating parent directories as needed.
pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes())
}

/// Write through a sibling temp file and rename so readers never see a partial file.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .ok_or_else(|| write_err(std::io::Error::other("config path has no parent directory")))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| write_err(std::io::Error::other("config path has no file name")))?;

    let suffix: u64 = rand::random();
    let tmp_path = dir.join(format!("{}.tmp-{suffix:016x}", file_name.to_string_lossy()));
    let result = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(source) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(source));
    }
    Ok(())
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_dirs::{APP_DIR_NAME, OverrideGuard};
    use crate::iris::FeatureRange;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from_path(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.socket_address(), "127.0.0.1:8000");
        assert_eq!(config.dashboard.backend_url, "http://localhost:8000");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        let config = load_from_path(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.worker_threads, 4);
        assert_eq!(config.dashboard.health_interval_secs, 10);
    }

    #[test]
    fn values_are_normalized_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            concat!(
                "[server]\nworker_threads = 0\n",
                "[server.sample_ranges.sepal_length]\nmin = 9.0\nmax = 1.0\n",
                "[dashboard]\nbackend_url = \"http://example.test:8000/\"\nhealth_interval_secs = 0\n",
            ),
        )
        .unwrap();
        let config = load_from_path(&path).unwrap();
        assert_eq!(config.server.worker_threads, 1);
        assert_eq!(config.server.sample_ranges.sepal_length, FeatureRange::new(4.3, 7.9));
        assert_eq!(config.dashboard.backend_url, "http://example.test:8000");
        assert_eq!(config.dashboard.health_interval_secs, 2);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[server\nport = ").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn save_round_trips_through_app_dir() {
        let dir = tempdir().unwrap();
        let _guard = OverrideGuard::set(dir.path().to_path_buf());
        let mut config = AppConfig::default();
        config.server.model_path = Some(PathBuf::from("/models/tree.json"));
        config.dashboard.backend_url = "http://10.0.0.5:8000".to_string();
        save(&config).unwrap();

        let path = dir.path().join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        assert!(path.is_file());
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        let leftovers = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn save_dashboard_keeps_server_section() {
        let dir = tempdir().unwrap();
        let _guard = OverrideGuard::set(dir.path().to_path_buf());
        let path = config_path().unwrap();
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        save_dashboard(&DashboardSettings {
            backend_url: "http://10.0.0.9:8000".to_string(),
            health_interval_secs: 30,
        })
        .unwrap();

        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.server.port, 9100);
        assert_eq!(loaded.server.model_path, None);
        assert_eq!(loaded.dashboard.backend_url, "http://10.0.0.9:8000");
        assert_eq!(loaded.dashboard.health_interval_secs, 30);
    }

    #[test]
    fn default_model_path_lives_in_models_dir() {
        let dir = tempdir().unwrap();
        let _guard = OverrideGuard::set(dir.path().to_path_buf());
        assert_eq!(
            default_model_path().unwrap(),
            dir.path()
                .join(APP_DIR_NAME)
                .join("models")
                .join("iris_model.json")
        );
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (BACKEND_URL_ENV, " http://backend:9000/ "),
            (MODEL_PATH_ENV, "/srv/iris.json"),
        ]);
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.dashboard.backend_url, "http://backend:9000");
        assert_eq!(config.server.model_path, Some(PathBuf::from("/srv/iris.json")));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |_| Some("  ".to_string()));
        assert_eq!(config, AppConfig::default());
    }
}
