//! Where irisview keeps its files.
//!
//! Everything lives under one `.irisview` folder: `config.toml` at the top,
//! `logs/` for per-launch log files and `models/` for the exported model.
//! The folder sits in the OS config directory unless `IRISVIEW_CONFIG_HOME`
//! names another base.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

pub const APP_DIR_NAME: &str = ".irisview";
/// Replaces the OS config directory as the parent of `.irisview`.
pub const CONFIG_HOME_ENV: &str = "IRISVIEW_CONFIG_HOME";

const LOGS_DIR_NAME: &str = "logs";
const MODELS_DIR_NAME: &str = "models";

static BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No config directory found for irisview files; set {CONFIG_HOME_ENV}")]
    NoBaseDir,
    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.irisview` folder, created on first use.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

/// `.irisview/logs`, created on first use.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join(LOGS_DIR_NAME))
}

/// `.irisview/models`. Not created here; the exporter makes it when writing.
pub fn models_dir() -> Result<PathBuf, AppDirError> {
    Ok(app_root_dir()?.join(MODELS_DIR_NAME))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn base_dir() -> Option<PathBuf> {
    let overridden = BASE_OVERRIDE.lock().ok().and_then(|guard| guard.clone());
    overridden
        .or_else(|| std::env::var_os(CONFIG_HOME_ENV).map(PathBuf::from))
        .or_else(|| BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
}

/// Points the `.irisview` folder at a temp dir for one test at a time.
#[cfg(test)]
pub(crate) struct OverrideGuard {
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[cfg(test)]
impl OverrideGuard {
    pub(crate) fn set(path: PathBuf) -> Self {
        static LOCK: Mutex<()> = Mutex::new(());
        let lock = LOCK.lock().unwrap_or_else(|err| err.into_inner());
        Self::replace(Some(path));
        Self { _lock: lock }
    }

    fn replace(path: Option<PathBuf>) {
        let mut slot = BASE_OVERRIDE.lock().unwrap_or_else(|err| err.into_inner());
        *slot = path;
    }
}

#[cfg(test)]
impl Drop for OverrideGuard {
    fn drop(&mut self) {
        Self::replace(None);
    }
}
