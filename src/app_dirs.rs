//! Application directory helpers anchored to a single `.dsforge` folder.
//!
//! Plugin caches and log files live under this root. It defaults to the
//! user's home directory and honours a `DSFORGE_HOME` override for tests or
//! portable setups.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the home directory.
pub const APP_DIR_NAME: &str = ".dsforge";
/// Environment variable that replaces the home directory as the base.
pub const HOME_OVERRIDE_ENV: &str = "DSFORGE_HOME";

static BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No home directory could be resolved.
    #[error("No suitable home directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.dsforge` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    create(app_root_path()?)
}

/// Where the `.dsforge` root lives, without touching the filesystem.
pub fn app_root_path() -> Result<PathBuf, AppDirError> {
    Ok(base_dir().ok_or(AppDirError::NoBaseDir)?.join(APP_DIR_NAME))
}

/// Return the logs directory inside the `.dsforge` root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    create(app_root_dir()?.join("logs"))
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading tilde are returned unchanged.
pub fn expand_home(path: &std::path::Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

/// Force the base directory for the rest of the process.
pub fn set_base_override(path: PathBuf) {
    if let Ok(mut guard) = BASE_OVERRIDE.lock() {
        *guard = Some(path);
    }
}

fn create(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

fn base_dir() -> Option<PathBuf> {
    if let Some(path) = BASE_OVERRIDE.lock().ok().and_then(|guard| guard.clone()) {
        return Some(path);
    }
    if let Ok(path) = std::env::var(HOME_OVERRIDE_ENV) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

#[cfg(test)]
fn clear_base_override() {
    let mut guard = BASE_OVERRIDE
        .lock()
        .expect("base override mutex poisoned");
    *guard = None;
}
