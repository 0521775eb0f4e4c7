//! Directory layout for everything the service keeps on disk.
//!
//! All state lives under a single `.intentwise` folder inside the OS config
//! directory. `INTENTWISE_CONFIG_HOME` relocates the base for tests and
//! portable installs.

use std::{
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory under the OS config root.
pub const APP_DIR_NAME: &str = ".intentwise";
/// Environment variable that replaces the OS config root.
pub const CONFIG_HOME_ENV: &str = "INTENTWISE_CONFIG_HOME";

static BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors raised while resolving or creating application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// Neither the override nor the OS provided a base directory.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// A directory could not be created.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the `.intentwise` root, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

/// Directory for per-launch log files.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("logs"))
}

/// Default directory for the artifact, metrics and feedback log.
pub fn store_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("store"))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
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
    if let Ok(path) = std::env::var(CONFIG_HOME_ENV) {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
static OVERRIDE_USERS: Mutex<()> = Mutex::new(());

/// Scoped override of the base directory, cleared on drop. Holders are
/// serialized so parallel tests never see each other's base.
#[cfg(test)]
pub(crate) struct BaseDirGuard {
    _exclusive: std::sync::MutexGuard<'static, ()>,
}

#[cfg(test)]
impl BaseDirGuard {
    pub(crate) fn set(path: PathBuf) -> Self {
        let exclusive = OVERRIDE_USERS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut guard = BASE_OVERRIDE.lock().expect("base override mutex poisoned");
        *guard = Some(path);
        Self {
            _exclusive: exclusive,
        }
    }
}

#[cfg(test)]
impl Drop for BaseDirGuard {
    fn drop(&mut self) {
        if let Ok(mut guard) = BASE_OVERRIDE.lock() {
            *guard = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn override_controls_every_directory() {
        let base = tempdir().unwrap();
        let _guard = BaseDirGuard::set(base.path().to_path_buf());
        let root = app_root_dir().unwrap();
        assert_eq!(root, base.path().join(APP_DIR_NAME));
        assert_eq!(logs_dir().unwrap(), root.join("logs"));
        assert!(store_dir().unwrap().is_dir());
    }
}
