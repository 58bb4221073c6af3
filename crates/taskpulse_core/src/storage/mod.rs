pub mod json_store;
pub mod state_store;

use crate::error::AppError;
use serde::Serialize;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "taskpulse";

/// Per-user application directory (`%APPDATA%\taskpulse` or
/// `$HOME/.config/taskpulse`).
pub fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

/// `env_var` when set and non-blank, otherwise `file_name` in [`app_dir`].
pub fn app_file(env_var: &str, file_name: &str) -> Result<PathBuf, AppError> {
    if let Some(path) = env_path(env_var) {
        return Ok(path);
    }
    Ok(app_dir()?.join(file_name))
}

pub(crate) fn env_path(env_var: &str) -> Option<PathBuf> {
    std::env::var(env_var)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

/// Pretty JSON, parent directories created, owner-only permissions on unix.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io_at(parent, err))?;
    }

    let content = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io_at(path, err))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io_at(path, err))?;
    }

    Ok(())
}
