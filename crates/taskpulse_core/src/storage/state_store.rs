//! Persistence for [`NotificationState`].
//!
//! The rotation cursor and last-emission timestamp survive restarts; the
//! "burst already shown" flag lives in a session file under the runtime
//! directory, which the OS wipes at logout.

use crate::error::AppError;
use crate::notifier::NotificationState;
use crate::storage::{app_dir, app_file, env_path, write_json};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const STATE_SCHEMA_VERSION: u32 = 1;
const STATE_FILE_NAME: &str = "notification_state.json";
const STATE_ENV_VAR: &str = "TASKPULSE_STATE_PATH";
const SESSION_FILE_NAME: &str = "session.json";
const SESSION_ENV_VAR: &str = "TASKPULSE_SESSION_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    schema_version: u32,
    #[serde(default)]
    last_notification_ms: Option<i64>,
    #[serde(default)]
    overdue_rotation_index: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    session_notifications_shown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    pub state: PathBuf,
    pub session: PathBuf,
}

impl StatePaths {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            state: app_file(STATE_ENV_VAR, STATE_FILE_NAME)?,
            session: session_path()?,
        })
    }
}

fn session_path() -> Result<PathBuf, AppError> {
    if let Some(path) = env_path(SESSION_ENV_VAR) {
        return Ok(path);
    }
    let user = ["USER", "USERNAME"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok());
    session_file(env_path("XDG_RUNTIME_DIR"), user.as_deref())
}

/// The runtime dir is already private to the user. Without one, the shared
/// temp dir gets a per-user file name, and the app dir is the last resort.
fn session_file(runtime_dir: Option<PathBuf>, user: Option<&str>) -> Result<PathBuf, AppError> {
    if let Some(runtime) = runtime_dir {
        return Ok(runtime.join("taskpulse").join(SESSION_FILE_NAME));
    }
    let user: String = user
        .unwrap_or_default()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        .collect();
    if user.is_empty() {
        return Ok(app_dir()?.join(SESSION_FILE_NAME));
    }
    Ok(std::env::temp_dir().join(format!("taskpulse-{user}-{SESSION_FILE_NAME}")))
}

#[derive(Debug, Clone)]
pub struct StateLoad {
    pub state: NotificationState,
    pub error: Option<AppError>,
}

pub fn load_state(paths: &StatePaths) -> Result<NotificationState, AppError> {
    let stored: Option<StoredState> = read_optional(&paths.state)?;
    let session: StoredSession = read_optional(&paths.session)?.unwrap_or_default();

    let Some(stored) = stored else {
        return Ok(NotificationState {
            session_notifications_shown: session.session_notifications_shown,
            ..NotificationState::default()
        });
    };

    if !(1..=STATE_SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    Ok(NotificationState {
        last_notification_ms: stored.last_notification_ms,
        overdue_rotation_index: stored.overdue_rotation_index,
        session_notifications_shown: session.session_notifications_shown,
    })
}

/// Unreadable state counts as a fresh login; the error is handed back for
/// reporting.
pub fn load_state_with_fallback(paths: &StatePaths) -> StateLoad {
    match load_state(paths) {
        Ok(state) => StateLoad { state, error: None },
        Err(err) => {
            warn!("notification state unreadable, starting fresh: {err}");
            StateLoad {
                state: NotificationState::default(),
                error: Some(err),
            }
        }
    }
}

pub fn save_state(paths: &StatePaths, state: &NotificationState) -> Result<(), AppError> {
    write_json(
        &paths.state,
        &StoredState {
            schema_version: STATE_SCHEMA_VERSION,
            last_notification_ms: state.last_notification_ms,
            overdue_rotation_index: state.overdue_rotation_index,
        },
    )?;
    write_json(
        &paths.session,
        &StoredSession {
            session_notifications_shown: state.session_notifications_shown,
        },
    )
}

pub fn clear_state(paths: &StatePaths) -> Result<(), AppError> {
    remove_if_present(&paths.state)?;
    remove_if_present(&paths.session)
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AppError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(AppError::io_at(path, err)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| AppError::invalid_data(format!("{}: {}", path.display(), err)))
}

fn remove_if_present(path: &Path) -> Result<(), AppError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AppError::io_at(path, err)),
    }
}
