use crate::error::AppError;
use crate::schedule::{
    DEFAULT_DUE_SOON_WINDOW_MINUTES, DEFAULT_REFERENCE_OFFSET, DEFAULT_REMINDER_COOLDOWN_SECONDS,
    SchedulePolicy,
};
use crate::storage::app_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Duration, UtcOffset};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKPULSE_CONFIG_PATH";
pub const DEFAULT_TICK_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub alert: &'static str,
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        self.paint(self.accent, text)
    }

    pub fn alertize(&self, text: &str) -> String {
        self.paint(self.alert, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        self.paint(self.muted, text)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{}{}{}", color, text, self.reset)
        }
    }
}

pub fn palette_for_theme(theme: Option<&str>) -> Palette {
    match theme.and_then(canonical_theme_name).as_deref() {
        Some("noir") => Palette {
            accent: "\x1b[38;5;208m",
            alert: "\x1b[38;5;196m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        Some("solarized") => Palette {
            accent: "\x1b[38;5;108m",
            alert: "\x1b[38;5;160m",
            muted: "\x1b[38;5;250m",
            reset: "\x1b[0m",
        },
        _ => Palette {
            accent: "",
            alert: "",
            muted: "",
            reset: "",
        },
    }
}

pub fn canonical_theme_name(raw: &str) -> Option<String> {
    let cleaned = canonical_key(raw);
    if cleaned.is_empty() {
        return Some("default".into());
    }

    match cleaned.as_str() {
        "vanilla" | "light" => Some("default".to_string()),
        "dark" | "dark_mode" | "darkmode" => Some("noir".to_string()),
        other => Some(other.to_string()),
    }
}

/// Lowercases and collapses every run of non-alphanumerics into `_`.
pub fn canonical_key(raw: &str) -> String {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    cleaned.trim_matches('_').to_string()
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    /// Fixed offset of the operating timezone, e.g. `+08:00`.
    #[serde(default)]
    pub reference_offset: Option<String>,
    #[serde(default)]
    pub due_soon_window_minutes: Option<i64>,
    #[serde(default)]
    pub reminder_cooldown_seconds: Option<i64>,
    #[serde(default)]
    pub tick_interval_seconds: Option<u64>,
}

impl Config {
    pub fn schedule_policy(&self) -> Result<SchedulePolicy, AppError> {
        let reference_offset = match self.reference_offset.as_deref() {
            Some(raw) => parse_reference_offset(raw)?,
            None => DEFAULT_REFERENCE_OFFSET,
        };
        let window = positive(
            self.due_soon_window_minutes,
            DEFAULT_DUE_SOON_WINDOW_MINUTES,
            "due_soon_window_minutes",
        )?;
        let cooldown = positive(
            self.reminder_cooldown_seconds,
            DEFAULT_REMINDER_COOLDOWN_SECONDS,
            "reminder_cooldown_seconds",
        )?;
        let due_soon_window = window
            .checked_mul(60)
            .map(Duration::seconds)
            .ok_or_else(|| {
                AppError::invalid_data(format!(
                    "due_soon_window_minutes is too large, got {window}"
                ))
            })?;

        Ok(SchedulePolicy {
            reference_offset,
            due_soon_window,
            reminder_cooldown: Duration::seconds(cooldown),
            ..SchedulePolicy::default()
        })
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        let seconds = self
            .tick_interval_seconds
            .filter(|seconds| *seconds > 0)
            .unwrap_or(DEFAULT_TICK_INTERVAL_SECONDS);
        std::time::Duration::from_secs(seconds)
    }
}

fn positive(value: Option<i64>, default: i64, field: &str) -> Result<i64, AppError> {
    match value {
        None => Ok(default),
        Some(value) if value > 0 => Ok(value),
        Some(value) => Err(AppError::invalid_data(format!(
            "{field} must be positive, got {value}"
        ))),
    }
}

/// Parses `+HH:MM` / `-HH:MM`; `Z` and `UTC` mean zero offset.
pub fn parse_reference_offset(raw: &str) -> Result<UtcOffset, AppError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        trimmed,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| {
        AppError::invalid_data(format!(
            "reference_offset must look like +08:00, got '{trimmed}'"
        ))
    })
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub reference_offset: Option<String>,
    pub due_soon_window_minutes: Option<i64>,
    pub reminder_cooldown_seconds: Option<i64>,
    pub tick_interval_seconds: Option<u64>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    app_file(CONFIG_ENV_VAR, CONFIG_FILE_NAME)
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path).map_err(|err| AppError::io_at(path, err))?;
    let mut config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.theme = config.theme.and_then(|name| canonical_theme_name(&name));
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(normalized) = overrides.theme.as_deref().and_then(canonical_theme_name) {
        merged.theme = Some(normalized);
    }
    if let Some(offset) = overrides.reference_offset.as_ref() {
        merged.reference_offset = Some(offset.clone());
    }
    if overrides.due_soon_window_minutes.is_some() {
        merged.due_soon_window_minutes = overrides.due_soon_window_minutes;
    }
    if overrides.reminder_cooldown_seconds.is_some() {
        merged.reminder_cooldown_seconds = overrides.reminder_cooldown_seconds;
    }
    if overrides.tick_interval_seconds.is_some() {
        merged.tick_interval_seconds = overrides.tick_interval_seconds;
    }

    merged
}
