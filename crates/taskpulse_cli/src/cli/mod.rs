use clap::{Parser, Subcommand};
use taskpulse_core::config::{ConfigOverrides, canonical_key};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Evaluate as if the current instant were this RFC 3339 timestamp
    #[arg(long, value_name = "RFC3339", value_parser = parse_instant, global = true)]
    pub now: Option<OffsetDateTime>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show tasks grouped into overdue, due soon and upcoming
    ///
    /// Example: taskpulse buckets
    /// Example: taskpulse buckets --date 2024-05-02
    /// Example: taskpulse buckets --all
    Buckets {
        /// Calendar day to classify (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        date: Option<Date>,
        /// Classify every dated task instead of a single day
        #[arg(long, conflicts_with = "date")]
        all: bool,
    },
    /// Show details of a task
    ///
    /// Example: taskpulse show task-1
    Show { id: String },
    /// Run one reminder tick and deliver its notifications
    ///
    /// Example: taskpulse tick
    Tick,
    /// Run reminder ticks on a fixed interval
    ///
    /// With --now the loop runs on a simulated clock and does not sleep.
    ///
    /// Example: taskpulse watch
    /// Example: taskpulse watch --interval 30 --ticks 10
    Watch {
        /// Seconds between ticks (defaults to the configured interval)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
        /// Stop after this many ticks (required with --now)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
    },
    /// Forget reminder state so the next tick starts a fresh session
    ///
    /// Example: taskpulse logout
    Logout,
    /// Show completion statistics and this week's progress
    ///
    /// Example: taskpulse stats
    Stats,
    /// List reminders currently on screen
    ///
    /// Example: taskpulse displayed
    Displayed,
    /// Hide one reminder from the screen
    ///
    /// Example: taskpulse dismiss overdue-task-1-1714525200000
    Dismiss { id: String },
}

fn parse_instant(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|_| format!("'{raw}' is not an RFC 3339 timestamp"))
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| format!("'{raw}' is not a YYYY-MM-DD date"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    ReferenceOffset,
    DueSoonWindowMinutes,
    ReminderCooldownSeconds,
    TickIntervalSeconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let key = canonical_key(key_raw);
    if key.is_empty() {
        return Err("override key cannot be empty".to_string());
    }

    let target = match key.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "reference_offset" | "offset" => ConfigOverrideTarget::ReferenceOffset,
        "due_soon_window_minutes" | "due_soon_window" => {
            ConfigOverrideTarget::DueSoonWindowMinutes
        }
        "reminder_cooldown_seconds" | "reminder_cooldown" | "cooldown" => {
            ConfigOverrideTarget::ReminderCooldownSeconds
        }
        "tick_interval_seconds" | "tick_interval" => ConfigOverrideTarget::TickIntervalSeconds,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

/// Folds every `--config-override` argument into one set; later keys win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::ReferenceOffset => {
                overrides.reference_offset = Some(parsed.value)
            }
            ConfigOverrideTarget::DueSoonWindowMinutes => {
                overrides.due_soon_window_minutes =
                    Some(parse_number(&parsed.value, "due_soon_window_minutes")?)
            }
            ConfigOverrideTarget::ReminderCooldownSeconds => {
                overrides.reminder_cooldown_seconds =
                    Some(parse_number(&parsed.value, "reminder_cooldown_seconds")?)
            }
            ConfigOverrideTarget::TickIntervalSeconds => {
                overrides.tick_interval_seconds =
                    Some(parse_number(&parsed.value, "tick_interval_seconds")?)
            }
        }
    }
    Ok(overrides)
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("{field} expects a number, got '{value}'"))
}
