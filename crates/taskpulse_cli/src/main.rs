use clap::{CommandFactory, Parser};
use log::{debug, warn};
use std::io::{self, BufRead};
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskpulse_cli::cli::{Cli, Command, collect_config_overrides};
use taskpulse_core::analytics::{DayProgress, task_stats, weekly_progress};
use taskpulse_core::classify::{Bucket, Buckets, ViewScope, bucket_of, classify, classify_all};
use taskpulse_core::config::{
    Config, Palette, load_config_with_fallback, merge_overrides, palette_for_theme,
};
use taskpulse_core::error::AppError;
use taskpulse_core::model::{Task, TaskPriority, TaskStatus};
use taskpulse_core::notifier::{DisplayQueue, NotificationRecord, Severity};
use taskpulse_core::schedule::SchedulePolicy;
use taskpulse_core::watch_api::{self, TickReport};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Per-process state. The display queue outlives single commands in the
/// interactive session.
struct Runtime {
    config: Config,
    display: DisplayQueue,
}

/// Everything one command needs, resolved from config plus its flags.
struct Settings {
    config: Config,
    policy: SchedulePolicy,
    palette: Palette,
    now: OffsetDateTime,
    json: bool,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: &'static str,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Progress")]
    progress: String,
}

impl TaskRow {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            priority: priority_label(task.priority),
            due: task.due_date.clone().unwrap_or_else(|| "-".to_string()),
            window: time_window(task),
            progress: format!("{}%", task.completion_percent()),
        }
    }
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Day")]
    label: &'static str,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Completed")]
    completed: usize,
    #[tabled(rename = "Incomplete")]
    incomplete: usize,
}

fn priority_label(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
        TaskPriority::Urgent => "urgent",
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "todo",
        TaskStatus::InProgress => "in progress",
        TaskStatus::Completed => "completed",
    }
}

fn time_window(task: &Task) -> String {
    match (task.start_time.as_deref(), task.end_time.as_deref()) {
        (Some(start), Some(end)) => format!("{start}-{end}"),
        (Some(start), None) => format!("{start}-"),
        (None, Some(end)) => format!("-{end}"),
        (None, None) => "-".to_string(),
    }
}

fn format_date(date: Date) -> Result<String, AppError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "title": task.title,
        "status": task.status,
        "priority": task.priority,
        "due_date": task.due_date,
        "start_time": task.start_time,
        "end_time": task.end_time,
        "completion_percent": task.completion_percent(),
    })
}

fn print_buckets_plain(buckets: &Buckets<'_>, palette: &Palette) {
    for bucket in Bucket::ALL {
        let tasks = buckets.get(bucket);
        let heading = format!("{} ({})", bucket.label(), tasks.len());
        let heading = match bucket {
            Bucket::Overdue => palette.alertize(&heading),
            Bucket::DueSoon | Bucket::Upcoming => palette.accentize(&heading),
        };
        println!("{heading}");

        if tasks.is_empty() {
            println!("{}", palette.mutedize("  (none)"));
        } else {
            let rows = tasks.iter().map(|task| TaskRow::from_task(task));
            println!("{}", Table::new(rows).with(Style::sharp()));
        }
    }
}

fn print_buckets_json(buckets: &Buckets<'_>, scope: &str) {
    let group = |bucket: Bucket| {
        serde_json::Value::Array(buckets.get(bucket).iter().map(|task| task_json(task)).collect())
    };
    let json = serde_json::json!({
        "scope": scope,
        "overdue": group(Bucket::Overdue),
        "due_soon": group(Bucket::DueSoon),
        "upcoming": group(Bucket::Upcoming),
    });
    println!("{}", json);
}

fn print_records_plain(records: &[NotificationRecord], palette: &Palette) {
    for record in records {
        let title = format!("[{}]", record.title);
        let title = match record.severity {
            Severity::Danger => palette.alertize(&title),
            Severity::Warning => palette.accentize(&title),
        };
        println!("{} {} ({})", title, record.message, record.id);
    }
}

fn print_tick(report: &TickReport, settings: &Settings) {
    for failure in &report.failures {
        eprintln!("WARN: notification {} failed: {}", failure.record_id, failure.error);
    }
    if let Some(err) = &report.state_error {
        eprintln!("WARN: {}", err);
    }

    if settings.json {
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|failure| {
                serde_json::json!({
                    "record_id": failure.record_id,
                    "code": failure.error.code(),
                    "message": failure.error.message(),
                })
            })
            .collect();
        let json = serde_json::json!({
            "emissions": report.outcome.emissions,
            "display": report.outcome.display,
            "state": report.outcome.next_state,
            "failures": failures,
        });
        println!("{}", json);
    } else if report.outcome.emissions.is_empty() {
        println!("{}", settings.palette.mutedize("No new reminders."));
    } else {
        print_records_plain(&report.outcome.emissions, &settings.palette);
    }
}

fn print_stats(tasks: &[Task], settings: &Settings) -> Result<(), AppError> {
    let stats = task_stats(tasks, settings.now, &settings.policy);
    let today = settings.policy.today(settings.now);
    let week = weekly_progress(tasks, today, settings.policy.reference_offset);

    if settings.json {
        let mut days = Vec::with_capacity(week.len());
        for day in &week {
            days.push(serde_json::json!({
                "label": day.label,
                "date": format_date(day.date)?,
                "completed": day.completed,
                "incomplete": day.incomplete,
            }));
        }
        let json = serde_json::json!({ "stats": stats, "weekly": days });
        println!("{}", json);
        return Ok(());
    }

    println!("Total tasks:      {}", stats.total);
    println!("Completed:        {}", stats.completed);
    println!("Remaining:        {}", stats.remaining);
    println!("Overdue:          {}", stats.overdue);
    println!("Completion rate:  {}%", stats.completion_rate);
    println!(
        "Productivity:     {}/100 {} ({})",
        stats.productivity_score,
        settings.palette.accentize(stats.strength.label()),
        stats.strength.message()
    );

    let rows = week
        .iter()
        .map(day_row)
        .collect::<Result<Vec<_>, AppError>>()?;
    println!("{}", Table::new(rows).with(Style::sharp()));
    Ok(())
}

fn day_row(day: &DayProgress) -> Result<DayRow, AppError> {
    Ok(DayRow {
        label: day.label,
        date: format_date(day.date)?,
        completed: day.completed,
        incomplete: day.incomplete,
    })
}

fn print_task(task: &Task, settings: &Settings) {
    let bucket = bucket_of(task, settings.now, ViewScope::All, &settings.policy);

    if settings.json {
        let mut json = task_json(task);
        json["description"] = serde_json::json!(task.description);
        json["category"] = serde_json::json!(task.category);
        json["bucket"] = serde_json::json!(bucket);
        println!("{}", json);
        return;
    }

    println!("{} ({})", task.title, task.id);
    if let Some(description) = task.description.as_deref() {
        println!("  {}", description);
    }
    println!("  status:   {}", status_label(task.status));
    println!("  priority: {}", priority_label(task.priority));
    println!("  due:      {}", task.due_date.as_deref().unwrap_or("-"));
    println!("  window:   {}", time_window(task));
    println!("  progress: {}%", task.completion_percent());
    for subtask in &task.subtasks {
        let mark = if subtask.completed { "x" } else { " " };
        println!("    [{}] {}", mark, subtask.title);
    }
    if let Some(bucket) = bucket {
        println!("  bucket:   {}", bucket.label());
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

impl Runtime {
    fn load() -> Self {
        let loaded = load_config_with_fallback();
        if let Some(err) = loaded.error {
            warn!("using default config: {err}");
        }
        Self {
            config: loaded.config,
            display: DisplayQueue::default(),
        }
    }

    fn settings(&self, cli: &Cli) -> Result<Settings, AppError> {
        let overrides =
            collect_config_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
        let config = merge_overrides(&self.config, &overrides);
        let policy = config.schedule_policy()?;
        let palette = palette_for_theme(config.theme.as_deref());
        let now = match cli.now {
            Some(now) => policy.check_instant(now).ok_or_else(|| {
                AppError::invalid_input("--now is outside the supported date range")
            })?,
            None => OffsetDateTime::now_utc(),
        };
        Ok(Settings {
            config,
            policy,
            palette,
            now,
            json: cli.json,
        })
    }

    fn run_command(&mut self, cli: Cli) -> Result<(), AppError> {
        let settings = self.settings(&cli)?;

        match cli.command {
            Command::Buckets { date, all } => {
                let tasks = watch_api::load_snapshot()?;
                let (buckets, scope) = if all {
                    (
                        classify_all(&tasks, settings.now, &settings.policy),
                        "all".to_string(),
                    )
                } else {
                    let day = date.unwrap_or_else(|| settings.policy.today(settings.now));
                    (
                        classify(&tasks, settings.now, Some(day), &settings.policy),
                        format_date(day)?,
                    )
                };
                if settings.json {
                    print_buckets_json(&buckets, &scope);
                } else {
                    println!("{}", settings.palette.mutedize(&format!("Tasks for {scope}")));
                    print_buckets_plain(&buckets, &settings.palette);
                }
            }
            Command::Show { id } => {
                let tasks = watch_api::load_snapshot()?;
                let task = watch_api::find_task(&tasks, &id)?;
                print_task(task, &settings);
            }
            Command::Tick => {
                let report = watch_api::run_tick(settings.now, &settings.policy)?;
                self.display.apply(&report.outcome);
                print_tick(&report, &settings);
            }
            Command::Watch { interval, ticks } => self.watch(&settings, interval, ticks, cli.now)?,
            Command::Logout => {
                let state = watch_api::logout()?;
                self.display = DisplayQueue::default();
                if settings.json {
                    println!("{}", serde_json::json!({ "state": state }));
                } else {
                    println!("Logged out; reminder state reset.");
                }
            }
            Command::Stats => {
                let tasks = watch_api::load_snapshot()?;
                print_stats(&tasks, &settings)?;
            }
            Command::Displayed => {
                let records = self.display.records();
                if settings.json {
                    println!("{}", serde_json::json!(records));
                } else if records.is_empty() {
                    println!("{}", settings.palette.mutedize("No reminders on screen."));
                } else {
                    print_records_plain(records, &settings.palette);
                }
            }
            Command::Dismiss { id } => {
                let record = self
                    .display
                    .dismiss(id.trim())
                    .ok_or_else(|| AppError::invalid_input("notification not found"))?;
                if settings.json {
                    println!("{}", serde_json::json!(record));
                } else {
                    println!("Dismissed: {}", record.id);
                }
            }
        }

        Ok(())
    }

    fn watch(
        &mut self,
        settings: &Settings,
        interval: Option<u64>,
        ticks: Option<u64>,
        simulated: Option<OffsetDateTime>,
    ) -> Result<(), AppError> {
        if simulated.is_some() && ticks.is_none() {
            return Err(AppError::invalid_input("watch --now requires --ticks"));
        }
        let interval = interval
            .map(Duration::from_secs)
            .unwrap_or_else(|| settings.config.tick_interval());
        let step = time::Duration::try_from(interval)
            .map_err(|_| AppError::invalid_input("watch interval is too large"))?;
        let mut clock = simulated;
        let mut count = 0u64;

        loop {
            let now = clock.unwrap_or_else(OffsetDateTime::now_utc);
            let report = watch_api::run_tick(now, &settings.policy)?;
            self.display.apply(&report.outcome);
            print_tick(&report, settings);
            count += 1;

            if ticks.is_some_and(|limit| count >= limit) {
                break;
            }
            match clock {
                Some(instant) => {
                    let next = instant
                        .checked_add(step)
                        .and_then(|next| settings.policy.check_instant(next))
                        .ok_or_else(|| {
                            AppError::invalid_input("simulated clock left the supported date range")
                        })?;
                    clock = Some(next);
                }
                None => std::thread::sleep(interval),
            }
            debug!("watch tick {count} done, next in {interval:?}");
        }

        Ok(())
    }
}

fn run_interactive(runtime: &mut Runtime) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskpulse".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = runtime.run_command(cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut runtime = Runtime::load();
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive(&mut runtime) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if !err.use_stderr() {
                let _ = err.print();
                return;
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
