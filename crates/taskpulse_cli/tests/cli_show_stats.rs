use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const NOW: &str = "2024-05-01T09:00:00+08:00";

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskpulse-{nanos}-{file_name}"))
}

fn write_store(name: &str) -> PathBuf {
    let store_path = temp_path(name);
    let content = serde_json::json!({
        "schema_version": 1,
        "tasks": [
            {
                "id": "t1",
                "title": "quarterly report",
                "description": "numbers for Q1",
                "priority": "HIGH",
                "category": "WORK",
                "due_date": "2024-04-29",
                "updated_at": "2024-04-28T10:00:00+08:00",
                "subtasks": [
                    { "title": "draft", "completed": true },
                    { "title": "review", "completed": true }
                ]
            },
            { "id": "t2", "title": "call plumber", "due_date": "2024-04-28" },
            {
                "id": "t3",
                "title": "groceries",
                "priority": "LOW",
                "category": "SHOPPING",
                "dueDate": "2024-05-02",
                "startTime": "17:00",
                "endTime": "18:00",
                "subtasks": [
                    { "title": "list", "completed": true },
                    { "title": "shop", "completed": false }
                ]
            },
            { "id": "t4", "title": "read a book" }
        ]
    });
    std::fs::write(&store_path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
    store_path
}

fn run(store_path: &PathBuf, args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_taskpulse");
    Command::new(exe)
        .args(args)
        .env("TASKPULSE_STORE_PATH", store_path)
        .env("TASKPULSE_CONFIG_PATH", temp_path("missing-config.json"))
        .env("TASKPULSE_DISABLE_NOTIFICATIONS", "1")
        .output()
        .expect("failed to run taskpulse")
}

#[test]
fn show_plain_text_prints_details() {
    let store_path = write_store("cli-show-plain.json");
    let output = run(&store_path, &["show", "t3", "--now", NOW]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("groceries (t3)"));
    assert!(stdout.contains("priority: low"));
    assert!(stdout.contains("window:   17:00-18:00"));
    assert!(stdout.contains("progress: 50%"));
    assert!(stdout.contains("[x] list"));
    assert!(stdout.contains("[ ] shop"));
    assert!(stdout.contains("bucket:   Upcoming"));
}

#[test]
fn show_json_includes_bucket() {
    let store_path = write_store("cli-show-json.json");
    let output = run(&store_path, &["show", "t2", "--json", "--now", NOW]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["id"], "t2");
    assert_eq!(json["bucket"], "overdue");
    assert_eq!(json["priority"], "MEDIUM");
    assert_eq!(json["completion_percent"], 0);
}

#[test]
fn show_completed_task_has_no_bucket() {
    let store_path = write_store("cli-show-done.json");
    let output = run(&store_path, &["show", "t1", "--json", "--now", NOW]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["completion_percent"], 100);
    assert!(json["bucket"].is_null());
    assert_eq!(json["category"], "WORK");
}

#[test]
fn show_unknown_task_fails() {
    let store_path = write_store("cli-show-missing.json");
    let output = run(&store_path, &["show", "nope"]);
    std::fs::remove_file(&store_path).ok();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input - task not found"));
}

#[test]
fn stats_json_reports_scores_and_week() {
    let store_path = write_store("cli-stats-json.json");
    let output = run(&store_path, &["stats", "--json", "--now", NOW]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let stats = &json["stats"];
    assert_eq!(stats["total"], 4);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["remaining"], 3);
    assert_eq!(stats["overdue"], 1);
    assert_eq!(stats["completion_rate"], 25);
    assert_eq!(stats["productivity_score"], 63);
    assert_eq!(stats["strength"], "good");

    let week = json["weekly"].as_array().unwrap();
    assert_eq!(week.len(), 7);
    assert_eq!(week[0]["label"], "Mon");
    assert_eq!(week[0]["date"], "2024-04-29");
    assert_eq!(week[0]["completed"], 1);
    assert_eq!(week[3]["date"], "2024-05-02");
    assert_eq!(week[3]["incomplete"], 1);
    assert_eq!(week[6]["date"], "2024-05-05");
}

#[test]
fn stats_plain_text_prints_summary_and_table() {
    let store_path = write_store("cli-stats-plain.json");
    let output = run(&store_path, &["stats", "--now", NOW]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Total tasks:      4"));
    assert!(stdout.contains("Completion rate:  25%"));
    assert!(stdout.contains("63/100 Good"));
    assert!(stdout.contains("Mon"));
    assert!(stdout.contains("2024-05-05"));
}

#[test]
fn missing_store_means_no_tasks() {
    let store_path = temp_path("cli-stats-missing.json");
    let output = run(&store_path, &["stats", "--json", "--now", NOW]);

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stats"]["total"], 0);
    assert_eq!(json["stats"]["productivity_score"], 0);
    assert!(!store_path.exists());
}
