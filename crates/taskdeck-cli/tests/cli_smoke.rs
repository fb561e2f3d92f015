use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn taskdeck(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskdeck"))
        .arg("--data")
        .arg(data_dir)
        .args(args)
        .env("TASKDECK_CONFIG", "/dev/null")
        .env("TASKDECK_TIMEZONE", "UTC")
        .env_remove("RUST_LOG")
        .output()
        .expect("run taskdeck binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn list_requires_a_session() {
    let temp = tempdir().expect("tempdir");
    let output = taskdeck(temp.path(), &["list"]);

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Failed to fetch tasks. Please make sure you're authenticated."));
    assert!(err.contains("error: failed to fetch tasks: no signed-in user"));
    assert_eq!(err.matches("no signed-in user").count(), 1);
}

#[test]
fn add_toggle_and_report() {
    let temp = tempdir().expect("tempdir");

    let login = taskdeck(temp.path(), &["login", "Ana"]);
    assert!(login.status.success(), "login failed: {}", stderr(&login));
    assert_eq!(stdout(&taskdeck(temp.path(), &["whoami"])).trim(), "ana");

    let add = taskdeck(
        temp.path(),
        &["add", "Pay", "rent", "priority:high", "due:tomorrow", "category:Home"],
    );
    assert!(add.status.success(), "add failed: {}", stderr(&add));
    assert!(stderr(&add).contains("Task created successfully!"));
    let created = stdout(&add);
    let short_id = created
        .trim()
        .strip_prefix("Created task ")
        .and_then(|rest| rest.strip_suffix('.'))
        .expect("created line carries the id")
        .to_string();

    let list = stdout(&taskdeck(temp.path(), &["list", "--priority", "high"]));
    assert!(list.contains("Pay rent"));
    assert!(list.contains("Home"));

    let toggle = taskdeck(temp.path(), &["toggle", &short_id]);
    assert!(toggle.status.success(), "toggle failed: {}", stderr(&toggle));
    assert!(stdout(&toggle).starts_with("Completed task"));

    let completed = stdout(&taskdeck(temp.path(), &["list", "--status", "completed"]));
    assert!(completed.contains("Pay rent"));
    let pending = stdout(&taskdeck(temp.path(), &["list", "--status", "pending"]));
    assert!(pending.contains("No tasks found."));

    let categories = stdout(&taskdeck(temp.path(), &["categories"]));
    assert_eq!(categories.trim(), "Home");

    let dashboard = stdout(&taskdeck(temp.path(), &["dashboard"]));
    assert!(dashboard.contains("Total"));
    assert!(dashboard.contains("Streak         1 day"));

    let calendar = taskdeck(temp.path(), &["calendar", "--next", "--prev"]);
    assert!(calendar.status.success(), "calendar failed: {}", stderr(&calendar));
    assert!(stdout(&calendar).contains("Tasks this month:"));
}

#[test]
fn blank_title_is_reported_inline() {
    let temp = tempdir().expect("tempdir");
    assert!(taskdeck(temp.path(), &["login", "ana"]).status.success());

    let output = taskdeck(temp.path(), &["add", "priority:low"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("error: title is required"));
    assert!(!err.contains("Failed to create task."));
}

#[test]
fn notices_can_be_disabled() {
    let temp = tempdir().expect("tempdir");
    assert!(taskdeck(temp.path(), &["login", "ana"]).status.success());

    let output = taskdeck(temp.path(), &["--rc", "notify=off", "add", "Quiet", "task"]);
    assert!(output.status.success());
    assert!(!stderr(&output).contains("Task created successfully!"));
}
