use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn plan_cmd(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("plan").expect("binary");
    cmd.env_remove("RUST_LOG").arg("--db").arg(db);
    cmd
}

#[test]
fn plan_help_works() {
    Command::cargo_bin("plan")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Hierarchical project plan"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "add",
        "update",
        "delete",
        "list",
        "view",
        "gantt",
        "portfolio",
        "projects",
        "new-project",
        "set-status",
        "recompute",
        "export",
        "import",
        "backup",
    ];

    for cmd in subcommands {
        Command::cargo_bin("plan")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn add_child_extends_parent_and_gantt_renders() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("demo_tasks.json");

    plan_cmd(&db)
        .args(["add", "Launch", "--start", "2025-01-01", "--end", "2025-01-10"])
        .assert()
        .success()
        .stdout(contains("Added TASK1 Launch"));

    plan_cmd(&db)
        .args(["add", "Prep", "--parent", "TASK1", "--start", "2025-01-05", "--end", "2025-01-20"])
        .args(["--completion", "50"])
        .assert()
        .success()
        .stdout(contains("Added TASK1.1 Prep"))
        .stdout(contains("Updated ancestors: TASK1"));

    plan_cmd(&db)
        .args(["view", "TASK1"])
        .assert()
        .success()
        .stdout(contains("2025-01-20"))
        .stdout(contains("Completion:   50%"));

    plan_cmd(&db)
        .args(["gantt", "--scale", "weeks"])
        .assert()
        .success()
        .stdout(contains("Weeks timeline"))
        .stdout(contains("TASK1.1 Prep"));

    plan_cmd(&db)
        .args(["gantt", "--json"])
        .assert()
        .success()
        .stdout(contains("\"layout\": \"chart\""));
}

#[test]
fn validation_errors_exit_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("demo_tasks.json");

    plan_cmd(&db)
        .args(["add", "Orphan", "--id", "TASK3.1"])
        .assert()
        .failure()
        .stderr(contains("Parent task 'TASK3' does not exist"));

    plan_cmd(&db)
        .args(["add", "Backwards", "--start", "2025-02-01", "--end", "2025-01-01"])
        .assert()
        .failure()
        .stderr(contains("after end date"));

    plan_cmd(&db)
        .args(["add", "Bad", "--start", "someday"])
        .assert()
        .failure()
        .stderr(contains("unrecognised date"));

    plan_cmd(&db)
        .args(["add", "Far", "--start", "in 99999999d"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("unrecognised date"));
}

#[test]
fn delete_requires_cascade_for_parents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("demo_tasks.json");

    plan_cmd(&db).args(["add", "Parent"]).assert().success();
    plan_cmd(&db).args(["add", "Child", "--parent", "TASK1"]).assert().success();

    plan_cmd(&db)
        .args(["delete", "TASK1"])
        .assert()
        .failure()
        .stderr(contains("--cascade"));

    plan_cmd(&db)
        .args(["delete", "TASK1", "--cascade"])
        .assert()
        .success()
        .stdout(contains("Deleted TASK1, TASK1.1"));

    plan_cmd(&db).arg("list").assert().success().stdout(contains("No tasks."));
}

#[test]
fn export_import_round_trip_through_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("demo_tasks.json");
    let csv = dir.path().join("plan.csv");

    fs::write(
        &csv,
        "Task ID,Task Name,Resource,Workstream,Start Date,End Date,Completion %\n\
         TASK1.1,Child,Ann,Core,2025-03-01,2025-03-31,100%\n\
         TASK1,Parent,,Core,10/03/2025,15/03/2025,\n",
    )
    .expect("write csv");

    plan_cmd(&db)
        .arg("import")
        .arg(&csv)
        .assert()
        .success()
        .stdout(contains("2 task(s) added, 0 updated"));

    let out = dir.path().join("out.csv");
    plan_cmd(&db).arg("export").arg("--output").arg(&out).assert().success();
    let exported = fs::read_to_string(&out).expect("read export");
    assert!(exported.contains("TASK1,Parent,,Core,2025-03-01,2025-03-31,100"));

    plan_cmd(&db).args(["list", "--tree"]).assert().success().stdout(contains("  Child"));
}

#[test]
fn failed_import_leaves_database_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("demo_tasks.json");
    let csv = dir.path().join("bad.csv");

    plan_cmd(&db).args(["add", "Existing"]).assert().success();
    let before = fs::read_to_string(&db).expect("read db");

    fs::write(
        &csv,
        "Task ID,Task Name,Resource,Workstream,Start Date,End Date,Completion %\n\
         TASK2,Fine,,,,,\n\
         TASK2.1.1.1,Too deep,,,,,\n",
    )
    .expect("write csv");

    plan_cmd(&db)
        .arg("import")
        .arg(&csv)
        .arg("--no-backup")
        .assert()
        .failure()
        .stderr(contains("line 3"));

    assert_eq!(fs::read_to_string(&db).expect("read db"), before);
}

#[test]
fn projects_and_portfolio_share_data_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let alpha = dir.path().join("alpha_tasks.json");

    plan_cmd(&alpha)
        .args(["add", "Kickoff", "--start", "2025-01-01", "--end", "2025-01-03"])
        .assert()
        .success();
    plan_cmd(&alpha).args(["set-status", "on-hold"]).assert().success();
    plan_cmd(&alpha).args(["new-project", "Beta"]).assert().success();

    plan_cmd(&alpha)
        .arg("projects")
        .assert()
        .success()
        .stdout(contains("alpha").and(contains("On-Hold")).and(contains("beta")));

    plan_cmd(&alpha)
        .args(["portfolio", "--json"])
        .assert()
        .success()
        .stdout(contains("\"group_key\": \"On-Hold\""));
}
