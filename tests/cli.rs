mod common;

use std::fs;

use assert_cmd::Command;
use common::{SECOND_INTIMATION_KEYS, TestWorkspace, pending_body, second_intimation_rows};
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

fn desk(workspace: &TestWorkspace) -> Command {
    let mut cmd = Command::cargo_bin("intimation-desk").expect("binary exists");
    cmd.env_remove("INTIMATION_API_BASE")
        .env_remove("RUST_LOG")
        .arg("--state")
        .arg(workspace.path().join("settings.yaml"));
    cmd
}

fn write_feed(workspace: &TestWorkspace) -> std::path::PathBuf {
    let body = pending_body(&second_intimation_rows());
    workspace.write("feed.json", &body.to_string())
}

#[test]
fn classify_reports_roles_for_a_saved_feed() {
    let workspace = TestWorkspace::new();
    let feed = write_feed(&workspace);
    desk(&workspace)
        .args(["classify", "--kind", "second", "-i"])
        .arg(&feed)
        .assert()
        .success()
        .stdout(contains("ReadyForDispatchDate"))
        .stdout(contains("readiness-date"))
        .stdout(contains("final-delivery-date"))
        .stdout(contains("DispatchScheduleID").not());
}

#[test]
fn classify_json_uses_minus_one_for_missing_roles() {
    let workspace = TestWorkspace::new();
    let feed = write_feed(&workspace);
    let output = desk(&workspace)
        .args(["classify", "--json", "-i"])
        .arg(&feed)
        .output()
        .expect("run classify");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["visibleColumns"], 10);
    assert_eq!(report["roles"]["final-delivery-date"], 9);
    // First intimations place cartons at fixed positions past this feed's width.
    assert_eq!(report["roles"]["carton-count"], -1);
    assert_eq!(report["roles"]["readiness-date"], -1);
    assert_eq!(report["columns"][0]["key"], "OrderBookingDetailsID");
}

#[test]
fn classify_honours_hidden_trailing_and_reports_drift() {
    let workspace = TestWorkspace::new();
    let feed = write_feed(&workspace);
    let output = desk(&workspace)
        .args(["--hidden-trailing", "0", "--expected-columns", "12", "classify", "--json", "-i"])
        .arg(&feed)
        .output()
        .expect("run classify");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["visibleColumns"], SECOND_INTIMATION_KEYS.len());
    assert_eq!(report["drift"]["expected"], 12);
    assert_eq!(report["drift"]["found"], 15);
}

#[test]
fn classify_reads_csv_exports() {
    let workspace = TestWorkspace::new();
    let feed = workspace.write(
        "feed.csv",
        "OrderBookingDetailsID,JobName,ClientName,OrderDate,DeliverySchedule\n1,Labels,Acme,2024-01-01,2024-02-01\n",
    );
    desk(&workspace)
        .args(["--hidden-trailing", "0", "classify", "-i"])
        .arg(&feed)
        .assert()
        .success()
        .stdout(contains("Delivery Schedule"))
        .stdout(contains("final-delivery-date"));
}

#[test]
fn classify_rejects_an_empty_feed() {
    let workspace = TestWorkspace::new();
    let feed = workspace.write("feed.json", "[]");
    desk(&workspace)
        .args(["classify", "-i"])
        .arg(&feed)
        .assert()
        .failure()
        .stderr(contains("No pending jobs data available"));
}

#[test]
fn config_round_trip_without_network() {
    let workspace = TestWorkspace::new();
    desk(&workspace)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("(not signed in)"))
        .stdout(contains("https://cdcapi.onrender.com/api/ (default)"));

    desk(&workspace)
        .args(["config", "set-api-base", "http://localhost:3001/api"])
        .assert()
        .success()
        .stdout(contains("http://localhost:3001/api/"));
    let stored = fs::read_to_string(workspace.path().join("settings.yaml")).expect("settings");
    assert!(stored.contains("whatsapp_api_base"));

    desk(&workspace)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("http://localhost:3001/api/ (stored)"));

    desk(&workspace)
        .args(["config", "clear-api-base"])
        .assert()
        .success();
    desk(&workspace)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(contains("(default)"));
}

#[test]
fn config_rejects_relative_api_base() {
    let workspace = TestWorkspace::new();
    desk(&workspace)
        .args(["config", "set-api-base", "localhost/api"])
        .assert()
        .failure()
        .stderr(contains("not an absolute http:// or https:// URL"));
}

#[test]
fn commands_needing_a_user_fail_before_any_request() {
    let workspace = TestWorkspace::new();
    desk(&workspace)
        .args(["--api-base", "http://127.0.0.1:9/api/", "pending"])
        .assert()
        .failure()
        .stderr(contains("User not logged in"));
}

#[test]
fn login_rejects_blank_username() {
    let workspace = TestWorkspace::new();
    desk(&workspace)
        .args(["login", "   "])
        .assert()
        .failure()
        .stderr(contains("Please select a username"));
}

#[test]
fn send_rejects_edits_with_unknown_fields() {
    let workspace = TestWorkspace::new();
    desk(&workspace)
        .args(["send", "--all", "--edit", "101:colour=red"])
        .assert()
        .failure()
        .stderr(contains("Unknown edit field"));
}
