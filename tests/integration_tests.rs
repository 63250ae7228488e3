//! Integration tests: CLI smoke tests and import-to-analytics scenarios run
//! against the built `agd` binary with an isolated config and database.

mod common;

use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;

use common::Sandbox;

fn rfc3339_minutes_ago(minutes: i64) -> String {
    (Utc::now() - Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ──────────────────── smoke ────────────────────

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: agd [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_json_reports_package_and_features() {
    let result = common::run_cli_case("version_json", &["version", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = result.json();
    assert_eq!(payload["binary"], "agd");
    assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
    let features = payload["features"].as_array().expect("features array");
    assert!(features.iter().any(|f| f == "cli"));
}

#[test]
fn unknown_subcommand_fails_with_usage_error() {
    let result = common::run_cli_case("unknown_subcommand", &["defrag"]);
    assert!(!result.status.success());
    assert!(result.stderr.contains("unrecognized subcommand"));
}

// ──────────────────── parse ────────────────────

#[test]
fn parse_duration_reports_minutes() {
    let result = common::run_cli_case("parse_duration", &["parse", "duration", "1h 30m", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = result.json();
    assert_eq!(payload["command"], "parse duration");
    assert_eq!(payload["minutes"].as_f64(), Some(90.0));
}

#[test]
fn parse_duration_rejects_garbage_with_user_exit_code() {
    let result = common::run_cli_case("parse_duration_bad", &["parse", "duration", "soon", "--json"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.json()["minutes"].is_null());
}

#[test]
fn parse_date_reads_offset_timestamps() {
    let result = common::run_cli_case(
        "parse_date",
        &["parse", "date", "2024-03-15T10:30:00-03:00", "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(result.json()["utc"], "2024-03-15T13:30:00+00:00");
}

#[test]
fn parse_date_rejects_impossible_calendar_dates() {
    let result = common::run_cli_case("parse_date_bad", &["parse", "date", "31/02/2024", "--json"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
}

// ──────────────────── config ────────────────────

#[test]
fn config_validate_accepts_sandbox_config() {
    let sandbox = Sandbox::new();
    let result = sandbox.run("config_validate", &["config", "validate", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = result.json();
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["hash"].as_str().map(str::len), Some(16));
}

#[test]
fn config_validate_rejects_negative_baseline() {
    let sandbox = Sandbox::new();
    sandbox.write_file("config.toml", "[analytics]\nmanual_flow_minutes = -5.0\n");
    let result = sandbox.run("config_validate_bad", &["config", "validate", "--json"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    let payload = result.json();
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["code"], "AGD-1001");
}

#[test]
fn missing_explicit_config_is_a_user_error() {
    let result = common::run_cli_case(
        "missing_config",
        &["--config", "/nonexistent/agd/config.toml", "logs", "--json"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("AGD-1002"));
}

#[test]
fn config_show_masks_password() {
    let sandbox = Sandbox::new();
    sandbox.write_file("config.toml", "[server]\ndashboard_password = \"hunter2\"\n");
    let result = sandbox.run("config_show", &["config", "show", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(
        result.json()["config"]["server"]["dashboard_password"],
        "********"
    );
    assert!(!result.stdout.contains("hunter2"));
}

// ──────────────────── import → analytics ────────────────────

#[test]
fn imported_logs_flow_into_analytics() {
    let sandbox = Sandbox::new();
    let lines = [
        json!({"_id": {"$oid": "65f000000000000000000001"}, "fields": {"currentDate": rfc3339_minutes_ago(5), "ExecutionTime": "10m"}, "kitConfirmation": "Kit A"}),
        json!({"currentDate": rfc3339_minutes_ago(10), "ExecutionTime": 20, "kit": "Kit A"}),
        json!({"data": {"executionDate": rfc3339_minutes_ago(15)}, "confirmacionKit": "Kit B"}),
        json!({"note": "no timestamp, never counted"}),
    ];
    let body: String = lines.iter().map(|l| format!("{l}\n")).collect();
    let file = sandbox.write_file("logs.jsonl", &body);
    let file = file.to_str().expect("utf-8 path");

    let import = sandbox.run("import_logs", &["import", file, "--json"]);
    assert!(import.status.success(), "log: {}", import.log_path.display());
    assert_eq!(import.json()["report"]["imported"], 4);

    let result = sandbox.run("analytics_after_import", &["analytics", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let analytics = &result.json()["analytics"];

    assert_eq!(analytics["totals"]["entries"], 3);
    assert_eq!(analytics["metrics"]["executions"]["year"], 3);
    assert_eq!(analytics["metrics"]["avgExecutionMinutes"].as_f64(), Some(15.0));
    // Baseline 30 from the sandbox config: (30-10) + (30-20).
    assert_eq!(analytics["metrics"]["timeSavedMinutes"].as_f64(), Some(30.0));
    assert_eq!(analytics["trend"].as_array().map(Vec::len), Some(7));
    assert_eq!(analytics["popularKits"][0]["label"], "Kit A");
    assert_eq!(analytics["popularKits"][0]["count"], 2);
}

#[test]
fn analytics_flags_override_config() {
    let sandbox = Sandbox::new();
    let result = sandbox.run(
        "analytics_flags",
        &[
            "analytics",
            "--trend-days",
            "500",
            "--manual-flow-minutes",
            "12",
            "--locale",
            "en",
            "--json",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let analytics = &result.json()["analytics"];
    assert_eq!(analytics["windows"]["trendDays"], 90);
    assert_eq!(analytics["trend"].as_array().map(Vec::len), Some(90));
    assert_eq!(analytics["totals"]["entries"], 0);
}

#[test]
fn analytics_rejects_negative_baseline_flag() {
    let sandbox = Sandbox::new();
    let result = sandbox.run(
        "analytics_negative_baseline",
        &["analytics", "--manual-flow-minutes=-1", "--json"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
}

#[test]
fn import_with_bad_lines_is_partial() {
    let sandbox = Sandbox::new();
    let file = sandbox.write_file(
        "mixed.jsonl",
        "{\"currentDate\": \"2024-03-15T10:00:00Z\"}\n\nnot json\n[1, 2]\n",
    );
    let result = sandbox.run(
        "import_partial",
        &["import", file.to_str().expect("utf-8 path"), "--json"],
    );
    assert_eq!(result.status.code(), Some(4), "log: {}", result.log_path.display());
    let report = &result.json()["report"];
    assert_eq!(report["imported"], 1);
    assert_eq!(report["skipped_blank"], 1);
    assert_eq!(report["rejected"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["rejected"][0]["line"], 3);
}

#[test]
fn logs_lists_normalized_entries_with_ids() {
    let sandbox = Sandbox::new();
    let file = sandbox.write_file(
        "one.jsonl",
        "{\"_id\": \"abc123\", \"currentDate\": \"2024-03-15T10:00:00Z\", \"ExecutionTime\": \"45s\", \"aigent_id\": \"run-7\"}\n",
    );
    let import = sandbox.run("logs_import", &["import", file.to_str().expect("utf-8 path")]);
    assert!(import.status.success(), "log: {}", import.log_path.display());

    let result = sandbox.run("logs_list", &["logs", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let entry = &result.json()["entries"][0];
    assert_eq!(entry["id"], "abc123");
    assert_eq!(entry["aigentId"], "run-7");
    assert_eq!(entry["executionMinutes"].as_f64(), Some(0.75));
}

#[test]
fn export_writes_documents_with_ids() {
    let sandbox = Sandbox::new();
    let file = sandbox.write_file("in.jsonl", "{\"_id\": \"x1\", \"currentDate\": \"2024-03-15\"}\n");
    let import = sandbox.run("export_seed", &["import", file.to_str().expect("utf-8 path")]);
    assert!(import.status.success(), "log: {}", import.log_path.display());

    let out = sandbox.path().join("out.jsonl");
    let result = sandbox.run(
        "export",
        &["export", out.to_str().expect("utf-8 path"), "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(result.json()["written"], 1);

    let written = std::fs::read_to_string(&out).expect("read export");
    let line: serde_json::Value = serde_json::from_str(written.trim()).expect("json line");
    assert_eq!(line["_id"], "x1");
    assert_eq!(line["currentDate"], "2024-03-15");
}

// ──────────────────── catalogs ────────────────────

#[test]
fn equipment_add_list_show_remove() {
    let sandbox = Sandbox::new();
    let add = sandbox.run(
        "equipment_add",
        &[
            "equipment",
            "add",
            "{\"nombre\": \"Router AX\", \"precio\": \"49,90\", \"stock\": 3}",
            "--json",
        ],
    );
    assert!(add.status.success(), "log: {}", add.log_path.display());
    let item = add.json()["item"].clone();
    assert_eq!(item["name"], "Router AX");
    assert_eq!(item["price"].as_f64(), Some(49.9));
    let id = item["id"].as_str().expect("id").to_string();

    let list = sandbox.run("equipment_list", &["equipment", "list", "--json"]);
    assert!(list.status.success(), "log: {}", list.log_path.display());
    assert_eq!(list.json()["items"].as_array().map(Vec::len), Some(1));

    let show = sandbox.run("equipment_show", &["equipment", "show", &id, "--json"]);
    assert!(show.status.success(), "log: {}", show.log_path.display());
    assert_eq!(show.json()["item"]["stock"], 3);

    let remove = sandbox.run("equipment_remove", &["equipment", "remove", &id, "--json"]);
    assert!(remove.status.success(), "log: {}", remove.log_path.display());

    let gone = sandbox.run("equipment_show_gone", &["equipment", "show", &id, "--json"]);
    assert_eq!(gone.status.code(), Some(1), "log: {}", gone.log_path.display());
    assert!(gone.stderr.contains("AGD-2002"));
}

#[test]
fn antennas_live_in_their_own_collection() {
    let sandbox = Sandbox::new();
    let add = sandbox.run(
        "antennas_add",
        &["antennas", "add", "{\"name\": \"Omni 8\", \"gain\": 8}", "--json"],
    );
    assert!(add.status.success(), "log: {}", add.log_path.display());

    let equipment = sandbox.run("antennas_vs_equipment", &["equipment", "list", "--json"]);
    assert_eq!(equipment.json()["items"].as_array().map(Vec::len), Some(0));

    let antennas = sandbox.run("antennas_list", &["antennas", "list", "--json"]);
    assert_eq!(antennas.json()["items"][0]["name"], "Omni 8");
}

#[test]
fn catalog_add_rejects_invalid_json() {
    let sandbox = Sandbox::new();
    let result = sandbox.run("antennas_bad_json", &["antennas", "add", "{name:"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
}
