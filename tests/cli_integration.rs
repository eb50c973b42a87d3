//! Integration tests for the nestland CLI
//!
//! These tests exercise the full CLI workflow using a temporary database.
//! They verify that commands work end-to-end without mocking.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run nestland CLI with a specific database path
fn run_nestland(args: &[&str], db_path: &Path) -> std::process::Output {
    let workdir = db_path.parent().unwrap_or(Path::new("."));
    Command::new(env!("CARGO_BIN_EXE_nestland"))
        .args(args)
        .current_dir(workdir)
        .env("NESTLAND_DB_PATH", db_path)
        .env("NO_COLOR", "1")
        .env_remove("NESTLAND_LOG")
        .output()
        .expect("Failed to execute nestland")
}

/// Helper to get stdout as string
fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Helper to get stderr as string
fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// First UUID printed by a command
fn created_id(output: &std::process::Output) -> String {
    stdout(output)
        .split_whitespace()
        .find(|w| w.len() == 36 && w.matches('-').count() == 4)
        .unwrap_or_else(|| panic!("no id in output: {}", stdout(output)))
        .to_string()
}

fn run_ok(args: &[&str], db_path: &Path) -> std::process::Output {
    let output = run_nestland(args, db_path);
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        stderr(&output)
    );
    output
}

/// Onboarding process with two linked steps; returns (intake, review) ids
fn seed(db_path: &Path) -> (String, String) {
    run_ok(&["process", "add", "Client Onboarding", "-c", "Sales"], db_path);
    let intake = created_id(&run_ok(
        &["step", "add", "client-onboarding", "Intake call", "-r", "Client", "-l", "Client", "-o", "0"],
        db_path,
    ));
    let review = created_id(&run_ok(
        &["step", "add", "client-onboarding", "Contract review", "-r", "Legal", "-l", "Legal", "-o", "1"],
        db_path,
    ));
    run_ok(&["link", "client-onboarding", &intake, &review, "-l", "signed"], db_path);
    (intake, review)
}

// =============================================================================
// Basic Command Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_nestland"))
        .arg("--help")
        .output()
        .expect("Failed to execute");

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("nestland"));
    assert!(out.contains("process graphs"));
}

#[test]
fn test_version_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_nestland"))
        .arg("--version")
        .output()
        .expect("Failed to execute");

    assert!(output.status.success());
    assert!(stdout(&output).contains("nestland"));
}

// =============================================================================
// Shell Completion Tests
// =============================================================================

#[test]
fn test_completion_zsh() {
    let output = Command::new(env!("CARGO_BIN_EXE_nestland"))
        .args(["completion", "zsh"])
        .output()
        .expect("Failed to execute");

    assert!(output.status.success(), "completion zsh failed: {}", stderr(&output));
    assert!(stdout(&output).contains("#compdef nestland"));
}

#[test]
fn test_completion_bash() {
    let output = Command::new(env!("CARGO_BIN_EXE_nestland"))
        .args(["completion", "bash"])
        .output()
        .expect("Failed to execute");

    assert!(output.status.success(), "completion bash failed: {}", stderr(&output));
    assert!(stdout(&output).contains("_nestland"));
}

// =============================================================================
// Process and Step Tests
// =============================================================================

#[test]
fn test_add_and_list_processes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let output = run_ok(&["process", "add", "Client Onboarding", "-c", "Sales"], &db_path);
    assert!(stdout(&output).contains("Created process client-onboarding"));
    run_ok(&["process", "add", "Invoice Run", "-c", "Finance"], &db_path);

    let out = stdout(&run_ok(&["process", "list"], &db_path));
    assert!(out.contains("client-onboarding"));
    assert!(out.contains("invoice-run"));

    let out = stdout(&run_ok(&["process", "list", "-c", "Finance"], &db_path));
    assert!(out.contains("invoice-run"));
    assert!(!out.contains("client-onboarding"));

    let out = stdout(&run_ok(&["categories"], &db_path));
    assert_eq!(out.lines().collect::<Vec<_>>(), vec!["Finance", "Sales"]);
}

#[test]
fn test_duplicate_slug_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    run_ok(&["process", "add", "Client Onboarding"], &db_path);
    let output = run_nestland(&["process", "add", "Client Onboarding"], &db_path);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Error:"));
}

#[test]
fn test_step_list_filters() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    seed(&db_path);

    let out = stdout(&run_ok(&["step", "list", "client-onboarding"], &db_path));
    assert!(out.contains("Intake call"));
    assert!(out.contains("Contract review"));

    let out = stdout(&run_ok(&["step", "list", "client-onboarding", "-l", "Legal"], &db_path));
    assert!(!out.contains("Intake call"));
    assert!(out.contains("Contract review"));

    let out = stdout(&run_ok(&["roles", "client-onboarding"], &db_path));
    assert!(out.contains("Client (1)"));
    assert!(out.contains("Legal (1)"));
}

#[test]
fn test_link_rejects_unknown_step() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let (intake, _) = seed(&db_path);

    let output = run_nestland(&["link", "client-onboarding", &intake, "missing-step"], &db_path);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Target step missing-step does not exist"));
}

// =============================================================================
// Graph Tests
// =============================================================================

#[test]
fn test_graph_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let (intake, review) = seed(&db_path);

    let output = run_ok(
        &["graph", "client-onboarding", "--selected", &intake, "-f", "json"],
        &db_path,
    );
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid json");

    let nodes = json["graph"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["id"], intake.as_str());
    assert_eq!(nodes[0]["position"]["x"], 0.0);
    assert_eq!(nodes[0]["overlay"], "selected");
    assert_eq!(nodes[1]["id"], review.as_str());
    assert_eq!(nodes[1]["position"]["x"], 260.0);
    assert_eq!(nodes[1]["position"]["y"], 140.0);
    assert_eq!(json["graph"]["lanes"], serde_json::json!(["Client", "Legal"]));
    assert_eq!(json["graph"]["edges"][0]["label"], "signed");
}

#[test]
fn test_graph_dot_and_text() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    seed(&db_path);

    let out = stdout(&run_ok(&["graph", "client-onboarding", "-f", "dot"], &db_path));
    assert!(out.contains("digraph ProcessGraph"));
    assert!(out.contains("label=\"Client Onboarding\";"));

    let out = stdout(&run_ok(&["graph", "client-onboarding"], &db_path));
    assert!(out.contains("2 nodes, 1 edges, 2 lanes"));

    let out = stdout(&run_ok(&["lanes", "client-onboarding"], &db_path));
    assert!(out.contains(" 0  Client (1 steps)"));
    assert!(out.contains(" 1  Legal (1 steps)"));
}

#[test]
fn test_graph_warns_on_overlap() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    seed(&db_path);
    run_ok(&["step", "add", "client-onboarding", "Second intake", "-l", "Client", "-o", "0"], &db_path);

    let output = run_ok(&["graph", "client-onboarding"], &db_path);
    assert!(stderr(&output).contains("share the same lane and order"));
}

#[test]
fn test_graph_text_for_process_without_steps() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    run_ok(&["process", "add", "Billing"], &db_path);

    let out = stdout(&run_ok(&["graph", "billing"], &db_path));
    assert!(out.contains("0 nodes, 0 edges, 0 lanes"));
    assert!(out.contains("No steps yet. Add one with: nestland step add billing <title>"));

    seed(&db_path);
    let out = stdout(&run_ok(&["graph", "client-onboarding"], &db_path));
    assert!(!out.contains("No steps yet"));
}

#[test]
fn test_graph_unknown_process() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let output = run_nestland(&["graph", "nope"], &db_path);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not found"));
}

// =============================================================================
// Comment Tests
// =============================================================================

#[test]
fn test_comment_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let (_, review) = seed(&db_path);

    let comment = created_id(&run_ok(
        &["comment", "add", "client-onboarding", "Who signs off?", "-s", &review],
        &db_path,
    ));

    let output = run_ok(&["graph", "client-onboarding", "-f", "json"], &db_path);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["graph"]["nodes"][1]["overlay"], "open_comment");

    let out = stdout(&run_ok(&["comment", "list", "client-onboarding", "-s", &review], &db_path));
    assert!(out.contains("[open]"));
    assert!(out.contains("Who signs off?"));

    let out = stdout(&run_ok(&["comment", "resolve", &comment], &db_path));
    assert!(out.contains("Resolved"));
    let out = stdout(&run_ok(&["comment", "resolve", &comment], &db_path));
    assert!(out.contains("already resolved"));

    let output = run_ok(&["graph", "client-onboarding", "-f", "json"], &db_path);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(json["graph"]["nodes"][1]["overlay"].is_null());
}

#[test]
fn test_blank_comment_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    seed(&db_path);

    let output = run_nestland(&["comment", "add", "client-onboarding", "   "], &db_path);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Comment body is required"));
}

#[test]
fn test_comment_runs_configured_notifier() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let (_, review) = seed(&db_path);

    let config_dir = temp_dir.path().join(".nestland");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[notify]\ncommand = \"cat > payload.json\"\n",
    )
    .unwrap();

    let comment = created_id(&run_ok(
        &["comment", "add", "client-onboarding", "Who signs off?", "-s", &review],
        &db_path,
    ));

    // the CLI has exited; the command finishes on its own
    let payload_path = temp_dir.path().join("payload.json");
    let mut payload = serde_json::Value::Null;
    for _ in 0..100 {
        if let Ok(text) = std::fs::read_to_string(&payload_path) {
            if let Ok(value) = serde_json::from_str(&text) {
                payload = value;
                break;
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    assert_eq!(payload["process"]["slug"], "client-onboarding", "payload: {}", payload);
    assert_eq!(payload["comment"]["id"], comment.as_str());
    assert_eq!(payload["comment"]["body"], "Who signs off?");
    assert_eq!(payload["comment"]["step_id"], review.as_str());
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_step_removes_transitions() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let (intake, _) = seed(&db_path);

    run_ok(&["step", "delete", &intake], &db_path);
    let out = stdout(&run_ok(&["transitions", "client-onboarding"], &db_path));
    assert!(out.contains("No transitions"));
}

#[test]
fn test_delete_process() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    seed(&db_path);

    run_ok(&["process", "delete", "client-onboarding"], &db_path);
    let out = stdout(&run_ok(&["process", "list"], &db_path));
    assert!(out.contains("No processes found."));
}

// =============================================================================
// Sync Tests
// =============================================================================

#[test]
fn test_sync_between_databases() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let legacy = temp_dir.path().join("legacy.db");
    let primary = temp_dir.path().join("primary.db");
    seed(&legacy);

    let legacy_arg = legacy.to_string_lossy().to_string();
    let primary_arg = primary.to_string_lossy().to_string();

    let out = stdout(&run_ok(
        &["sync", "--from", &legacy_arg, "--to", &primary_arg, "--dry-run"],
        &primary,
    ));
    assert!(out.contains("Dry run"));
    let out = stdout(&run_ok(&["process", "list"], &primary));
    assert!(out.contains("No processes found."));

    let out = stdout(&run_ok(&["sync", "--from", &legacy_arg, "--to", &primary_arg], &primary));
    assert!(out.contains("steps        2 inserted, 0 updated"));
    let out = stdout(&run_ok(&["process", "list"], &primary));
    assert!(out.contains("client-onboarding"));
}

#[test]
fn test_sync_missing_source() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");

    let output = run_nestland(&["sync", "--from", "does-not-exist.db"], &db_path);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("does not exist"));
}

// =============================================================================
// Init Tests
// =============================================================================

#[test]
fn test_init_creates_project() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = Command::new(env!("CARGO_BIN_EXE_nestland"))
        .arg("init")
        .current_dir(temp_dir.path())
        .env_remove("NESTLAND_DB_PATH")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute");

    assert!(output.status.success(), "init failed: {}", stderr(&output));
    assert!(temp_dir.path().join(".nestland/nestland.db").exists());
    assert!(temp_dir.path().join(".nestland/config.toml").exists());
}
