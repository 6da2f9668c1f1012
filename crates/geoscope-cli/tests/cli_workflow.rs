use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn geoscope(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("geoscope").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a single JSON document")
}

fn setup_benchmark(dir: &Path) -> String {
    geoscope(dir).arg("init").assert().success();
    let out = geoscope(dir)
        .args([
            "benchmark",
            "--format",
            "json",
            "create",
            "--name",
            "CRM tools",
            "--scenario",
            "mid-market CRM selection",
            "--roles",
            "founder,sales ops lead",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let benchmark = json_stdout(&out);
    assert_eq!(benchmark["current_version"], "1.0");
    assert_eq!(benchmark["status"], "draft");
    benchmark["id"].as_i64().unwrap().to_string()
}

#[test]
fn end_to_end_run_and_projections() {
    let dir = TempDir::new().unwrap();
    let id = setup_benchmark(dir.path());

    for (text, intent) in [
        ("Which CRM should a small team pick?", "RECOMMEND"),
        ("How does the leading CRM compare to rivals?", "COMPETE"),
    ] {
        geoscope(dir.path())
            .args([
                "question",
                "--benchmark",
                id.as_str(),
                "add",
                "--text",
                text,
                "--intent",
                intent,
            ])
            .assert()
            .success();
    }

    // sample config lists 3 engines; 2 questions x 3 engines = 6 pairs
    let out = geoscope(dir.path())
        .args(["run", "--format", "json", "start", "--benchmark", id.as_str()])
        .output()
        .unwrap();
    assert!(out.status.success());
    let run = json_stdout(&out);
    assert_eq!(run["status"], "completed");
    assert_eq!(run["progress"]["total"], 6);
    assert_eq!(run["benchmark_version"], "1.2");
    let rate = run["summary"]["visibility_rate"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&rate));

    let run_id = run["id"].as_i64().unwrap().to_string();
    let out = geoscope(dir.path())
        .args([
            "run", "--format", "json", "results", "--id", run_id.as_str(), "--limit", "4",
        ])
        .output()
        .unwrap();
    let results = json_stdout(&out);
    assert_eq!(results["total"], 6);
    assert_eq!(results["items"].as_array().unwrap().len(), 4);

    let out = geoscope(dir.path())
        .args(["dashboard", "--format", "json"])
        .output()
        .unwrap();
    let dash = json_stdout(&out);
    assert_eq!(dash["total"], 1);
    assert_eq!(dash["points"][0]["benchmark_count"], 1);
    assert_eq!(dash["points"][0]["new_benchmarks"], 1);

    let out = geoscope(dir.path())
        .args(["optimize", "--format", "json"])
        .output()
        .unwrap();
    let journeys = json_stdout(&out);
    assert_eq!(journeys["total"], 6);
    assert_eq!(journeys["items"][0]["journey"], "AWARE");
    assert_eq!(journeys["items"][5]["journey"], "CONTACT");
}

#[test]
fn version_history_lists_and_restores() {
    let dir = TempDir::new().unwrap();
    let id = setup_benchmark(dir.path());
    for text in ["first question", "second question"] {
        geoscope(dir.path())
            .args([
                "question",
                "--benchmark",
                id.as_str(),
                "add",
                "--text",
                text,
                "--intent",
                "AWARE",
            ])
            .assert()
            .success();
    }

    let out = geoscope(dir.path())
        .args(["versions", "--format", "json", "--benchmark", id.as_str(), "list"])
        .output()
        .unwrap();
    let versions = json_stdout(&out);
    assert_eq!(versions["total"], 3);
    // newest first
    assert_eq!(versions["items"][0]["version"], "1.2");
    assert_eq!(versions["items"][0]["is_current"], true);

    let v11 = versions["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["version"] == "1.1")
        .unwrap();
    let v11_id = v11["id"].as_i64().unwrap().to_string();

    let out = geoscope(dir.path())
        .args([
            "versions", "--format", "json", "--benchmark", id.as_str(), "restore", "--id", v11_id.as_str(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let restored = json_stdout(&out);
    assert_eq!(restored["version"], "1.3");
    assert_eq!(restored["change_type"], "restored");
    assert_eq!(restored["snapshot"]["questions"].as_array().unwrap().len(), 1);

    // restoring the now-current version is an invalid-state error
    let restored_id = restored["id"].as_i64().unwrap().to_string();
    geoscope(dir.path())
        .args(["versions", "--benchmark", id.as_str(), "restore", "--id", restored_id.as_str()])
        .assert()
        .failure()
        .code(4)
        .stderr(contains("already current"));
}

#[test]
fn deleting_the_only_run_empties_the_dashboard() {
    let dir = TempDir::new().unwrap();
    let id = setup_benchmark(dir.path());
    geoscope(dir.path())
        .args([
            "question",
            "--benchmark",
            id.as_str(),
            "add",
            "--text",
            "What is a CRM?",
            "--intent",
            "AWARE",
        ])
        .assert()
        .success();
    let out = geoscope(dir.path())
        .args(["run", "--format", "json", "start", "--benchmark", id.as_str()])
        .output()
        .unwrap();
    let run_id = json_stdout(&out)["id"].as_i64().unwrap().to_string();

    geoscope(dir.path())
        .args(["run", "delete", "--id", run_id.as_str()])
        .assert()
        .success();

    let out = geoscope(dir.path())
        .args(["dashboard", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(json_stdout(&out)["total"], 0);
}

#[test]
fn generate_streams_events_and_readies_the_benchmark() {
    let dir = TempDir::new().unwrap();
    geoscope(dir.path()).arg("init").assert().success();
    let out = geoscope(dir.path())
        .args([
            "benchmark",
            "--format",
            "json",
            "generate",
            "--name",
            "CRM tools",
            "--scenario",
            "crm",
            "--questions-per-stage",
            "1",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let benchmark = json_stdout(&out);
    assert_eq!(benchmark["status"], "ready");
    assert_eq!(benchmark["total_questions"], 6);
    let events = String::from_utf8_lossy(&out.stderr);
    assert!(events.contains("\"event\":\"benchmark_created\""));
    assert!(events.contains("\"event\":\"stage_start\""));
    assert!(events.contains("\"event\":\"generation_complete\""));
}

#[test]
fn unknown_ids_surface_as_not_found() {
    let dir = TempDir::new().unwrap();
    geoscope(dir.path()).arg("init").assert().success();
    geoscope(dir.path())
        .args(["run", "start", "--benchmark", "999"])
        .assert()
        .failure()
        .code(3)
        .stderr(contains("benchmark 999 not found"));

    let id = {
        let out = geoscope(dir.path())
            .args([
                "benchmark", "--format", "json", "create", "--name", "CRM tools",
            ])
            .output()
            .unwrap();
        json_stdout(&out)["id"].as_i64().unwrap().to_string()
    };
    geoscope(dir.path())
        .args(["question", "--benchmark", id.as_str(), "delete", "--id", "42"])
        .assert()
        .failure()
        .code(3)
        .stderr(contains("question 42 not found"));
}

#[test]
fn invalid_intent_is_a_validation_error() {
    let dir = TempDir::new().unwrap();
    let id = setup_benchmark(dir.path());
    geoscope(dir.path())
        .args([
            "question",
            "--benchmark",
            id.as_str(),
            "add",
            "--text",
            "q",
            "--intent",
            "PURCHASE",
        ])
        .assert()
        .failure()
        .code(5)
        .stderr(contains("intent"));
}

#[test]
fn missing_config_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    geoscope(dir.path())
        .args(["benchmark", "list"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("config"));
}
