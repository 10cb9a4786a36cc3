//! Integration tests for the riskgraph CLI

use assert_cmd::cargo;
use predicates::prelude::*;
use tempfile::TempDir;

fn riskgraph() -> assert_cmd::Command {
    assert_cmd::Command::new(cargo::cargo_bin!("riskgraph"))
}

const MODEL: &str = r#"
[project]
name = "Online Shop"

[[assets]]
name = "Orders"
confidentiality = 80
integrity = 80
availability = 60

[[components]]
name = "User"
kind = "actor"
technology = "browser"

[[components]]
name = "WebApp"
kind = "process"
technology = "web-application"
accepts = ["json"]

[[flows]]
name = "WebTraffic"
source = "User"
destination = "WebApp"
protocol = "https"
transfers = ["Orders"]
"#;

fn write_model(temp: &TempDir) {
    std::fs::write(temp.path().join("model.toml"), MODEL).unwrap();
}

#[test]
fn test_version() {
    riskgraph()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("riskgraph"));
}

#[test]
fn test_help() {
    riskgraph()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Derive security risks"));
}

#[test]
fn test_no_args_shows_info() {
    riskgraph().assert().success().stdout(predicate::str::contains("riskgraph"));
}

#[test]
fn test_check_evaluates_the_model() {
    let temp = TempDir::new().unwrap();
    write_model(&temp);

    riskgraph()
        .arg("check")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Online Shop"));
}

#[test]
fn test_check_fails_on_assetless_flows() {
    let temp = TempDir::new().unwrap();
    let broken = MODEL.replace("transfers = [\"Orders\"]\n", "");
    std::fs::write(temp.path().join("model.toml"), broken).unwrap();

    riskgraph()
        .arg("check")
        .current_dir(temp.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("transfers no assets"));
}

#[test]
fn test_risks_json_lists_composite_ids() {
    let temp = TempDir::new().unwrap();
    write_model(&temp);

    riskgraph()
        .args(["--json", "risks"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("CAPEC-62@WebApp@WebTraffic"));
}

#[test]
fn test_backlog_table_lists_templates() {
    let temp = TempDir::new().unwrap();
    write_model(&temp);

    riskgraph()
        .arg("backlog")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ASVS-4.2.2"));
}

#[test]
fn test_risk_accept_persists_state() {
    let temp = TempDir::new().unwrap();
    write_model(&temp);

    riskgraph()
        .args([
            "risk",
            "accept",
            "CAPEC-62@WebApp@WebTraffic",
            "--ticket",
            "SEC-42",
        ])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted"));

    let state = temp.path().join(".riskgraph").join("state.json");
    assert!(state.exists());
    let content = std::fs::read_to_string(state).unwrap();
    assert!(content.contains("accepted"));
    assert!(content.contains("SEC-42"));

    // The recorded disposition shows up in the next listing.
    riskgraph()
        .args(["risks"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted"));
}

#[test]
fn test_unknown_risk_id_fails() {
    let temp = TempDir::new().unwrap();
    write_model(&temp);

    riskgraph()
        .args(["risk", "accept", "CAPEC-1@Nowhere"])
        .current_dir(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no risk with id"));
}

#[test]
fn test_export_writes_an_otm_document() {
    let temp = TempDir::new().unwrap();
    write_model(&temp);

    riskgraph()
        .args(["export", "--output", "model.otm.json"])
        .current_dir(temp.path())
        .assert()
        .success();

    let content = std::fs::read_to_string(temp.path().join("model.otm.json")).unwrap();
    assert!(content.contains("\"otmVersion\": \"0.1.0\""));
    assert!(content.contains("CAPEC-62@WebApp@WebTraffic"));
}

#[test]
fn test_diagram_prints_nodes_and_edges() {
    let temp = TempDir::new().unwrap();
    write_model(&temp);

    riskgraph()
        .arg("diagram")
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("node web-app [circle] WebApp"))
        .stdout(predicate::str::contains("edge user -> web-app (https: WebTraffic)"));
}
