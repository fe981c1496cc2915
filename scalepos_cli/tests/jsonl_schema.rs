use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let images = dir.path().join("images");
    let toml = format!(
        r#"
[sensor]
tick_ms = 10
readings_per_sample = 1

[detection]
stable_ms = 100

[capture]
image_dir = "{}"

[classifier]
timeout_ms = 2000
"#,
        images.display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn run_json(cfg: &PathBuf, envs: &[(&str, &str)], extra: &[&str]) -> Vec<serde_json::Value> {
    let mut cmd = Command::cargo_bin("scalepos_cli").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(cfg)
        .args(["run", "--max-ticks", "60"])
        .args(extra);
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8_lossy(&out)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("bad JSON line {l:?}: {e}")))
        .collect()
}

fn summary(events: &[serde_json::Value]) -> &serde_json::Value {
    events
        .iter()
        .find(|e| e["event"] == "summary")
        .expect("summary line")
}

/// A settled 500 g apple shows up as one ledger event and in the summary.
#[rstest]
fn jsonl_ledger_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let events = run_json(
        &cfg,
        &[
            ("SCALEPOS_SIM_PROFILE", "0:5,500:40"),
            ("SCALEPOS_SIM_LABEL", "apple"),
            ("SCALEPOS_SIM_CONFIDENCE", "0.8"),
        ],
        &[],
    );

    let ledger: Vec<&serde_json::Value> =
        events.iter().filter(|e| e["event"] == "ledger").collect();
    assert_eq!(ledger.len(), 1, "events: {events:?}");
    let item = &ledger[0]["items"][0];
    assert_eq!(item["serial"], 1);
    assert_eq!(item["label"], "apple");
    assert_eq!(item["weight_g"], 500.0);
    assert_eq!(item["price"], 36.0);
    assert_eq!(ledger[0]["total_price"], 36.0);

    let s = summary(&events);
    assert_eq!(s["ticks"], 60);
    assert_eq!(s["items"], 1);
    assert_eq!(s["settled"], true);
}

#[rstest]
fn low_confidence_run_bills_nothing() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let events = run_json(
        &cfg,
        &[
            ("SCALEPOS_SIM_PROFILE", "0:5,500:40"),
            ("SCALEPOS_SIM_CONFIDENCE", "0.2"),
        ],
        &[],
    );
    assert!(events.iter().all(|e| e["event"] != "ledger"));
    assert_eq!(summary(&events)["items"], 0);
}

#[rstest]
fn unreachable_classifier_is_recovered() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let events = run_json(
        &cfg,
        &[("SCALEPOS_SIM_PROFILE", "0:5,500:40")],
        &["--endpoint", "http://127.0.0.1:9/predict/"],
    );
    assert_eq!(summary(&events)["items"], 0);
}
