use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast timing so a scripted run settles in well under a second
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let images = dir.path().join("images");
    let toml = format!(
        r#"
[sensor]
tick_ms = 10
readings_per_sample = 1

[detection]
epsilon_g = 1.0
stable_ms = 100

[capture]
image_dir = "{}"

[classifier]
endpoint = "http://127.0.0.1:8000/predict/"
timeout_ms = 2000
"#,
        images.display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("scalepos_cli").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("SCALEPOS_SIM_PROFILE")
        .env_remove("SCALEPOS_SIM_LABEL")
        .env_remove("SCALEPOS_SIM_CONFIDENCE");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "ok", "stdout")]
#[case(&["price", "--label", "apple", "--grams", "500"], 0, "36.00 INR", "stdout")]
#[case(&["price", "--label", "rock", "--grams", "300"], 0, "0.00 INR", "stdout")]
#[case(&["price", "--label", "apple"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = bin();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_reports_bad_pricing_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("pricing.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "name,rate").unwrap();
    writeln!(f, "apple,80").unwrap();

    bin()
        .arg("--config")
        .arg(&cfg)
        .arg("--pricing")
        .arg(&bad_csv)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn pricing_csv_overrides_config_rates() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("pricing.csv");
    fs::write(&csv, "label,price_per_kg\napple,80\nkiwi,120\n").unwrap();

    bin()
        .arg("--config")
        .arg(&cfg)
        .arg("--pricing")
        .arg(&csv)
        .args(["price", "--label", "apple", "--grams", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("40.00 INR"));
}

#[rstest]
fn invalid_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[detection]\nepsilon_g = 0.0\n").unwrap();

    bin()
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("detection.epsilon_g"));
}

#[rstest]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[classifier]\nendpoint = \"ftp://nope\"\n").unwrap();

    let out = bin()
        .arg("--json")
        .arg("--config")
        .arg(&path)
        .arg("self-check")
        .assert()
        .code(2)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or_else(|| panic!("no JSON error line; stderr was: {stderr}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "ConfigError");
    assert!(v["message"].as_str().unwrap().contains("classifier.endpoint"));
}

#[rstest]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    bin()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("self-check")
        .assert()
        .code(2);
}

#[rstest]
fn bad_sim_profile_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    bin()
        .arg("--config")
        .arg(&cfg)
        .env("SCALEPOS_SIM_PROFILE", "500")
        .args(["run", "--max-ticks", "5"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SCALEPOS_SIM_PROFILE"));
}
