use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[instruments]
backend = "sim"

[ramp]
default_step_ma = 100
tolerance_ma = 1
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_line<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("\"{key}\"");
    text.lines().find(|l| l.contains(&needle))
}

/// Validate the JSON schema for a status reading.
#[rstest]
fn json_status_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("helmcoil").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("status");

    let out = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = json_line(&stdout, "measured_current_a")
        .unwrap_or_else(|| panic!("no status line; stdout was: {stdout}"));
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");

    assert_eq!(v["command"], "status");
    for key in [
        "taken_at",
        "elapsed_s",
        "set_current_a",
        "measured_current_a",
        "field",
        "measured_voltage_v",
        "fine",
    ] {
        assert!(v.get(key).is_some(), "missing {key} in {v}");
    }
    assert_eq!(v["fine"], 0);
}

/// Ramp results carry the target, write count and (with output off) no residual.
#[rstest]
fn json_ramp_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("helmcoil").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("ramp")
        .arg("--ma")
        .arg("1000");

    let out = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8_lossy(&out);
    let line = json_line(&stdout, "target_ma").expect("ramp line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();

    assert_eq!(v["command"], "ramp");
    assert_eq!(v["target_ma"], 1000);
    assert_eq!(v["origin_ma"], 0);
    assert_eq!(v["commands"], 11);
    assert!(v["residual_ma"].is_null());
    assert!(v["warning"].is_null());
}

/// Errors in JSON mode are a single object on stderr with a stable reason.
#[rstest]
fn json_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("helmcoil").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("off")
        .arg("--config")
        .arg(&cfg)
        .arg("output")
        .arg("on")
        .env("HELMCOIL_SIM_STUCK_OUTPUT", "true");

    let out = cmd.assert().code(3).get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&out);
    let line = json_line(&stderr, "reason")
        .unwrap_or_else(|| panic!("no error object; stderr was: {stderr}"));
    let v: serde_json::Value = serde_json::from_str(line).unwrap();

    assert_eq!(v["reason"], "OutputEnable");
    assert_eq!(v["exit_code"], 3);
    assert!(v["message"].as_str().unwrap().contains("What happened"));
}
