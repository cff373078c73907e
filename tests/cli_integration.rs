use assert_cmd::Command;
use predicates::prelude::*;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

fn das_events() -> Command {
    let mut cmd = Command::cargo_bin("das-events").unwrap();
    cmd.env_remove("DAS_EVENTS_CONFIG");
    cmd
}

/// Silent 60-sensor array at 100 Hz with a 3 s burst on sensors 10..20
fn burst_rows() -> Vec<Vec<f64>> {
    (0..1000)
        .map(|t| {
            (0..60)
                .map(|s| {
                    if (300..600).contains(&t) && (10..20).contains(&s) {
                        5.0 * (2.0 * PI * 10.0 * t as f64 / 100.0).sin()
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

fn write_json_recording(dir: &Path, name: &str) -> PathBuf {
    let doc = serde_json::json!({
        "strain_data": burst_rows(),
        "sampling_freq": 100.0,
    });
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
    path
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    das_events()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_version_flag() {
    das_events()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("das-events"));
}

#[test]
fn test_help_lists_subcommands() {
    das_events()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("defaults"));
}

// =============================================================================
// DEFAULTS SUBCOMMAND
// =============================================================================

#[test]
fn test_defaults_document() {
    let output = das_events().arg("defaults").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(parsed["signal"]["fmin"], 1.0);
    assert_eq!(parsed["signal"]["fmax"], 100.0);
    assert_eq!(parsed["signal"]["target_fs"], 1000.0);
    assert_eq!(parsed["signal"]["filter_order"], 2);
    assert_eq!(parsed["detection"]["threshold"], 3.0);
    assert_eq!(parsed["detection"]["min_sensors"], 5);
}

// =============================================================================
// DETECT SUBCOMMAND
// =============================================================================

#[test]
fn test_detect_missing_file() {
    das_events()
        .args(["detect", "--file", "/nonexistent_dir_12345/rec.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_detect_invalid_band_is_input_error() {
    let tmp = tempfile::tempdir().unwrap();
    let rec = write_json_recording(tmp.path(), "rec.json");
    das_events()
        .args(["detect", "--quiet", "--fmin", "30", "--fmax", "20", "--file"])
        .arg(&rec)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_detect_reports_burst() {
    let tmp = tempfile::tempdir().unwrap();
    let rec = write_json_recording(tmp.path(), "rec.json");

    let output = das_events()
        .args(["detect", "--quiet", "--fmax", "40", "--file"])
        .arg(&rec)
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(parsed["file"], "rec.json");
    assert_eq!(parsed["n_samples"], 1000);
    assert_eq!(parsed["n_sensors"], 60);
    assert_eq!(parsed["downsample_factor"], 1);
    let events = parsed["events"].as_array().unwrap();
    assert!(!events.is_empty());
    assert!(events.iter().any(|e| {
        e["t_start_idx"].as_u64().unwrap() <= 300 && e["t_end_idx"].as_u64().unwrap() >= 599
    }));
}

#[test]
fn test_detect_writes_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let rec = write_json_recording(tmp.path(), "rec.json");
    let out = tmp.path().join("out");
    let events_file = tmp.path().join("events.json");

    das_events()
        .args(["detect", "--quiet", "--fmax", "40", "--save-preprocessed", "--compact"])
        .arg("--file")
        .arg(&rec)
        .arg("--output-dir")
        .arg(&out)
        .arg("-o")
        .arg(&events_file)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let dir = out.join("rec");
    for name in ["energy.dasm", "mask.dasm", "preprocessed.dasm", "events.json"] {
        assert!(dir.join(name).exists(), "missing {}", name);
    }
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&events_file).unwrap()).unwrap();
    assert!(report["n_events"].as_u64().unwrap() >= 1);
}

#[test]
fn test_detect_reads_config_from_env() {
    let tmp = tempfile::tempdir().unwrap();
    let rec = write_json_recording(tmp.path(), "rec.json");
    let config = tmp.path().join("config.json");
    std::fs::write(&config, r#"{ "signal": { "fmax": 40.0 }, "detection": { "min_sensors": 1000 } }"#)
        .unwrap();

    let output = das_events()
        .env("DAS_EVENTS_CONFIG", &config)
        .args(["detect", "--quiet", "--file"])
        .arg(&rec)
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    // no region spans 1000 sensors
    assert_eq!(parsed["n_events"], 0);
}

// =============================================================================
// BATCH SUBCOMMAND
// =============================================================================

#[test]
fn test_batch_missing_input_dir() {
    das_events()
        .args([
            "batch",
            "--input-dir",
            "/nonexistent_dir_12345",
            "--output-dir",
            "/tmp/unused",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Input directory not found"));
}

#[test]
fn test_batch_dry_run() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("a.json"), "{}").unwrap();
    std::fs::write(input.join("b.dasm"), "").unwrap();
    std::fs::write(input.join("readme.txt"), "").unwrap();

    das_events()
        .args(["batch", "--dry-run", "--quiet", "--input-dir"])
        .arg(&input)
        .arg("--output-dir")
        .arg(tmp.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("a.json"))
        .stdout(predicate::str::contains("b.dasm"))
        .stdout(predicate::str::contains("readme.txt").not());
}

#[test]
fn test_batch_aggregates_events() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    let out = tmp.path().join("out");
    std::fs::create_dir(&input).unwrap();
    write_json_recording(&input, "first.json");
    write_json_recording(&input, "second.json");

    let output = das_events()
        .args(["batch", "--quiet", "--fmax", "40", "--input-dir"])
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();
    let summary: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(summary["succeeded"], 2);
    assert_eq!(summary["failed"], 0);

    let all: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("all_events.json")).unwrap())
            .unwrap();
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), summary["total_events"].as_u64().unwrap() as usize);
    assert!(all.iter().any(|e| e["file"] == "first.json"));
    assert!(all.iter().any(|e| e["file"] == "second.json"));
    assert!(out.join("first").join("mask.dasm").exists());
    assert!(out.join("batch_summary.json").exists());
}

#[test]
fn test_batch_partial_failure_exit_code() {
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("in");
    std::fs::create_dir(&input).unwrap();
    write_json_recording(&input, "good.json");
    std::fs::write(input.join("broken.json"), "{ not json").unwrap();

    das_events()
        .args(["batch", "--quiet", "--fmax", "40", "--continue-on-error", "--input-dir"])
        .arg(&input)
        .arg("--output-dir")
        .arg(tmp.path().join("out"))
        .assert()
        .code(3);

    das_events()
        .args(["batch", "--quiet", "--fmax", "40", "--input-dir"])
        .arg(&input)
        .arg("--output-dir")
        .arg(tmp.path().join("strict"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("broken.json"));
}
