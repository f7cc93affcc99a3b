//! End-to-end tests for the `safetrip` binary. None of these reach a backend.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const FENCES: &str = r#"[
    {"id": "hotel", "name": "Hotel", "latitude": 12.9716, "longitude": 77.5946,
     "radius_meters": 500, "alert_type": "entry"},
    {"id": "city", "name": "City Center", "latitude": 12.9716, "longitude": 77.5946,
     "radius_meters": 5000, "alert_type": "both"}
]"#;

fn json_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Command isolated from the developer's config and backend settings
fn safetrip(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("safetrip").unwrap();
    cmd.current_dir(workdir.path())
        .env_remove("SUPABASE_URL")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_distance_one_degree_at_equator() {
    let dir = TempDir::new().unwrap();
    safetrip(&dir)
        .args(["distance", "0", "0", "0", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("111.2 km"));
}

#[test]
fn test_distance_json() {
    let dir = TempDir::new().unwrap();
    let output = safetrip(&dir)
        .args(["--format", "json", "distance", "0", "0", "0", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let meters = value["distance_meters"].as_f64().unwrap();
    assert!((meters - 111_195.0).abs() < 1.0);
}

#[test]
fn test_distance_rejects_out_of_range() {
    let dir = TempDir::new().unwrap();
    safetrip(&dir)
        .args(["distance", "95", "0", "0", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E4002"));
}

#[test]
fn test_json_error_report_on_stderr() {
    let dir = TempDir::new().unwrap();
    let output = safetrip(&dir)
        .args(["--format", "json", "distance", "0", "200", "0", "0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let report: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(report["code"], "E4002");
    assert_eq!(report["category"], "validation");
}

#[test]
fn test_distance_accepts_negative_coordinates() {
    let dir = TempDir::new().unwrap();
    safetrip(&dir)
        .args(["distance", "-33.8688", "151.2093", "-37.8136", "144.9631"])
        .assert()
        .success()
        .stdout(predicate::str::contains("km"));
}

#[test]
fn test_check_inside_both_fences() {
    let dir = TempDir::new().unwrap();
    let fences = json_file(FENCES);
    safetrip(&dir)
        .args(["check", "--lat", "12.9716", "--lon", "77.5946", "--fences"])
        .arg(fences.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("You have entered: Hotel"))
        .stdout(predicate::str::contains("Inside: City Center"));
}

#[test]
fn test_check_json_keeps_fence_order_and_rounds() {
    let dir = TempDir::new().unwrap();
    let fences = json_file(FENCES);
    let output = safetrip(&dir)
        .args(["--format", "json", "check", "--lat", "12.9726", "--lon", "77.5946", "--fences"])
        .arg(fences.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["geofences_checked"], 2);
    let alerts = value["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0]["geofence_id"], "hotel");
    assert_eq!(alerts[0]["type"], "entry");
    assert_eq!(alerts[1]["type"], "inside");
    // 0.001 degrees of latitude is about 111 m
    assert_eq!(alerts[0]["distance"], 111.0);
}

#[test]
fn test_check_far_away_only_outside() {
    let dir = TempDir::new().unwrap();
    let fences = json_file(FENCES);
    safetrip(&dir)
        .args(["check", "--lat", "13.5", "--lon", "77.5946", "--fences"])
        .arg(fences.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Outside: City Center"))
        .stdout(predicate::str::contains("Hotel").not());
}

#[test]
fn test_check_needs_fences_or_user() {
    let dir = TempDir::new().unwrap();
    safetrip(&dir)
        .args(["check", "--lat", "1", "--lon", "1"])
        .assert()
        .failure();
}

#[test]
fn test_check_user_without_backend_is_config_error() {
    let dir = TempDir::new().unwrap();
    safetrip(&dir)
        .args(["check", "--lat", "1", "--lon", "1", "--user", "u1"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("SUPABASE_URL"));
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    safetrip(&dir)
        .args(["--config", "/nope/safetrip.toml", "distance", "0", "0", "0", "1"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_replay_reports_every_sample_in_order() {
    let dir = TempDir::new().unwrap();
    let fences = json_file(FENCES);
    let track = json_file(
        r#"[
            {"latitude": 12.9716, "longitude": 77.5946, "accuracy": 8},
            {"latitude": 12.9900, "longitude": 77.5946, "accuracy": 8},
            {"latitude": 13.1000, "longitude": 77.5946, "accuracy": 1500},
            {"latitude": 12.9720, "longitude": 77.5946}
        ]"#,
    );

    let output = safetrip(&dir)
        .args(["--format", "json", "replay", "--interval-ms", "5", "--track"])
        .arg(track.path())
        .arg("--fences")
        .arg(fences.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);

    let indexes: Vec<u64> = lines.iter().map(|l| l["index"].as_u64().unwrap()).collect();
    assert_eq!(indexes, vec![1, 2, 3, 4]);

    // Hotel entry only at the start and the end
    assert_eq!(lines[0]["alerts"].as_array().unwrap().len(), 2);
    assert_eq!(lines[1]["alerts"].as_array().unwrap().len(), 1);
    assert_eq!(lines[2]["alerts"][0]["kind"], "outside");
    assert_eq!(lines[3]["alerts"][0]["kind"], "entry");

    // The 1500 m accuracy sample carries a poor-signal issue
    let issues = lines[2]["issues"].as_array().unwrap();
    assert!(issues[0].as_str().unwrap().contains("Poor GPS signal"));
}

#[test]
fn test_replay_missing_track() {
    let dir = TempDir::new().unwrap();
    let fences = json_file(FENCES);
    safetrip(&dir)
        .args(["replay", "--track", "missing.json", "--fences"])
        .arg(fences.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn test_config_file_is_picked_up() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".safetrip.toml"),
        "[tracking]\npoor_signal_threshold_m = 5.0\n",
    )
    .unwrap();
    let fences = json_file(FENCES);
    let track = json_file(r#"[{"latitude": 12.9716, "longitude": 77.5946, "accuracy": 8}]"#);

    safetrip(&dir)
        .args(["replay", "--interval-ms", "1", "--track"])
        .arg(track.path())
        .arg("--fences")
        .arg(fences.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Poor GPS signal"));
}
