//! Integration tests for output formatting
//!
//! These run the built binary in a scratch directory and check that JSON mode
//! prints exactly one parseable document on stdout.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "POLYSCAN_BASE_URL",
    "POLYSCAN_API_TOKEN",
    "POLYSCAN_RATE_LIMIT",
    "POLYSCAN_RATE_WINDOW_SECS",
    "POLYSCAN_MAX_POINTS",
    "POLYSCAN_PAGE_DELAY_MS",
];

fn polyscan(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_polyscan"));
    command.current_dir(dir).args(args);
    for var in ENV_VARS {
        command.env_remove(var);
    }
    command.output().expect("Failed to execute polyscan")
}

fn parse_stdout(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

fn ring(n: usize) -> String {
    (0..n)
        .map(|i| {
            let angle = i as f64 / n as f64 * std::f64::consts::TAU;
            format!("{:.6},{:.6},0", -75.0 + 0.1 * angle.cos(), 40.0 + 0.1 * angle.sin())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_kml(dir: &Path) {
    let kml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
  <Folder>
    <name>North</name>
    <Placemark>
      <name>Big Territory</name>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
  </Folder>
  <Folder>
    <name>South</name>
    <Placemark>
      <name>Small Territory</name>
      <Polygon><outerBoundaryIs><LinearRing><coordinates>{}</coordinates></LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
  </Folder>
</Document>
</kml>"#,
        ring(1200),
        ring(40)
    );
    std::fs::write(dir.join("areas.kml"), kml).unwrap();
}

#[test]
fn test_config_json_output_is_valid() {
    let dir = TempDir::new().unwrap();
    let output = polyscan(dir.path(), &["--json", "config"]);

    assert!(output.status.success(), "config should succeed");
    let parsed = parse_stdout(&output);
    assert_eq!(parsed["status"], "success");

    let rows = parsed["data"].as_array().expect("data should be an array");
    let keys: Vec<&str> = rows.iter().filter_map(|r| r["key"].as_str()).collect();
    assert!(keys.contains(&"base_url"));
    assert!(keys.contains(&"api_token"));
}

#[test]
fn test_config_reports_cli_override_source() {
    let dir = TempDir::new().unwrap();
    let output = polyscan(dir.path(), &["--json", "--rate-limit", "42", "config"]);

    let parsed = parse_stdout(&output);
    let row = parsed["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["key"] == "rate_limit")
        .cloned()
        .expect("rate_limit row");
    assert!(row["value"].as_str().unwrap().starts_with("42 "));
    assert_eq!(row["source"], "Cli");
}

#[test]
fn test_extract_writes_geojson() {
    let dir = TempDir::new().unwrap();
    write_kml(dir.path());

    let output = polyscan(dir.path(), &["--json", "extract", "areas.kml"]);
    assert!(output.status.success(), "extract should succeed");

    let parsed = parse_stdout(&output);
    assert_eq!(parsed["data"]["summary"]["total"], 2);
    assert!(dir.path().join("areas.geojson").is_file());
}

#[test]
fn test_split_then_list_folders() {
    let dir = TempDir::new().unwrap();
    write_kml(dir.path());
    assert!(polyscan(dir.path(), &["extract", "areas.kml"]).status.success());

    let output = polyscan(
        dir.path(),
        &["--json", "split", "areas.geojson", "-o", "split.geojson", "--max-points", "500"],
    );
    assert!(output.status.success(), "split should succeed");
    let parsed = parse_stdout(&output);
    assert_eq!(parsed["data"]["max_points"], 500);
    assert_eq!(parsed["data"]["input_features"], 2);
    assert!(parsed["data"]["output_features"].as_u64().unwrap() > 2);

    let output = polyscan(dir.path(), &["--json", "folders", "split.geojson"]);
    assert!(output.status.success(), "folders should succeed");
    let parsed = parse_stdout(&output);
    let folders: Vec<&str> = parsed["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["folder"].as_str())
        .collect();
    assert_eq!(folders, vec!["North", "South"]);
}

#[test]
fn test_extract_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = polyscan(dir.path(), &["--json", "extract", "missing.kml"]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "errors must not reach stdout");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"status\": \"error\""));
}

#[test]
fn test_businesses_without_token_fails() {
    let dir = TempDir::new().unwrap();
    write_kml(dir.path());
    assert!(polyscan(dir.path(), &["extract", "areas.kml"]).status.success());

    let output = polyscan(dir.path(), &["--json", "businesses", "areas.geojson"]);
    assert!(!output.status.success(), "retrieval needs an API token");
    assert!(output.stdout.is_empty());
}
