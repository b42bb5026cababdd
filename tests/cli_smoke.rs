mod common;

use assert_cmd::prelude::*;
use common::sample_history;
use devpace::model::CommitRecord;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_ndjson(dir: &Path, name: &str, commits: &[CommitRecord]) -> PathBuf {
    let path = dir.join(name);
    let mut f = File::create(&path).unwrap();
    for commit in commits {
        writeln!(f, "{}", serde_json::to_string(commit).unwrap()).unwrap();
    }
    f.sync_all().unwrap();
    path
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn analyze_json_outputs_metrics() {
    let dir = tempdir().unwrap();
    let input = write_ndjson(dir.path(), "commits.ndjson", &sample_history());

    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.arg("analyze").arg(&input);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(v["version"].as_u64(), Some(1));
    assert_eq!(v["metrics"]["diagnostics"]["commits"].as_u64(), Some(10));
    let developers = v["metrics"]["diff_delta"]["developers"].as_object().unwrap();
    assert!(developers.contains_key("Alice"));
    assert!(developers.contains_key("Bob"));
    assert!(v["metrics"]["timing"]["developers"]["Alice"]["work_sessions"]["provenance"]
        .as_str()
        .map(|p| p == "exact")
        .unwrap_or(false));
    let domains = &v["metrics"]["domains"]["developers"];
    assert_eq!(domains["Alice"]["totals"]["changes"]["backend"].as_u64(), Some(26));
    assert_eq!(domains["Bob"]["totals"]["changes"]["frontend"].as_u64(), Some(6));
}

#[test]
fn analyze_ndjson_outputs_one_line_per_author() {
    let dir = tempdir().unwrap();
    let input = write_ndjson(dir.path(), "commits.ndjson", &sample_history());

    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.args(["analyze", "--ndjson"]).arg(&input);
    let out = cmd.assert().success().get_output().stdout.clone();
    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["author"], "Alice");
    assert!(lines[1]["hours"]["totals"]["estimated_hours"].as_f64().unwrap() > 0.0);
    assert_eq!(lines[1]["domains"]["totals"]["total_changes"].as_u64(), Some(6));
}

#[test]
fn date_range_filters_commits() {
    let dir = tempdir().unwrap();
    let input = write_ndjson(dir.path(), "commits.ndjson", &sample_history());
    let output = dir.path().join("out.json");

    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.args(["analyze", "--since", "2024-03-11", "--until", "2024-03-14"])
        .arg(&input)
        .arg("--output")
        .arg(&output);
    cmd.assert().success();

    let v = read_json(&output);
    assert_eq!(v["metrics"]["diagnostics"]["commits"].as_u64(), Some(3));
}

#[test]
fn merge_combines_written_snapshots() {
    let dir = tempdir().unwrap();
    let history = sample_history();
    let (first, second) = history.split_at(4);
    let inputs = [
        write_ndjson(dir.path(), "a.ndjson", first),
        write_ndjson(dir.path(), "b.ndjson", second),
    ];

    let mut outputs = Vec::new();
    for (i, input) in inputs.iter().enumerate() {
        let output = dir.path().join(format!("part{i}.json"));
        let mut cmd = Command::cargo_bin("devpace").unwrap();
        cmd.arg("analyze").arg(input).arg("--output").arg(&output);
        cmd.assert().success();
        outputs.push(output);
    }

    let merged = dir.path().join("merged.json");
    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.arg("merge").args(&outputs).arg("--output").arg(&merged);
    cmd.assert().success();

    let v = read_json(&merged);
    assert_eq!(v["metrics"]["diagnostics"]["commits"].as_u64(), Some(10));
    assert_eq!(v["sources"].as_array().map(|s| s.len()), Some(2));
    assert_eq!(
        v["metrics"]["timing"]["developers"]["Alice"]["timing_patterns"]["provenance"],
        "approximate"
    );
}

#[test]
fn merge_without_snapshots_fails() {
    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.arg("merge");
    cmd.assert().failure();
}

#[test]
fn unreadable_input_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("garbage.ndjson");
    fs::write(&input, "not json\n{\"also\": \"not a commit\"}\n").unwrap();

    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.arg("analyze").arg(&input);
    cmd.assert().failure();
}

#[test]
fn malformed_lines_are_skipped() {
    let dir = tempdir().unwrap();
    let input = write_ndjson(dir.path(), "commits.ndjson", &sample_history()[..2]);
    let mut f = fs::OpenOptions::new().append(true).open(&input).unwrap();
    writeln!(f, "{{\"truncated\":").unwrap();
    writeln!(f).unwrap();

    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.arg("analyze").arg(&input);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["metrics"]["diagnostics"]["commits"].as_u64(), Some(2));
}

#[test]
fn config_overrides_engine_constants() {
    let dir = tempdir().unwrap();
    let input = write_ndjson(dir.path(), "commits.ndjson", &sample_history());
    let config = dir.path().join("devpace.toml");
    fs::write(&config, "[diff_delta]\nadd_weight = 0.0\nupdate_weight = 0.0\ndelete_weight = 0.0\nmove_weight = 0.0\n").unwrap();

    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.arg("--config").arg(&config).arg("analyze").arg(&input);
    let out = cmd.assert().success().get_output().stdout.clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(
        v["metrics"]["diff_delta"]["developers"]["Alice"]["totals"]["diff_delta"].as_f64(),
        Some(0.0)
    );
}

#[test]
fn invalid_config_fails() {
    let dir = tempdir().unwrap();
    let input = write_ndjson(dir.path(), "commits.ndjson", &sample_history());
    let config = dir.path().join("devpace.toml");
    fs::write(&config, "[diff_delta]\nupdate_factor = 3.0\n").unwrap();

    let mut cmd = Command::cargo_bin("devpace").unwrap();
    cmd.arg("--config").arg(&config).arg("analyze").arg(&input);
    cmd.assert().failure();
}
