//! Integration tests for the `fex` CLI.
//!
//! Each test writes a config and a JSONL file into a temp directory, runs
//! `fex --data` as a subprocess, and checks stdout and/or file contents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Get the path to the built `fex` binary.
fn fex_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("fex");
    path
}

const CONFIG: &str = r#"[server]
url = "http://localhost:8080"

[schema]
intent = { type = "multilabel" }
note = { type = "text", optional = true }
"#;

/// Three items; only the first is labeled
fn create_dataset(root: &Path) {
    fs::write(root.join("fex.toml"), CONFIG).unwrap();
    let lines = [
        json!({"text": "hello there", "intent": ["greet"]}),
        json!({"text": "I want to buy shoes"}),
        json!({"text": "bye now"}),
    ];
    let body: String = lines.iter().map(|l| format!("{}\n", l)).collect();
    fs::write(root.join("items.jsonl"), body).unwrap();
}

fn fex(root: &Path, args: &[&str]) -> Output {
    Command::new(fex_bin())
        .current_dir(root)
        .args(["--data", "items.jsonl"])
        .args(args)
        .output()
        .expect("failed to run fex")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "fex failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn schema_lists_fields() {
    let tmp = TempDir::new().unwrap();
    create_dataset(tmp.path());
    let out = stdout(&fex(tmp.path(), &["schema"]));
    assert_eq!(out, "intent  multilabel\nnote    text, optional\n");
}

#[test]
fn count_text_and_json() {
    let tmp = TempDir::new().unwrap();
    create_dataset(tmp.path());
    assert_eq!(stdout(&fex(tmp.path(), &["count"])), "3\n");
    let out = stdout(&fex(tmp.path(), &["count", "--json"]));
    assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), json!({"count": 3}));
}

#[test]
fn get_prints_item() {
    let tmp = TempDir::new().unwrap();
    create_dataset(tmp.path());
    let out = stdout(&fex(tmp.path(), &["--json", "get", "0"]));
    assert_eq!(
        serde_json::from_str::<Value>(&out).unwrap(),
        json!({"text": "hello there", "intent": ["greet"]})
    );
}

#[test]
fn get_out_of_range_fails() {
    let tmp = TempDir::new().unwrap();
    create_dataset(tmp.path());
    let output = fex(tmp.path(), &["get", "7"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr: {}", stderr);
}

#[test]
fn search_by_field() {
    let tmp = TempDir::new().unwrap();
    create_dataset(tmp.path());
    assert_eq!(stdout(&fex(tmp.path(), &["search", "intent:greet"])), "0\n");
    assert_eq!(
        stdout(&fex(tmp.path(), &["search", "intent:nothing"])),
        "no matches\n"
    );
    let out = stdout(&fex(tmp.path(), &["--json", "search", "intent:greet"]));
    assert_eq!(
        serde_json::from_str::<Value>(&out).unwrap(),
        json!({"query": "intent:greet", "matches": [0]})
    );
}

#[test]
fn export_writes_one_file_per_item() {
    let tmp = TempDir::new().unwrap();
    create_dataset(tmp.path());
    let out = stdout(&fex(tmp.path(), &["export", "-o", "html"]));
    assert_eq!(out, "Wrote 3 files to html\n");
    for i in 0..3 {
        let page = fs::read_to_string(tmp.path().join(format!("html/{}.html", i))).unwrap();
        assert!(!page.is_empty());
    }
}

#[test]
fn data_without_schema_is_an_error() {
    let tmp = TempDir::new().unwrap();
    create_dataset(tmp.path());
    fs::write(tmp.path().join("fex.toml"), "[server]\nurl = \"http://x\"\n").unwrap();
    let output = fex(tmp.path(), &["count"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no [schema] table"));
}

#[test]
fn config_updates_file_in_place() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("fex.toml"), CONFIG).unwrap();
    let status = Command::new(fex_bin())
        .current_dir(tmp.path())
        .args(["config", "--timeout", "30", "--server", "http://labels:9000"])
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(tmp.path().join("fex.toml")).unwrap();
    assert!(text.contains("url = \"http://labels:9000\""));
    assert!(text.contains("timeout_secs = 30"));
    // the schema table is left alone
    assert!(text.contains("intent = { type = \"multilabel\" }"));
}
