use std::io::Write;
use std::process::Command;

use serde_json::Value;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

fn run_cli(args: &[&std::path::Path]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_flowcanvas"))
        .args(args)
        .output()
        .expect("run flowcanvas")
}

#[test]
fn replays_script_and_prints_report() {
    let script = write_temp(
        r#"[
            {"op": "insert", "kind": "new_double", "x": 10, "y": 10},
            {"op": "insert", "kind": "print_double", "x": 200, "y": 10},
            {"op": "connect", "source": 0, "output": 0, "sink": 1, "input": 0},
            {"op": "connect", "source": 1, "output": 0, "sink": 0, "input": 0},
            {"op": "select_all"},
            {"op": "move", "dx": 30, "dy": 5},
            {"op": "undo"}
        ]"#,
    );
    let output = run_cli(&[script.path()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: Value = serde_json::from_slice(&output.stdout).expect("report is JSON");
    assert_eq!(report["blocks"].as_array().unwrap().len(), 2);
    assert_eq!(report["connectors"].as_array().unwrap().len(), 1);
    assert_eq!(report["blocks"][0]["position"]["x"], 10.0);
    assert_eq!(report["redo"], "Move blocks");
    // print_double has no output port 0.
    assert_eq!(report["errors"][0]["step"], 3);
}

#[test]
fn config_changes_paste_offset() {
    let config = write_temp(r#"{"paste_offset": 50}"#);
    let script = write_temp(
        r#"[
            {"op": "insert", "kind": "new_int", "x": 0, "y": 0},
            {"op": "select_all"},
            {"op": "copy"},
            {"op": "paste"}
        ]"#,
    );
    let output = Command::new(env!("CARGO_BIN_EXE_flowcanvas"))
        .arg(script.path())
        .arg("--config")
        .arg(config.path())
        .output()
        .expect("run flowcanvas");
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["blocks"][1]["position"]["x"], 50.0);
    assert_eq!(report["selected_blocks"][0], 1);
}

#[test]
fn missing_script_fails() {
    let output = run_cli(&[std::path::Path::new("/nonexistent/script.json")]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Open /nonexistent/script.json"));
}
