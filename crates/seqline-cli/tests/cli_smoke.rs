use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("events").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn seqline() -> Command {
    Command::cargo_bin("seqline").expect("seqline binary")
}

#[test]
fn cli_prints_layout_json() {
    let output = seqline()
        .args(["layout", "--text-measurer", "fixed"])
        .arg(fixture("basic.json"))
        .output()
        .expect("run seqline");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let layout: serde_json::Value = serde_json::from_slice(&output.stdout).expect("layout json");
    assert!(layout["width"].as_f64().unwrap() > 0.0);
    assert!(layout["height"].as_f64().unwrap() > 0.0);
    let elements = layout["elements"].as_array().expect("elements");
    assert!(elements.iter().any(|e| e["type"] == "loopArrow"));
    assert!(elements.iter().any(|e| e["type"] == "fragment"));
    assert!(elements.iter().any(|e| e["type"] == "destructor"));
}

#[test]
fn cli_renders_svg_to_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.svg");

    seqline()
        .args(["render", "--out", out.to_string_lossy().as_ref()])
        .arg(fixture("basic.json"))
        .assert()
        .success();

    let svg = fs::read_to_string(&out).expect("read svg");
    assert!(svg.starts_with("<svg "));
    assert!(svg.contains("login(name)"));
}

#[test]
fn cli_reads_stdin_and_applies_overrides() {
    let events = r#"[
        {"type": "createLifeline", "name": "a"},
        {"type": "createLifeline", "name": "b"},
        {"type": "call", "from": "a", "to": "b", "label": "x"}
    ]"#;
    let base = seqline()
        .args(["layout", "--text-measurer", "fixed", "-"])
        .write_stdin(events)
        .output()
        .expect("run seqline");
    let spaced = seqline()
        .args([
            "layout",
            "--text-measurer",
            "fixed",
            "--set",
            "sequence.bottomMargin=100",
            "-",
        ])
        .write_stdin(events)
        .output()
        .expect("run seqline");
    assert!(base.status.success());
    assert!(spaced.status.success());

    let base: serde_json::Value = serde_json::from_slice(&base.stdout).unwrap();
    let spaced: serde_json::Value = serde_json::from_slice(&spaced.stdout).unwrap();
    assert_eq!(
        spaced["height"].as_f64().unwrap() - base["height"].as_f64().unwrap(),
        90.0
    );
}

#[test]
fn cli_reports_semantic_errors_with_exit_code_3() {
    let output = seqline()
        .arg("layout")
        .arg(fixture("terminated.json"))
        .output()
        .expect("run seqline");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("event 3"), "stderr: {stderr}");
    assert!(stderr.contains("already destroyed"), "stderr: {stderr}");
}

#[test]
fn cli_rejects_unknown_flags() {
    seqline().arg("--bogus").assert().code(2);
}
