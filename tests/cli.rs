use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const DOC: &str = r#"[
  { "id": "a", "type": "h2", "children": [{ "text": "Guide" }] },
  { "id": "b", "type": "paragraph", "children": [{ "text": "Read <this>" }] }
]"#;

#[test]
#[allow(deprecated)]
fn test_render_read_only() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.json"), DOC).unwrap();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("render").arg("doc.json").arg("--read-only").current_dir(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "<h2 id=\"guide\">Guide</h2><p>Read &lt;this&gt;</p>",
        ));
}

#[test]
#[allow(deprecated)]
fn test_render_placeholder_from_config() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("doc.json"),
        r#"[{ "type": "paragraph", "children": [{ "text": "" }] }]"#,
    )
    .unwrap();
    fs::write(dir.path().join("config.json"), r#"{ "placeholder": "Start here" }"#).unwrap();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.args(["render", "doc.json", "--config", "config.json"])
        .current_dir(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("data-placeholder=\"Start here\""));
}

#[test]
#[allow(deprecated)]
fn test_check_reports_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("doc.json"),
        r#"[
          { "id": "same", "type": "paragraph", "children": [{ "text": "a" }] },
          { "id": "same", "type": "paragraph", "children": [{ "text": "b" }] },
          { "type": "relic-set", "children": [{ "text": "" }] }
        ]"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.args(["check", "doc.json", "--json"]).current_dir(dir.path());

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["blocks"], 3);
    assert_eq!(json["missingIds"], 1);
    assert_eq!(json["duplicateIds"], serde_json::json!(["same"]));
    assert_eq!(json["extensions"], serde_json::json!(["relic-set"]));
}

#[test]
#[allow(deprecated)]
fn test_replay_applies_commands() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.json"), DOC).unwrap();
    fs::write(
        dir.path().join("commands.json"),
        r###"[
          { "command": "select", "selection": {
              "anchor": { "path": [1, 0], "offset": 0 },
              "focus": { "path": [1, 0], "offset": 0 } } },
          { "command": "insert-text", "text": "## " },
          { "command": "drop-block", "activeId": "b", "overId": "a" }
        ]"###,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.args(["replay", "doc.json", "commands.json"]).current_dir(dir.path());

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["id"], "b");
    assert_eq!(json[0]["type"], "h2");
    assert_eq!(json[1]["id"], "a");
}

#[test]
#[allow(deprecated)]
fn test_replay_reports_failing_command() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.json"), DOC).unwrap();
    fs::write(
        dir.path().join("commands.json"),
        r#"[{ "command": "remove-node", "path": [7] }]"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.args(["replay", "doc.json", "commands.json"]).current_dir(dir.path());

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("command 0 (remove-node)"));
}

#[test]
#[allow(deprecated)]
fn test_save_publish_history() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("doc.json"), DOC).unwrap();
    let target = ["--store", "store", "--site", "wiki", "--entry", "guide"];

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("save").args(target).arg("doc.json").current_dir(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Saved draft for wiki/guide/main"));

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("history").args(target).current_dir(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No published versions"))
        .stdout(predicate::str::contains("unpublished changes"));

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("publish").args(target).current_dir(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Published wiki/guide/main"));

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("history").args(target).arg("--json").current_dir(dir.path());
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["versions"].as_array().unwrap().len(), 1);
    assert_eq!(json["changed"], false);

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.args(["entries", "--store", "store"]).current_dir(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("wiki/guide/main"));
}

#[test]
#[allow(deprecated)]
fn test_publish_without_draft_fails() {
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.args(["publish", "--store", "store", "--site", "wiki", "--entry", "none"])
        .current_dir(dir.path());
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no content stored for wiki/none/main"));
}

#[test]
#[allow(deprecated)]
fn test_restore_version_from_history() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("first.json"), DOC).unwrap();
    fs::write(
        dir.path().join("second.json"),
        r#"[{ "id": "a", "type": "paragraph", "children": [{ "text": "Rewritten" }] }]"#,
    )
    .unwrap();
    let target = ["--store", "store", "--site", "wiki", "--entry", "guide"];

    for file in ["first.json", "second.json"] {
        let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
        cmd.arg("save").args(target).arg(file).current_dir(dir.path());
        cmd.assert().success();
        let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
        cmd.arg("publish").args(target).current_dir(dir.path());
        cmd.assert().success();
    }

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("history").args(target).arg("--json").current_dir(dir.path());
    let output = cmd.output().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let oldest = json["versions"][1]["id"].as_str().unwrap().to_string();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("restore").args(target).arg(&oldest).current_dir(dir.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(format!("Restored wiki/guide/main to version {oldest}")));

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("history").args(target).arg("--json").current_dir(dir.path());
    let output = cmd.output().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["versions"].as_array().unwrap().len(), 2);
    assert_eq!(json["changed"], true);

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.arg("restore").args(target).arg("missing").current_dir(dir.path());
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown version `missing`"));
}

#[test]
#[allow(deprecated)]
fn test_check_reports_nested_extensions() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("doc.json"),
        r#"[
          { "id": "l", "type": "bulleted-list", "children": [
            { "id": "i", "type": "list-item", "children": [
              { "id": "x", "type": "tier-list", "children": [{ "text": "" }] }
            ]}
          ]}
        ]"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("wiki-editor").unwrap();
    cmd.args(["check", "doc.json", "--json"]).current_dir(dir.path());

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["extensions"], serde_json::json!(["tier-list"]));
}
