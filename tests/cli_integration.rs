//! CLI integration tests for linefix
//!
//! These tests verify the complete workflow from initialization through
//! the session fix loop, ensuring commands work together correctly.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the linefix binary
fn linefix_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("linefix"))
}

/// Create a temporary directory and initialize a linefix workspace
fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    linefix_cmd().arg("init").arg(dir.path()).assert().success();
    dir
}

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    linefix_cmd()
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized linefix workspace"));

    assert!(dir.path().join(".linefix").is_dir());
    assert!(dir.path().join(".linefix/sessions").is_dir());
    assert!(dir.path().join(".linefix/config.toml").is_file());
    assert!(dir.path().join(".linefix/.gitignore").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    linefix_cmd().arg("init").arg(dir.path()).assert().success();
    linefix_cmd().arg("init").arg(dir.path()).assert().success();
}

// =============================================================================
// Transform Tests
// =============================================================================

#[test]
fn test_encode_numbers_lines() {
    let dir = TempDir::new().unwrap();
    let source = write_file(dir.path(), "a.cpp", "int a;\nint b;\n");

    linefix_cmd()
        .arg("encode")
        .arg(&source)
        .assert()
        .success()
        .stdout("1: int a;\n2: int b;\n");
}

#[test]
fn test_encode_strip_round_trip_through_files() {
    let dir = TempDir::new().unwrap();
    let original = "int a;\n\n    indented\nlast without newline";
    let source = write_file(dir.path(), "a.cpp", original);
    let numbered = dir.path().join("numbered.txt");
    let restored = dir.path().join("restored.cpp");

    linefix_cmd()
        .args(["encode", "-o"])
        .arg(&numbered)
        .arg(&source)
        .assert()
        .success();

    linefix_cmd()
        .args(["strip", "-o"])
        .arg(&restored)
        .arg(&numbered)
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&restored).unwrap(), original);
}

#[test]
fn test_encode_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    linefix_cmd()
        .arg("encode")
        .arg(dir.path().join("missing.cpp"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source not found"));
}

#[test]
fn test_encode_rejects_binary_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.bin");
    fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();

    linefix_cmd()
        .arg("encode")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid UTF-8"));
}

#[test]
fn test_parse_extracts_patch_and_reports_skips() {
    let dir = TempDir::new().unwrap();
    let response = write_file(
        dir.path(),
        "response.txt",
        "Fixing line 2:\n```cpp\n2: int bb; // fixed\nnot a code line\n```\n",
    );

    let output = linefix_cmd()
        .args(["parse", "--format", "json"])
        .arg(&response)
        .assert()
        .success()
        .stderr(predicate::str::contains("skipped"));

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["patch"]["2"], "int bb; // fixed");
    assert_eq!(json["skipped"][0]["reason"], "not_anchored");
}

#[test]
fn test_parse_strict_fails_on_junk() {
    let dir = TempDir::new().unwrap();
    let response = write_file(dir.path(), "response.txt", "```\n1: ok\ngarbage\n```");

    linefix_cmd()
        .args(["parse", "--strict"])
        .arg(&response)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unparseable"));
}

#[test]
fn test_apply_merges_in_canonical_order() {
    let dir = TempDir::new().unwrap();
    let base = write_file(dir.path(), "numbered.txt", "1: int a;\n2: int b;\n3: int c;\n");
    let patch = write_file(
        dir.path(),
        "patch.json",
        r#"{"2a":"int b_new;","2":"int bb; // fixed"}"#,
    );

    linefix_cmd()
        .arg("apply")
        .arg("--base")
        .arg(&base)
        .arg("--patch")
        .arg(&patch)
        .assert()
        .success()
        .stdout("1:int a;\n2:int bb; // fixed\n2a:int b_new;\n3:int c;\n");
}

#[test]
fn test_apply_warns_on_stale_anchor() {
    let dir = TempDir::new().unwrap();
    let base = write_file(dir.path(), "numbered.txt", "1: only line\n");
    let patch = write_file(dir.path(), "patch.json", r#"{"50":"stale"}"#);

    linefix_cmd()
        .arg("apply")
        .arg("--base")
        .arg(&base)
        .arg("--patch")
        .arg(&patch)
        .assert()
        .success()
        .stderr(predicate::str::contains("outside the original line range"));
}

#[test]
fn test_diff_json_shape() {
    let dir = TempDir::new().unwrap();
    let source = write_file(dir.path(), "a.cpp", "int a;\nint b;\nint c;\n");
    let patch = write_file(
        dir.path(),
        "patch.json",
        r#"{"2":"int bb; // fixed","2a":"int b_new;"}"#,
    );

    let output = linefix_cmd()
        .args(["diff", "--format", "json", "--source"])
        .arg(&source)
        .arg("--patch")
        .arg(&patch)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["has_changes"], true);
    assert_eq!(
        json["fixed"],
        "int a;\nint bb; // fixed\nint b_new;\nint c;\n"
    );
    assert_eq!(json["highlight"]["line_mappings"]["2"], 2);
    assert_eq!(json["highlight"]["line_mappings"]["3"], 4);
    assert_eq!(json["highlight"]["changed_lines"][0], 2);
    assert_eq!(json["highlight"]["added_lines"][0], 3);
    assert_eq!(json["highlight"]["removed_lines"], serde_json::json!([]));
}

// =============================================================================
// Session Tests
// =============================================================================

fn create_session(dir: &Path, file: &str, content: &str) -> String {
    let source = write_file(dir, file, content);
    let output = linefix_cmd()
        .current_dir(dir)
        .args(["session", "new", "--format", "json"])
        .arg(&source)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    json["id"].as_str().unwrap().to_string()
}

#[test]
fn test_session_new_and_list() {
    let dir = setup_workspace();
    create_session(dir.path(), "door.cpp", "int a;\n");

    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("door.cpp"));
}

#[test]
fn test_session_requires_workspace() {
    let dir = TempDir::new().unwrap();
    let source = write_file(dir.path(), "a.cpp", "int a;\n");

    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "new"])
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not in a linefix workspace"));
}

#[test]
fn test_session_fix_loop() {
    let dir = setup_workspace();
    let id = create_session(dir.path(), "door.cpp", "int a;\nint b;\nint c;\n");

    // The numbered text is what goes to the AI.
    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "numbered", &id])
        .assert()
        .success()
        .stdout("1: int a;\n2: int b;\n3: int c;\n");

    // Round one: the AI fixes line 2 and inserts a line after it.
    write_file(
        dir.path(),
        "round1.txt",
        "Here you go:\n```cpp\n2: int bb; // fixed\n2a: int b_new;\n```\n",
    );
    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "absorb", &id, "round1.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Absorbed 2 line(s)"));

    // Round two supersedes the earlier fix of line 2.
    write_file(dir.path(), "round2.txt", "```cpp\n2: int b2;\n```\n");
    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "absorb", &id, "round2.txt"])
        .assert()
        .success();

    // Export the fixed file.
    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "export", &id, "-o", "fixed.cpp"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("fixed.cpp")).unwrap(),
        "int a;\nint b2;\nint b_new;\nint c;\n"
    );
}

#[test]
fn test_session_diff_reports_changes() {
    let dir = setup_workspace();
    let id = create_session(dir.path(), "door.cpp", "int a;\nint b;\nint c;\n");

    write_file(dir.path(), "round.txt", "```\n2: int bb;\n```");
    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "absorb", &id, "round.txt"])
        .assert()
        .success();

    let output = linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "diff", &id, "--format", "json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["has_changes"], true);
    assert_eq!(json["highlight"]["changed_lines"][0], 2);
}

#[test]
fn test_session_delete_removes() {
    let dir = setup_workspace();
    let id = create_session(dir.path(), "door.cpp", "int a;\n");

    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "delete", &id])
        .assert()
        .success();

    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "delete", &id])
        .assert()
        .failure();
}

#[test]
fn test_session_absorb_strict_from_config() {
    let dir = setup_workspace();
    fs::write(
        dir.path().join(".linefix/config.toml"),
        "strict_parse = true\n",
    )
    .unwrap();

    let id = create_session(dir.path(), "door.cpp", "int a;\n");
    write_file(dir.path(), "round.txt", "```\n1: ok\njunk line\n```");

    linefix_cmd()
        .current_dir(dir.path())
        .args(["session", "absorb", &id, "round.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unparseable"));
}
