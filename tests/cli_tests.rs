//! Command-line tests: import, match, review and status against a temporary library.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SCAN_TSV: &str = "external_id\ttitle\tauthor\tseries\tposition
101\tStormbreaker (Alex Rider, Book 1)\tAnthony Horowitz\t\t
102\tFoundation\tIsaac Asimov\tFoundation\t1
103\tThe Stand\tStephen King\t\t
";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("scan.tsv"), SCAN_TSV).unwrap();
        Self { dir }
    }

    fn library(&self) -> PathBuf {
        self.dir.path().join("library.json")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Command with the library flag set and the environment key cleared
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("series-matcher").unwrap();
        cmd.env_remove("SERIES_MATCHER_OPENAI_API_KEY")
            .arg("--library")
            .arg(self.library());
        cmd
    }

    fn imported_and_matched() -> Self {
        let ws = Self::new();
        ws.cmd().arg("import").arg(ws.path("scan.tsv")).assert().success();
        ws.cmd().arg("match").arg("--offline").assert().success();
        ws
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_help() {
    Command::cargo_bin("series-matcher")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("review"));
}

#[test]
fn test_import_creates_library() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("import")
        .arg(ws.path("scan.tsv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 new and 0 updated records"));

    let library = read_json(&ws.library());
    assert_eq!(library["version"], "1.0.0");
    assert_eq!(library["records"].as_array().unwrap().len(), 3);

    // Importing again updates in place
    ws.cmd()
        .arg("import")
        .arg(ws.path("scan.tsv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 0 new and 3 updated records"));
}

#[test]
fn test_import_rejects_bad_file() {
    let ws = Workspace::new();
    std::fs::write(ws.path("bad.tsv"), "only-one-column\n").unwrap();
    ws.cmd()
        .arg("import")
        .arg(ws.path("bad.tsv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("fewer than 2 fields"));
}

#[test]
fn test_match_json_summary() {
    let ws = Workspace::new();
    ws.cmd().arg("import").arg(ws.path("scan.tsv")).assert().success();

    let output = ws
        .cmd()
        .args(["--format", "json", "match", "--offline"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["processed"], 3);
    assert_eq!(summary["matched"], 2);
    assert_eq!(summary["unmatched"], 1);
    assert_eq!(summary["by_method"]["title-pattern"], 1);
    assert_eq!(summary["by_method"]["embedded-metadata"], 1);
}

#[test]
fn test_match_empty_library_warns() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["match", "--offline"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Library is empty"));
}

#[test]
fn test_review_list_pending() {
    let ws = Workspace::imported_and_matched();
    ws.cmd()
        .args(["review", "list", "--status", "pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stormbreaker (Alex Rider, Book 1)"))
        .stdout(predicate::str::contains("-> Alex Rider #1"))
        .stdout(predicate::str::contains("-> Foundation"));
}

#[test]
fn test_review_approve_then_reject() {
    let ws = Workspace::imported_and_matched();

    ws.cmd()
        .args(["review", "approve", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Match 1 approved"));
    ws.cmd()
        .args(["review", "reject", "1"])
        .assert()
        .success();

    let library = read_json(&ws.library());
    let membership = &library["memberships"][0];
    assert_eq!(membership["approved"], false);
    assert_eq!(membership["rejected"], true);
}

#[test]
fn test_review_unknown_id_fails() {
    let ws = Workspace::imported_and_matched();
    ws.cmd()
        .args(["review", "approve", "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Match 999 not found"));
}

#[test]
fn test_review_approve_all_uses_threshold() {
    let ws = Workspace::imported_and_matched();

    // Title pattern scores 85, embedded metadata 95
    ws.cmd()
        .args(["review", "approve-all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 matches approved"));
    ws.cmd()
        .args(["review", "approve-all", "--threshold", "80"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 matches approved"));
    ws.cmd()
        .args(["review", "approve-all", "--threshold", "101"])
        .assert()
        .failure();
}

#[test]
fn test_review_list_tsv() {
    let ws = Workspace::imported_and_matched();
    ws.cmd()
        .args(["--format", "tsv", "review", "list"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("id\trecord_id\ttitle"))
        .stdout(predicate::str::contains("title-pattern"));
}

#[test]
fn test_status_and_unmatched() {
    let ws = Workspace::imported_and_matched();
    ws.cmd().args(["review", "reject-all"]).assert().success();

    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Records:  3"))
        .stdout(predicate::str::contains("2 rejected"))
        .stdout(predicate::str::contains("Unmatched records: 1"));

    ws.cmd()
        .args(["status", "--unmatched"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The Stand by Stephen King"));
}

#[test]
fn test_config_file_disables_fuzzy() {
    let ws = Workspace::new();
    std::fs::write(
        ws.path("scan.tsv"),
        "1\tStormbreaker (Alex Rider, Book 1)\n2\tAlex Rider: Secret Weapon\n",
    )
    .unwrap();
    std::fs::write(
        ws.path("config.json"),
        r#"{"matching": {"fuzzyMatchEnabled": false}}"#,
    )
    .unwrap();

    ws.cmd().arg("import").arg(ws.path("scan.tsv")).assert().success();
    ws.cmd()
        .arg("--config")
        .arg(ws.path("config.json"))
        .args(["--format", "tsv", "match"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fuzzy\t0"))
        .stdout(predicate::str::contains("unmatched\t1"));
}

#[test]
fn test_invalid_config_fails() {
    let ws = Workspace::new();
    std::fs::write(
        ws.path("config.json"),
        r#"{"matching": {"confidenceThreshold": 250}}"#,
    )
    .unwrap();

    ws.cmd()
        .arg("--config")
        .arg(ws.path("config.json"))
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
