//! End-to-end tests driving the `twig` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

fn twig(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("twig").unwrap();
    cmd.current_dir(dir).env_remove("TWIG_LOG");
    cmd
}

fn run(dir: &Path, args: &[&str]) {
    twig(dir).args(args).assert().success().stdout("");
}

fn repo() -> TempDir {
    let dir = tempdir().unwrap();
    run(dir.path(), &["init"]);
    dir
}

fn commit_file(dir: &Path, path: &str, content: &str, message: &str) {
    fs::write(dir.join(path), content).unwrap();
    run(dir, &["add", path]);
    run(dir, &["commit", message]);
}

#[test]
fn test_init_twice() {
    let dir = repo();
    twig(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_command_outside_repository() {
    let dir = tempdir().unwrap();
    twig(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout("Not in an initialized twig directory.\n");
}

#[test]
fn test_commit_with_nothing_staged() {
    let dir = repo();
    twig(dir.path())
        .args(["commit", "x"])
        .assert()
        .success()
        .stdout("No changes added to the commit.\n");
}

#[test]
fn test_commit_with_empty_message() {
    let dir = repo();
    fs::write(dir.path().join("f"), "x").unwrap();
    run(dir.path(), &["add", "f"]);
    twig(dir.path())
        .args(["commit", ""])
        .assert()
        .success()
        .stdout("Please enter a commit message.\n");
}

#[test]
fn test_missing_argument_is_usage_error() {
    let dir = repo();
    twig(dir.path()).arg("commit").assert().code(2);
    twig(dir.path()).arg("frobnicate").assert().code(2);
}

#[test]
fn test_log_lists_commits_newest_first() {
    let dir = repo();
    commit_file(dir.path(), "f", "one\n", "add f");
    commit_file(dir.path(), "f", "two\n", "mod f");

    let output = twig(dir.path()).arg("log").output().unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert_eq!(stdout.matches("===\ncommit ").count(), 3);
    let mod_pos = stdout.find("\nmod f\n").unwrap();
    let add_pos = stdout.find("\nadd f\n").unwrap();
    let root_pos = stdout.find("\ninitial commit\n").unwrap();
    assert!(mod_pos < add_pos && add_pos < root_pos);
    assert!(stdout.contains("Date: Thu Jan 1 ") || stdout.contains("Date: Wed Dec 31 "));
}

#[test]
fn test_log_json() {
    let dir = repo();
    commit_file(dir.path(), "f", "one\n", "add f");

    let output = twig(dir.path()).args(["log", "--format", "json"]).output().unwrap();
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[0]["message"], "add f");
    assert_eq!(entries[0]["files"]["f"].as_str().unwrap().len(), 64);
}

#[test]
fn test_find_and_global_log() {
    let dir = repo();
    commit_file(dir.path(), "f", "one\n", "add f");

    let output = twig(dir.path()).args(["find", "add f"]).output().unwrap();
    let id = String::from_utf8(output.stdout).unwrap();
    assert_eq!(id.trim().len(), 64);

    twig(dir.path())
        .arg("global-log")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("commit {}", id.trim())));

    twig(dir.path())
        .args(["find", "no such message"])
        .assert()
        .success()
        .stdout("Found no commit with that message.\n");
}

#[test]
fn test_status_layout() {
    let dir = repo();
    commit_file(dir.path(), "tracked", "t\n", "base");
    run(dir.path(), &["branch", "feat"]);
    fs::write(dir.path().join("staged"), "s\n").unwrap();
    run(dir.path(), &["add", "staged"]);
    fs::write(dir.path().join("tracked"), "edited\n").unwrap();
    fs::write(dir.path().join("loose"), "l\n").unwrap();

    let expected = "\
=== Branches ===
feat
*master

=== Staged Files ===
staged

=== Removed Files ===

=== Modifications Not Staged For Commit ===
tracked (modified)

=== Untracked Files ===
loose

";
    twig(dir.path()).arg("status").assert().success().stdout(expected);
}

#[test]
fn test_checkout_forms() {
    let dir = repo();
    commit_file(dir.path(), "f", "v1\n", "v1");
    let output = twig(dir.path()).args(["find", "v1"]).output().unwrap();
    let first = String::from_utf8(output.stdout).unwrap().trim().to_string();
    commit_file(dir.path(), "f", "v2\n", "v2");

    fs::write(dir.path().join("f"), "scribble\n").unwrap();
    run(dir.path(), &["checkout", "--", "f"]);
    assert_eq!(fs::read_to_string(dir.path().join("f")).unwrap(), "v2\n");

    run(dir.path(), &["checkout", &first[..8], "--", "f"]);
    assert_eq!(fs::read_to_string(dir.path().join("f")).unwrap(), "v1\n");

    twig(dir.path())
        .args(["checkout", "nope"])
        .assert()
        .success()
        .stdout("A branch with that name does not exist.\n");
    twig(dir.path())
        .arg("checkout")
        .assert()
        .success()
        .stdout("Incorrect operands.\n");
}

#[test]
fn test_merge_disjoint_changes() {
    let dir = repo();
    commit_file(dir.path(), "base", "b\n", "base");
    run(dir.path(), &["branch", "feat"]);
    commit_file(dir.path(), "ours", "o\n", "master work");
    run(dir.path(), &["checkout", "feat"]);
    commit_file(dir.path(), "theirs", "t\n", "feat work");
    run(dir.path(), &["checkout", "master"]);

    run(dir.path(), &["merge", "feat"]);
    assert_eq!(fs::read_to_string(dir.path().join("theirs")).unwrap(), "t\n");
    assert_eq!(fs::read_to_string(dir.path().join("ours")).unwrap(), "o\n");

    twig(dir.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("===\ncommit "))
        .stdout(predicate::str::contains("Merge: "))
        .stdout(predicate::str::contains("Merged feat into master."));
}

#[test]
fn test_merge_conflict_writes_markers() {
    let dir = repo();
    commit_file(dir.path(), "f", "base\n", "base");
    run(dir.path(), &["branch", "feat"]);
    commit_file(dir.path(), "f", "foo\n", "ours");
    run(dir.path(), &["checkout", "feat"]);
    commit_file(dir.path(), "f", "bar\n", "theirs");
    run(dir.path(), &["checkout", "master"]);

    twig(dir.path())
        .args(["merge", "feat"])
        .assert()
        .success()
        .stdout("Encountered a merge conflict.\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("f")).unwrap(),
        "<<<<<<< HEAD\nfoo\n=======\nbar\n>>>>>>>\n"
    );

    // The merge commit exists even though the merge conflicted.
    twig(dir.path())
        .args(["find", "Merged feat into master."])
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").unwrap());
}

#[test]
fn test_reset_and_rm_branch() {
    let dir = repo();
    commit_file(dir.path(), "f", "v1\n", "v1");
    let output = twig(dir.path()).args(["find", "v1"]).output().unwrap();
    let first = String::from_utf8(output.stdout).unwrap().trim().to_string();
    commit_file(dir.path(), "g", "g\n", "add g");

    run(dir.path(), &["reset", &first]);
    assert!(!dir.path().join("g").exists());

    run(dir.path(), &["branch", "tmp"]);
    run(dir.path(), &["rm-branch", "tmp"]);
    twig(dir.path())
        .args(["rm-branch", "master"])
        .assert()
        .success()
        .stdout("Cannot remove the current branch.\n");
}

#[test]
fn test_corrupt_state_exits_nonzero() {
    let dir = repo();
    fs::write(dir.path().join(".twig/refs.json"), "not json").unwrap();
    twig(dir.path())
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("error: "));
}
