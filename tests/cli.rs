use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;

fn git(current_dir: &Path, args: &[&str]) -> Vec<u8> {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(current_dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {args:?}: {e}"));

    if !output.status.success() {
        panic!(
            "git {args:?} failed\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }

    output.stdout
}

fn init_repo(repo_dir: &Path) {
    std::fs::create_dir_all(repo_dir).unwrap();
    git(repo_dir, &["init", "-b", "main"]);
    git(repo_dir, &["config", "user.name", "Test User"]);
    git(repo_dir, &["config", "user.email", "test@example.com"]);

    std::fs::write(repo_dir.join("README.md"), "hello\n").unwrap();
    git(repo_dir, &["add", "README.md"]);
    git(repo_dir, &["commit", "-m", "initial"]);
}

fn parse_path(stdout: &[u8]) -> PathBuf {
    let s = String::from_utf8(stdout.to_vec()).expect("stdout should be utf-8");
    PathBuf::from(s.trim())
}

fn container() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let main = tmp.path().canonicalize().unwrap().join("main");
    init_repo(&main);
    (tmp, main)
}

#[test]
fn wtr_add_prints_path_and_writes_cd_file() {
    let (tmp, main) = container();
    let cd_file = tmp.path().join("cd_request");

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .arg("--cd-file")
        .arg(&cd_file)
        .args(["add", "feature"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "wtr add failed: {output:?}");

    let path = parse_path(&output.stdout);
    assert_eq!(path, main.parent().unwrap().join("feature"));
    assert!(path.join("README.md").exists());
    assert_eq!(
        std::fs::read_to_string(&cd_file).unwrap(),
        path.to_string_lossy()
    );
}

#[test]
fn wtr_list_prints_tab_separated_lines() {
    let (_tmp, main) = container();
    git(&main, &["worktree", "add", "-b", "feature", "../feature"]);

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .arg("list")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1), "wtr list: {output:?}");

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            format!("feature\t{}", main.parent().unwrap().join("feature").display()),
            format!("main\t{}", main.display()),
        ]
    );
}

#[test]
fn wtr_branch_switches_to_existing_worktree() {
    let (tmp, main) = container();
    git(&main, &["worktree", "add", "-b", "feature", "../feature"]);
    let cd_file = tmp.path().join("cd_request");

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .arg("--cd-file")
        .arg(&cd_file)
        .arg("feature")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "wtr feature: {output:?}");
    assert_eq!(
        parse_path(&output.stdout),
        main.parent().unwrap().join("feature")
    );
}

#[test]
fn wtr_unknown_branch_exits_with_error() {
    let (tmp, main) = container();
    let cd_file = tmp.path().join("cd_request");

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .arg("--cd-file")
        .arg(&cd_file)
        .arg("nope")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    assert!(!cd_file.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No worktree for branch: nope"), "{stderr}");
    assert!(stderr.contains("Available: main"), "{stderr}");
}

#[test]
fn wtr_outside_a_repository_exits_with_error() {
    let tmp = tempfile::tempdir().unwrap();

    let output = cargo_bin_cmd!("wtr")
        .current_dir(tmp.path())
        .arg("list")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Not a git repository"));
}

#[test]
fn wtr_prune_yes_removes_merged_worktrees() {
    let (_tmp, main) = container();
    git(&main, &["worktree", "add", "-b", "done", "../done"]);

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .args(["prune", "--yes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1), "wtr prune: {output:?}");
    assert!(!main.parent().unwrap().join("done").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Pruned 1 worktree(s)"));
}

#[test]
fn wtr_prune_reports_partial_failure() {
    let (_tmp, main) = container();
    git(&main, &["worktree", "add", "-b", "done", "../done"]);
    git(&main, &["worktree", "add", "-b", "held", "../held"]);
    git(&main, &["worktree", "lock", "../held"]);

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .args(["prune", "--yes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "wtr prune: {output:?}");
    assert!(!main.parent().unwrap().join("done").exists());
    assert!(main.parent().unwrap().join("held").exists());
}

#[test]
fn wtr_without_tty_declines_restructure() {
    let tmp = tempfile::tempdir().unwrap();
    let repo = tmp.path().canonicalize().unwrap().join("myproject");
    init_repo(&repo);

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&repo)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1), "wtr: {output:?}");
    assert!(repo.join(".git").is_dir());
}

#[test]
fn wtr_restructure_yes_moves_checkout() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().canonicalize().unwrap();
    // an unrelated project next to the one being restructured
    init_repo(&base.join("main"));
    let repo = base.join("myproject");
    init_repo(&repo);
    let cd_file = base.join("cd_request");

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&repo)
        .arg("--cd-file")
        .arg(&cd_file)
        .args(["restructure", "--yes"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "wtr restructure: {output:?}");

    let new_main = parse_path(&output.stdout);
    assert_eq!(new_main, repo.join("main"));
    assert!(new_main.join(".git").is_dir());
    assert!(!repo.join(".git").exists());
    assert!(base.join("main").join(".git").is_dir());
    assert_eq!(
        std::fs::read_to_string(&cd_file).unwrap(),
        new_main.to_string_lossy()
    );

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&new_main)
        .args(["add", "feature"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "wtr add: {output:?}");
    assert_eq!(parse_path(&output.stdout), repo.join("feature"));
}

#[test]
fn wtr_status_json_reports_branches() {
    let (_tmp, main) = container();
    git(&main, &["branch", "idle"]);
    std::fs::write(main.join("README.md"), "changed\n").unwrap();

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1), "wtr status: {output:?}");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["main_branch"], "main");
    let branches = json["branches"].as_array().unwrap();
    assert_eq!(branches.len(), 2);

    let idle = branches.iter().find(|b| b["branch"] == "idle").unwrap();
    assert_eq!(idle["dirty"]["state"], "unknown");
    assert!(idle.get("worktree").is_none());

    let main_entry = branches.iter().find(|b| b["branch"] == "main").unwrap();
    assert_eq!(main_entry["dirty"]["state"], "known");
    assert_eq!(main_entry["dirty"]["value"], true);
}

#[test]
fn wtr_shell_init_and_completion_need_no_repository() {
    let tmp = tempfile::tempdir().unwrap();

    let output = cargo_bin_cmd!("wtr")
        .current_dir(tmp.path())
        .args(["shell-init", "bash"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("WTR_CD_FILE"));

    let output = cargo_bin_cmd!("wtr")
        .current_dir(tmp.path())
        .args(["completion", "zsh"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stdout.is_empty());
}

#[test]
fn wtr_delete_refuses_main_checkout() {
    let (_tmp, main) = container();

    let output = cargo_bin_cmd!("wtr")
        .current_dir(&main)
        .args(["delete", "main"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(main.join(".git").is_dir());
}
