//! CLI integration tests: spawn the built `mdx` binary against a
//! temporary config and database.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mdx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mdx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/maildex.sqlite"

[retrieval]
alpha = 0.7
slow_query_ms = 150
"#,
        root.display()
    );

    let config_path = config_dir.join("maildex.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_mdx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mdx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mdx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mdx(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_mdx(&config_path, &["init"]);
    let (_, _, success2) = run_mdx(&config_path, &["init"]);
    assert!(success1);
    assert!(success2);
}

#[test]
fn test_stats_on_empty_index() {
    let (_tmp, config_path) = setup_test_env();

    run_mdx(&config_path, &["init"]);
    let (stdout, stderr, success) = run_mdx(&config_path, &["stats"]);
    assert!(success, "stats failed: stderr={}", stderr);
    assert!(stdout.contains("Fine chunks:   0"));
    assert!(stdout.contains("Coarse chunks: 0"));
}

#[test]
fn test_search_without_embeddings_degrades_to_no_results() {
    let (_tmp, config_path) = setup_test_env();

    run_mdx(&config_path, &["init"]);
    let (stdout, _, success) = run_mdx(&config_path, &["search", "project timeline"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_clear_requires_confirmation() {
    let (_tmp, config_path) = setup_test_env();

    run_mdx(&config_path, &["init"]);

    let (stdout, _, success) = run_mdx(&config_path, &["clear"]);
    assert!(success);
    assert!(stdout.contains("--yes"));

    let (stdout, _, success) = run_mdx(&config_path, &["clear", "--yes"]);
    assert!(success);
    assert!(stdout.contains("cleared"));
}

#[test]
fn test_index_pdf_missing_file_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_mdx(&config_path, &["init"]);
    let (_, _, success) = run_mdx(&config_path, &["index-pdf", "/nonexistent/report.pdf"]);
    assert!(!success);
}

#[test]
fn test_index_emails_without_source_config_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_mdx(&config_path, &["init"]);
    let (_, stderr, success) = run_mdx(&config_path, &["index-emails"]);
    assert!(!success);
    assert!(stderr.contains("sources.email_db"));
}
