use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn binary(name: &str) -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push(name);
    path
}

/// Temp workspace with a `docs/` directory and a `settings.yaml` pointing
/// at `storage/`.
fn setup_test_env() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("alpha.txt"),
        "Rust is a systems programming language.\n\nCargo builds Rust crates.\n",
    )
    .unwrap();
    fs::write(docs.join("beta.txt"), "Paris is the capital of France.\n").unwrap();

    let settings = format!(
        r#"model:
  base_model_url: http://127.0.0.1:9/v1
  model_name: test-model
  service_provider: test
chromadb:
  persist_directory: {root}/storage
  collection_name: docs_collection
  documents_directory: {root}/docs
  n_results: 3
"#,
        root = root.display()
    );
    fs::write(root.join("settings.yaml"), settings).unwrap();

    tmp
}

fn run(dir: &Path, name: &str, args: &[&str]) -> (String, String, bool) {
    let bin = binary(name);
    let output = Command::new(&bin)
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run {:?}: {}", bin, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn load(dir: &Path) -> (String, String, bool) {
    run(
        dir,
        "docs-rag-load",
        &[
            "--data_directory",
            "docs",
            "--persist_directory",
            "storage",
            "--progress",
            "off",
        ],
    )
}

#[test]
fn test_load_reports_counts() {
    let tmp = setup_test_env();
    let (stdout, stderr, success) = load(tmp.path());
    assert!(success, "load failed: {}", stderr);
    assert!(stdout.contains("Collection already contains 0 documents"));
    assert!(stdout.contains("Added 3 documents"));
    assert!(tmp.path().join("storage/docs-rag.sqlite").exists());
}

#[test]
fn test_load_twice_skips_known_files() {
    let tmp = setup_test_env();
    load(tmp.path());

    let (stdout, _, success) = load(tmp.path());
    assert!(success);
    assert!(stdout.contains("alpha.txt file already exists in the collection, skip it!"));
    assert!(stdout.contains("Collection already contains 3 documents"));
    assert!(stdout.contains("Added 0 documents"));
}

#[test]
fn test_load_missing_data_directory_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run(
        tmp.path(),
        "docs-rag-load",
        &["--data_directory", "nope", "--progress", "off"],
    );
    assert!(!success);
    assert!(stderr.contains("Data directory does not exist"));
}

#[test]
fn test_modify_without_flags_is_insufficient() {
    let tmp = setup_test_env();
    let (stdout, _, success) = run(tmp.path(), "docs-rag-modify", &[]);
    assert!(success);
    assert!(stdout.contains("The parameter is insufficient!"));
}

#[test]
fn test_modify_update_and_delete_are_exclusive() {
    let tmp = setup_test_env();
    let (_, _, success) = run(
        tmp.path(),
        "docs-rag-modify",
        &["-u", "alpha.txt", "-d", "beta.txt"],
    );
    assert!(!success);
}

#[test]
fn test_modify_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run(tmp.path(), "docs-rag-modify", &["-d", "a.txt"]);
    assert!(!success);
    assert!(stderr.contains("config file not found"));
}

#[test]
fn test_modify_update_and_delete() {
    let tmp = setup_test_env();
    load(tmp.path());

    fs::write(
        tmp.path().join("docs/alpha.txt"),
        "Rust is a systems programming language.\nCargo builds Rust crates.\nClippy lints them.\n",
    )
    .unwrap();

    let (stdout, stderr, success) = run(
        tmp.path(),
        "docs-rag-modify",
        &["--update", "ghost.txt,alpha.txt"],
    );
    assert!(success, "modify failed: {}", stderr);
    assert!(stdout.contains("ghost.txt file doesn't exist in the collection!"));
    assert!(stdout.contains("Updated alpha.txt file!"));

    let (stdout, _, success) = run(tmp.path(), "docs-rag-modify", &["-d", "beta.txt"]);
    assert!(success);
    assert!(stdout.contains("beta.txt file has been deleted!"));

    // alpha.txt now has 3 lines; beta.txt is gone
    let (stdout, _, _) = load(tmp.path());
    assert!(stdout.contains("Collection already contains 3 documents"));
    assert!(stdout.contains("Added 1 documents"));
}

#[test]
fn test_modify_unknown_collection_fails() {
    let tmp = setup_test_env();
    let (_, stderr, success) = run(tmp.path(), "docs-rag-modify", &["-d", "beta.txt"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_chat_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run(tmp.path(), "docs-rag-chat", &[]);
    assert!(!success);
    assert!(stderr.contains("settings.yaml config file not found!"));
}
