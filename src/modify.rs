//! `docs-rag-modify`: re-read or remove already ingested files.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use docs_rag_core::reconcile::{DeleteOutcome, ReconcileOutcome, Reconciler};
use docs_rag_core::store::DocumentStore;

use crate::config::Config;
use crate::db;
use crate::embedding::Embedder;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyAction {
    Update(Vec<String>),
    Delete(Vec<String>),
}

/// What happened to one requested file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Updated(ReconcileOutcome),
    Deleted { removed: usize },
    NotFound,
    Unreadable(String),
}

/// Split a comma-delimited list of filenames, dropping empty entries.
pub fn split_filenames(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn run_modify(config: &Config, action: &ModifyAction) -> Result<Vec<(String, FileStatus)>> {
    let embedder = Embedder::from_config(&config.embedding)?.map(Arc::new);
    let pool = db::connect(&config.chromadb.persist_directory).await?;
    let store =
        SqliteStore::open_collection(pool, &config.chromadb.collection_name, embedder).await?;

    let results = modify_files(&store, &config.chromadb.documents_directory, action).await;
    store.close().await;
    results
}

/// Apply `action` file by file. Files the collection does not know, and
/// files that cannot be read, are reported and skipped.
pub async fn modify_files(
    store: &dyn DocumentStore,
    documents_directory: &Path,
    action: &ModifyAction,
) -> Result<Vec<(String, FileStatus)>> {
    let reconciler = Reconciler::new(store);
    let mut results = Vec::new();

    match action {
        ModifyAction::Update(files) => {
            for filename in files {
                let status = if !reconciler.is_ingested(filename).await? {
                    FileStatus::NotFound
                } else {
                    let path = documents_directory.join(filename);
                    match std::fs::read_to_string(&path) {
                        Ok(content) => {
                            FileStatus::Updated(reconciler.reconcile_file(filename, &content).await?)
                        }
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "cannot read source file");
                            FileStatus::Unreadable(e.to_string())
                        }
                    }
                };
                print_status(filename, &status);
                results.push((filename.clone(), status));
            }
        }
        ModifyAction::Delete(files) => {
            for filename in files {
                let status = match reconciler.delete_file(filename).await? {
                    DeleteOutcome::Deleted { removed } => FileStatus::Deleted { removed },
                    DeleteOutcome::NotFound => FileStatus::NotFound,
                };
                print_status(filename, &status);
                results.push((filename.clone(), status));
            }
        }
    }

    Ok(results)
}

fn print_status(filename: &str, status: &FileStatus) {
    match status {
        FileStatus::NotFound | FileStatus::Updated(ReconcileOutcome::NotFound) => {
            println!("{} file doesn't exist in the collection!", filename)
        }
        FileStatus::Updated(_) => println!("Updated {} file!", filename),
        FileStatus::Deleted { .. } => println!("{} file has been deleted!", filename),
        FileStatus::Unreadable(e) => eprintln!("Failed to read {} file: {}", filename, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docs_rag_core::models::SourceFile;
    use docs_rag_core::store::memory::InMemoryStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_filenames() {
        assert_eq!(split_filenames("a.txt, b.txt,,"), vec!["a.txt", "b.txt"]);
        assert!(split_filenames("").is_empty());
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        Reconciler::new(&store)
            .ingest_new_files(&[
                SourceFile::new("a.txt", "one\ntwo"),
                SourceFile::new("b.txt", "three"),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_update_continues_past_unknown_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "ONE\nTWO").unwrap();
        let store = seeded().await;

        let results = modify_files(
            &store,
            tmp.path(),
            &ModifyAction::Update(vec!["ghost.txt".into(), "a.txt".into()]),
        )
        .await
        .unwrap();

        assert_eq!(results[0], ("ghost.txt".to_string(), FileStatus::NotFound));
        assert_eq!(
            results[1].1,
            FileStatus::Updated(ReconcileOutcome::Updated { lines: 2 })
        );
        let texts: Vec<String> = store
            .get(Some("a.txt"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["ONE", "TWO"]);
    }

    #[tokio::test]
    async fn test_update_with_missing_source_is_reported() {
        let tmp = TempDir::new().unwrap();
        let store = seeded().await;
        let results = modify_files(&store, tmp.path(), &ModifyAction::Update(vec!["b.txt".into()]))
            .await
            .unwrap();
        assert!(matches!(results[0].1, FileStatus::Unreadable(_)));
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let tmp = TempDir::new().unwrap();
        let store = seeded().await;
        let results = modify_files(
            &store,
            tmp.path(),
            &ModifyAction::Delete(vec!["a.txt".into(), "a.txt".into()]),
        )
        .await
        .unwrap();
        assert_eq!(results[0].1, FileStatus::Deleted { removed: 2 });
        assert_eq!(results[1].1, FileStatus::NotFound);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
