//! `docs-rag-load`: ingest new files from a data directory.
//!
//! Every regular file directly inside the data directory is read. Files the
//! collection already knows are skipped; the kept lines of the rest are
//! added under fresh ids in batches.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use walkdir::WalkDir;

use docs_rag_core::models::SourceFile;
use docs_rag_core::reconcile::Reconciler;
use docs_rag_core::store::DocumentStore;

use crate::config::EmbeddingConfig;
use crate::db;
use crate::embedding::Embedder;
use crate::progress::{LoadProgressEvent, ProgressMode};
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub data_directory: PathBuf,
    pub collection_name: String,
    pub persist_directory: PathBuf,
    pub embedding: EmbeddingConfig,
    pub progress: ProgressMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records in the collection before loading.
    pub existing: usize,
    pub added: usize,
    pub skipped: Vec<String>,
}

pub async fn run_load(opts: &LoadOptions) -> Result<LoadSummary> {
    let embedder = Embedder::from_config(&opts.embedding)?.map(Arc::new);
    let pool = db::connect(&opts.persist_directory).await?;
    let store = SqliteStore::get_or_create_collection(pool, &opts.collection_name, embedder).await?;

    let reporter = opts.progress.reporter();
    reporter.report(LoadProgressEvent::Scanning {
        directory: opts.data_directory.display().to_string(),
    });

    let on_batch = |written: usize, total: usize| {
        reporter.report(LoadProgressEvent::Writing {
            written: written as u64,
            total: total as u64,
        })
    };
    let reconciler = Reconciler::new(&store).with_progress(&on_batch);
    let mut skipped = Vec::new();
    let mut files = Vec::new();

    for path in list_files(&opts.data_directory)? {
        let filename = file_name(&path)?;
        if reconciler.is_ingested(&filename).await? {
            println!("{} file already exists in the collection, skip it!", filename);
            skipped.push(filename);
            continue;
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(SourceFile::new(filename, content));
    }

    let existing = store.count().await?;
    println!("Collection already contains {} documents", existing);

    let written = reconciler.append_files(&files).await?;

    let added = store.count().await?.saturating_sub(existing);
    println!("Added {} documents", added);
    info!(
        collection = %opts.collection_name,
        files = files.len(),
        records = written,
        "load complete"
    );

    store.close().await;

    Ok(LoadSummary {
        existing,
        added,
        skipped,
    })
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Data directory does not exist: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("No file name in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(tmp: &TempDir) -> LoadOptions {
        LoadOptions {
            data_directory: tmp.path().join("docs"),
            collection_name: "docs_collection".to_string(),
            persist_directory: tmp.path().join("storage"),
            embedding: EmbeddingConfig::default(),
            progress: ProgressMode::Off,
        }
    }

    #[test]
    fn test_list_files_is_flat_and_sorted() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(docs.join("nested")).unwrap();
        fs::write(docs.join("b.txt"), "b").unwrap();
        fs::write(docs.join("a.txt"), "a").unwrap();
        fs::write(docs.join("nested/c.txt"), "c").unwrap();

        let names: Vec<String> = list_files(&docs)
            .unwrap()
            .iter()
            .map(|p| file_name(p).unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(list_files(&tmp.path().join("absent")).is_err());
    }

    #[tokio::test]
    async fn test_load_twice_adds_nothing_the_second_time() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("a.txt"), "one\n\ntwo\n").unwrap();
        fs::write(docs.join("b.txt"), "three").unwrap();

        let first = run_load(&options(&tmp)).await.unwrap();
        assert_eq!(first.existing, 0);
        assert_eq!(first.added, 3);

        let second = run_load(&options(&tmp)).await.unwrap();
        assert_eq!(second.existing, 3);
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_new_file_continues_id_sequence() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("a.txt"), "x\ny").unwrap();
        run_load(&options(&tmp)).await.unwrap();

        fs::write(docs.join("b.txt"), "z").unwrap();
        let summary = run_load(&options(&tmp)).await.unwrap();
        assert_eq!(summary.added, 1);

        let pool = db::connect(&tmp.path().join("storage")).await.unwrap();
        let store = SqliteStore::open_collection(pool, "docs_collection", None)
            .await
            .unwrap();
        let b = store.get(Some("b.txt")).await.unwrap();
        assert_eq!(b[0].id, "2");
        assert_eq!(b[0].line_number, 1);
    }
}
