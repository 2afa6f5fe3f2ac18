//! Incremental ingestion and id reconciliation.
//!
//! Keeps a [`DocumentStore`]'s line records consistent with the current
//! content of a set of source files without ever reusing or duplicating an
//! id.
//!
//! # Policy
//!
//! | Situation | Action |
//! |-----------|--------|
//! | File has no records | ingest: append with fresh ids |
//! | Re-read file, same kept-line count | update text in place, ids kept |
//! | Re-read file, different count | delete all, re-add with fresh ids |
//! | Delete requested | remove every record of the file |
//!
//! The store cannot insert a line at an index, only replace whole records,
//! so any change in line count breaks positional correspondence and forces a
//! full rewrite of the file's records.
//!
//! Known gap: blank lines are dropped before numbering, so a blank line that
//! moves inside a file without changing the kept-line count is treated as
//! "same count" and updated positionally.
//!
//! Fresh ids always come from a full scan of the store ([`next_ids`]). That
//! is O(store size) per call, which is fine for batch ingestion of a small
//! corpus.

use anyhow::Result;

use crate::lines::{kept_lines, next_ids, KeptLine};
use crate::models::{LineRecord, SourceFile};
use crate::store::DocumentStore;

/// Records are written to the store in chunks of this size.
pub const BATCH_SIZE: usize = 100;

/// Summary of [`Reconciler::ingest_new_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Number of records written.
    pub added: usize,
    /// Files skipped because the store already holds records for them.
    pub skipped: Vec<String>,
}

/// Result of [`Reconciler::reconcile_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Line count unchanged; text replaced in place under the existing ids.
    Updated { lines: usize },
    /// Line count changed; old records removed and new ones added.
    Replaced { removed: usize, added: usize },
    /// The store holds no records for the file.
    NotFound,
}

/// Result of [`Reconciler::delete_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { removed: usize },
    NotFound,
}

/// Callback invoked after each batch is written: `(written_so_far, total)`.
pub type BatchProgress<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Applies the ingestion policy to an injected store.
pub struct Reconciler<'a> {
    store: &'a dyn DocumentStore,
    progress: Option<BatchProgress<'a>>,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            progress: None,
        }
    }

    /// Report progress after every batch written by this reconciler.
    pub fn with_progress(mut self, progress: BatchProgress<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Whether the store already holds records for `filename`.
    pub async fn is_ingested(&self, filename: &str) -> Result<bool> {
        Ok(!self.store.get(Some(filename)).await?.is_empty())
    }

    /// Append every file the store does not know yet.
    ///
    /// Kept lines of all new files are concatenated in input order and
    /// receive one contiguous id range starting after the current maximum.
    pub async fn ingest_new_files(&self, files: &[SourceFile]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut fresh = Vec::new();

        for file in files {
            if self.is_ingested(&file.filename).await? {
                report.skipped.push(file.filename.clone());
            } else {
                fresh.push(file);
            }
        }

        report.added = self.append_files(fresh).await?;
        Ok(report)
    }

    /// Append `files` without checking whether the store already knows
    /// them. Returns the number of records written.
    ///
    /// For callers that have already filtered with [`is_ingested`](Self::is_ingested).
    pub async fn append_files<'f>(
        &self,
        files: impl IntoIterator<Item = &'f SourceFile>,
    ) -> Result<usize> {
        let pending: Vec<(String, KeptLine)> = files
            .into_iter()
            .flat_map(|file| {
                kept_lines(&file.content)
                    .into_iter()
                    .map(move |line| (file.filename.clone(), line))
            })
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }

        let existing = self.store.ids().await?;
        let ids = next_ids(&existing, pending.len())?;
        let records: Vec<LineRecord> = ids
            .into_iter()
            .zip(pending)
            .map(|(id, (filename, line))| LineRecord {
                id,
                text: line.text,
                filename,
                line_number: line.line_number,
            })
            .collect();

        self.add_in_batches(&records).await?;
        Ok(records.len())
    }

    /// Bring the records of one already-ingested file in line with `content`.
    pub async fn reconcile_file(&self, filename: &str, content: &str) -> Result<ReconcileOutcome> {
        let existing = self.store.get(Some(filename)).await?;
        if existing.is_empty() {
            return Ok(ReconcileOutcome::NotFound);
        }

        let lines = kept_lines(content);

        if lines.len() == existing.len() {
            let ids: Vec<String> = existing.into_iter().map(|r| r.id).collect();
            let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
            self.store.update(&ids, &texts).await?;
            return Ok(ReconcileOutcome::Updated { lines: ids.len() });
        }

        // Allocate before deleting so the new ids also clear the file's old ones.
        let all_ids = self.store.ids().await?;
        let ids = next_ids(&all_ids, lines.len())?;

        let removed = self.store.delete(filename).await?;

        let records: Vec<LineRecord> = ids
            .into_iter()
            .zip(lines)
            .map(|(id, line)| LineRecord {
                id,
                text: line.text,
                filename: filename.to_string(),
                line_number: line.line_number,
            })
            .collect();
        self.add_in_batches(&records).await?;

        Ok(ReconcileOutcome::Replaced {
            removed,
            added: records.len(),
        })
    }

    /// Remove every record of `filename`.
    pub async fn delete_file(&self, filename: &str) -> Result<DeleteOutcome> {
        if !self.is_ingested(filename).await? {
            return Ok(DeleteOutcome::NotFound);
        }
        let removed = self.store.delete(filename).await?;
        Ok(DeleteOutcome::Deleted { removed })
    }

    async fn add_in_batches(&self, records: &[LineRecord]) -> Result<()> {
        let total = records.len();
        let mut written = 0;
        for batch in records.chunks(BATCH_SIZE) {
            self.store.add(batch).await?;
            written += batch.len();
            if let Some(progress) = self.progress {
                progress(written, total);
            }
        }
        Ok(())
    }
}
