//! Core data models shared by the loader, the maintenance tool, and the
//! chat responder.

use serde::{Deserialize, Serialize};

/// One ingested line of source text plus its origin metadata.
///
/// `id` is the decimal string of a non-negative integer and is unique across
/// the whole collection. `line_number` counts kept (non-blank) lines only,
/// starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    pub id: String,
    pub text: String,
    pub filename: String,
    pub line_number: i64,
}

/// A record returned from a similarity query, with its score.
///
/// Higher scores mean more similar. The scale depends on the store backend
/// (term overlap, BM25, or cosine similarity), so scores are only
/// comparable within one result set.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    pub record: LineRecord,
    pub score: f64,
}

impl QueryHit {
    /// `"<filename>: line <n>"`, the form used when listing answer sources.
    pub fn source_label(&self) -> String {
        format!(
            "{}: line {}",
            self.record.filename, self.record.line_number
        )
    }
}

/// A source file handed to the reconciler: a bare filename plus its content.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub filename: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}
