//! Append-only CSV logs of answered queries and user feedback.
//!
//! Each write takes an exclusive lock on a sibling `<file>.lock` so that
//! concurrent requests (or processes) never interleave rows or write the
//! header twice.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One answered query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub query: String,
    pub answer: String,
    pub timestamp: String,
}

impl ChatRecord {
    pub fn now(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
            timestamp: timestamp_now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vote::Up => "up",
            Vote::Down => "down",
        }
    }
}

/// A thumbs up/down on a displayed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub vote: Vote,
    pub answer: String,
    pub timestamp: String,
}

impl FeedbackRecord {
    pub fn now(vote: Vote, answer: impl Into<String>) -> Self {
        Self {
            vote,
            answer: answer.into(),
            timestamp: timestamp_now(),
        }
    }
}

/// RFC 3339 in UTC with microseconds, e.g. `2024-05-01T09:30:00.123456Z`.
fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Sink for chat and feedback records.
#[async_trait]
pub trait ChatLog: Send + Sync {
    async fn record_chat(&self, record: ChatRecord) -> Result<()>;
    async fn record_feedback(&self, record: FeedbackRecord) -> Result<()>;
}

/// [`ChatLog`] writing two CSV files.
#[derive(Debug, Clone)]
pub struct CsvHistory {
    chat_log: PathBuf,
    feedback_log: PathBuf,
}

pub const CHAT_HEADER: [&str; 3] = ["query", "answer", "timestamp"];
pub const FEEDBACK_HEADER: [&str; 3] = ["vote", "answer", "timestamp"];

impl CsvHistory {
    pub fn new(chat_log: impl Into<PathBuf>, feedback_log: impl Into<PathBuf>) -> Self {
        Self {
            chat_log: chat_log.into(),
            feedback_log: feedback_log.into(),
        }
    }

    async fn append(&self, path: PathBuf, header: [&'static str; 3], row: [String; 3]) -> Result<()> {
        tokio::task::spawn_blocking(move || append_row(&path, &header, &row))
            .await
            .context("history writer task failed")?
    }
}

#[async_trait]
impl ChatLog for CsvHistory {
    async fn record_chat(&self, record: ChatRecord) -> Result<()> {
        self.append(
            self.chat_log.clone(),
            CHAT_HEADER,
            [record.query, record.answer, record.timestamp],
        )
        .await
    }

    async fn record_feedback(&self, record: FeedbackRecord) -> Result<()> {
        self.append(
            self.feedback_log.clone(),
            FEEDBACK_HEADER,
            [record.vote.as_str().to_string(), record.answer, record.timestamp],
        )
        .await
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Append one row to `path`, writing `header` first if the file is new.
/// The lock is held across the existence check and the write.
pub fn append_row(path: &Path, header: &[&str], row: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path(path))
        .with_context(|| format!("Failed to open lock for {}", path.display()))?;
    lock_file
        .lock_exclusive()
        .with_context(|| format!("Failed to lock {}", path.display()))?;

    let write_header = !path.exists();
    let mut out = String::new();
    if write_header {
        out.push_str(&csv_line(header.iter().copied()));
    }
    out.push_str(&csv_line(row.iter().map(String::as_str)));

    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(out.as_bytes()))
        .with_context(|| format!("Failed to append to {}", path.display()));

    let _ = fs2::FileExt::unlock(&lock_file);
    result
}

fn csv_line<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    let mut line = fields.map(csv_field).collect::<Vec<_>>().join(",");
    line.push_str("\r\n");
    line
}

/// Quote a field when it contains a delimiter, quote, or line break.
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
