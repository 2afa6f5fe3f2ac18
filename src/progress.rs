//! Ingestion progress reporting.
//!
//! `docs-rag-load` reports what it is scanning and how many line records
//! have been written. Progress goes to **stderr** so stdout keeps only the
//! tool's summary messages.

use std::io::Write;

/// A single progress event during loading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadProgressEvent {
    /// Listing the data directory.
    Scanning { directory: String },
    /// `written` of `total` new records stored.
    Writing { written: u64, total: u64 },
}

/// Reports load progress. Implementations write to stderr (human or JSON).
pub trait LoadProgressReporter: Send + Sync {
    fn report(&self, event: LoadProgressEvent);
}

/// Human-friendly progress: "load  writing  1,200 / 5,000 lines".
pub struct StderrProgress;

impl LoadProgressReporter for StderrProgress {
    fn report(&self, event: LoadProgressEvent) {
        let line = match &event {
            LoadProgressEvent::Scanning { directory } => {
                format!("load  scanning {}...\n", directory)
            }
            LoadProgressEvent::Writing { written, total } => format!(
                "load  writing  {} / {} lines\n",
                format_number(*written),
                format_number(*total)
            ),
        };
        let mut err = std::io::stderr().lock();
        let _ = err.write_all(line.as_bytes());
        let _ = err.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl LoadProgressReporter for JsonProgress {
    fn report(&self, event: LoadProgressEvent) {
        let obj = match &event {
            LoadProgressEvent::Scanning { directory } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "directory": directory
            }),
            LoadProgressEvent::Writing { written, total } => serde_json::json!({
                "event": "progress",
                "phase": "writing",
                "n": written,
                "total": total
            }),
        };
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", obj);
        let _ = err.flush();
    }
}

pub struct NoProgress;

impl LoadProgressReporter for NoProgress {
    fn report(&self, _event: LoadProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode selected with `--progress`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn LoadProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
