use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Database file created inside the persist directory.
pub const DB_FILE_NAME: &str = "docs-rag.sqlite";

pub fn db_path(persist_directory: &Path) -> PathBuf {
    persist_directory.join(DB_FILE_NAME)
}

pub async fn connect(persist_directory: &Path) -> Result<SqlitePool> {
    std::fs::create_dir_all(persist_directory)?;
    let path = db_path(persist_directory);

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
