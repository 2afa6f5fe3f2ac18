use anyhow::Result;
use sqlx::SqlitePool;

/// Create all tables and indexes. Safe to run on every start.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Ids are decimal strings of integers; `id_num` mirrors them for ordering.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS line_records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            id_num INTEGER NOT NULL,
            text TEXT NOT NULL,
            filename TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            embedding BLOB,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='line_records_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE line_records_fts USING fts5(
                collection UNINDEXED,
                record_id UNINDEXED,
                text
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_line_records_filename ON line_records(collection, filename)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_line_records_id_num ON line_records(collection, id_num)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
