//! SQLite-backed [`DocumentStore`] implementation.
//!
//! One database file holds any number of named collections. Each line
//! record lives in `line_records` and is mirrored into the FTS5 table
//! `line_records_fts`. When an [`Embedder`] is attached, every added or
//! updated text is embedded and the vector is stored alongside the record.
//!
//! # Similarity
//!
//! | Condition | Ranking |
//! |-----------|---------|
//! | Embedder attached and vectors stored | cosine similarity |
//! | Otherwise | FTS5 BM25 over the query's terms (`OR`-joined) |

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use docs_rag_core::lines::parse_id;
use docs_rag_core::models::{LineRecord, QueryHit};
use docs_rag_core::store::DocumentStore;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::migrate;

/// SQLite implementation of [`DocumentStore`], scoped to one collection.
pub struct SqliteStore {
    pool: SqlitePool,
    collection: String,
    embedder: Option<Arc<Embedder>>,
}

impl SqliteStore {
    /// Open `name`, creating the schema and the collection if needed.
    pub async fn get_or_create_collection(
        pool: SqlitePool,
        name: &str,
        embedder: Option<Arc<Embedder>>,
    ) -> Result<Self> {
        migrate::run_migrations(&pool).await?;
        sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&pool)
            .await?;
        Ok(Self {
            pool,
            collection: name.to_string(),
            embedder,
        })
    }

    /// Open an existing collection. Fails if it was never created.
    pub async fn open_collection(
        pool: SqlitePool,
        name: &str,
        embedder: Option<Arc<Embedder>>,
    ) -> Result<Self> {
        migrate::run_migrations(&pool).await?;
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
                .bind(name)
                .fetch_one(&pool)
                .await?;
        if !exists {
            bail!("Collection {} does not exist.", name);
        }
        Ok(Self {
            pool,
            collection: name.to_string(),
            embedder,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Option<Vec<Vec<f32>>>> {
        match &self.embedder {
            Some(embedder) => Ok(Some(
                embedder
                    .embed(texts)
                    .await
                    .context("Failed to embed line texts")?,
            )),
            None => Ok(None),
        }
    }

    async fn has_vectors(&self) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM line_records WHERE collection = ? AND embedding IS NOT NULL",
        )
        .bind(&self.collection)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn vector_query(&self, embedder: &Embedder, text: &str, top_n: usize) -> Result<Vec<QueryHit>> {
        let query_vec = embedder.embed_query(text).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, text, filename, line_number, embedding
            FROM line_records
            WHERE collection = ? AND embedding IS NOT NULL
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut hits: Vec<QueryHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let score = cosine_similarity(&query_vec, &blob_to_vec(&blob)) as f64;
                QueryHit {
                    record: row_to_record(row),
                    score,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_n);
        Ok(hits)
    }

    async fn keyword_query(&self, text: &str, top_n: usize) -> Result<Vec<QueryHit>> {
        let Some(expr) = fts_match_expression(text) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            r#"
            SELECT r.id, r.text, r.filename, r.line_number,
                   bm25(line_records_fts) AS score
            FROM line_records_fts
            JOIN line_records r
              ON r.collection = line_records_fts.collection
             AND r.id = line_records_fts.record_id
            WHERE line_records_fts MATCH ?
              AND line_records_fts.collection = ?
            ORDER BY score
            LIMIT ?
            "#,
        )
        .bind(&expr)
        .bind(&self.collection)
        .bind(top_n as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let bm25: f64 = row.get("score");
                QueryHit {
                    record: row_to_record(row),
                    // bm25() is lower-is-better
                    score: -bm25,
                }
            })
            .collect())
    }
}

/// `id_num` is an SQLite INTEGER, so ids above `i64::MAX` are rejected.
fn id_column_value(id: &str) -> Result<i64> {
    i64::try_from(parse_id(id)?)
        .with_context(|| format!("id {} is too large to store", id))
}

fn row_to_record(row: &SqliteRow) -> LineRecord {
    LineRecord {
        id: row.get("id"),
        text: row.get("text"),
        filename: row.get("filename"),
        line_number: row.get("line_number"),
    }
}

/// Turn free text into an FTS5 query: each alphanumeric term quoted, joined
/// with `OR`. Returns `None` when the text has no terms.
fn fts_match_expression(text: &str) -> Option<String> {
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn add(&self, records: &[LineRecord]) -> Result<()> {
        let id_nums = records
            .iter()
            .map(|r| id_column_value(&r.id))
            .collect::<Result<Vec<i64>>>()?;
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embed_all(&texts).await?;

        let mut tx = self.pool.begin().await?;

        for (i, (record, id_num)) in records.iter().zip(id_nums).enumerate() {
            let blob = vectors.as_ref().and_then(|v| v.get(i)).map(|v| vec_to_blob(v));

            sqlx::query(
                r#"
                INSERT INTO line_records (collection, id, id_num, text, filename, line_number, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(id_num)
            .bind(&record.text)
            .bind(&record.filename)
            .bind(record.line_number)
            .bind(blob)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert record id {}", record.id))?;

            sqlx::query("INSERT INTO line_records_fts (collection, record_id, text) VALUES (?, ?, ?)")
                .bind(&self.collection)
                .bind(&record.id)
                .bind(&record.text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, filename: Option<&str>) -> Result<Vec<LineRecord>> {
        let rows = match filename {
            Some(f) => {
                sqlx::query(
                    r#"
                    SELECT id, text, filename, line_number FROM line_records
                    WHERE collection = ? AND filename = ?
                    ORDER BY id_num
                    "#,
                )
                .bind(&self.collection)
                .bind(f)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, text, filename, line_number FROM line_records
                    WHERE collection = ?
                    ORDER BY id_num
                    "#,
                )
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM line_records WHERE collection = ?")
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn update(&self, ids: &[String], texts: &[String]) -> Result<()> {
        if ids.len() != texts.len() {
            bail!(
                "update needs one text per id (got {} ids, {} texts)",
                ids.len(),
                texts.len()
            );
        }
        let vectors = self.embed_all(texts).await?;

        let mut tx = self.pool.begin().await?;

        for (i, (id, text)) in ids.iter().zip(texts).enumerate() {
            let blob = vectors.as_ref().and_then(|v| v.get(i)).map(|v| vec_to_blob(v));

            let result = sqlx::query(
                "UPDATE line_records SET text = ?, embedding = ? WHERE collection = ? AND id = ?",
            )
            .bind(text)
            .bind(blob)
            .bind(&self.collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() != 1 {
                bail!("cannot update unknown id: {}", id);
            }

            sqlx::query("DELETE FROM line_records_fts WHERE collection = ? AND record_id = ?")
                .bind(&self.collection)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO line_records_fts (collection, record_id, text) VALUES (?, ?, ?)")
                .bind(&self.collection)
                .bind(id)
                .bind(text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, filename: &str) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM line_records_fts
            WHERE collection = ?
              AND record_id IN (SELECT id FROM line_records WHERE collection = ? AND filename = ?)
            "#,
        )
        .bind(&self.collection)
        .bind(&self.collection)
        .bind(filename)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM line_records WHERE collection = ? AND filename = ?")
            .bind(&self.collection)
            .bind(filename)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() as usize)
    }

    async fn query(&self, text: &str, top_n: usize) -> Result<Vec<QueryHit>> {
        if top_n == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        if let Some(embedder) = &self.embedder {
            if self.has_vectors().await? {
                return self.vector_query(embedder, text, top_n).await;
            }
        }
        self.keyword_query(text, top_n).await
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM line_records WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}
