//! In-memory [`DocumentStore`] implementation for tests.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Similarity is a
//! brute-force count of distinct query terms present in each line.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::lines::parse_id;
use crate::models::{LineRecord, QueryHit};

use super::DocumentStore;

/// In-memory store for tests and examples.
pub struct InMemoryStore {
    records: RwLock<Vec<LineRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Build a store pre-populated with `records`.
    pub fn with_records(records: Vec<LineRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn numeric_key(id: &str) -> u64 {
    parse_id(id).unwrap_or(u64::MAX)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn add(&self, records: &[LineRecord]) -> Result<()> {
        let mut stored = self.records.write().unwrap();
        let mut seen: HashSet<String> = stored.iter().map(|r| r.id.clone()).collect();
        for r in records {
            if !seen.insert(r.id.clone()) {
                bail!("duplicate id: {}", r.id);
            }
        }
        stored.extend(records.iter().cloned());
        Ok(())
    }

    async fn get(&self, filename: Option<&str>) -> Result<Vec<LineRecord>> {
        let stored = self.records.read().unwrap();
        let mut out: Vec<LineRecord> = stored
            .iter()
            .filter(|r| filename.map_or(true, |f| r.filename == f))
            .cloned()
            .collect();
        out.sort_by_key(|r| numeric_key(&r.id));
        Ok(out)
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let stored = self.records.read().unwrap();
        Ok(stored.iter().map(|r| r.id.clone()).collect())
    }

    async fn update(&self, ids: &[String], texts: &[String]) -> Result<()> {
        if ids.len() != texts.len() {
            bail!(
                "update needs one text per id (got {} ids, {} texts)",
                ids.len(),
                texts.len()
            );
        }
        let mut stored = self.records.write().unwrap();
        for (id, text) in ids.iter().zip(texts) {
            match stored.iter_mut().find(|r| &r.id == id) {
                Some(r) => r.text = text.clone(),
                None => bail!("cannot update unknown id: {}", id),
            }
        }
        Ok(())
    }

    async fn delete(&self, filename: &str) -> Result<usize> {
        let mut stored = self.records.write().unwrap();
        let before = stored.len();
        stored.retain(|r| r.filename != filename);
        Ok(before - stored.len())
    }

    async fn query(&self, text: &str, top_n: usize) -> Result<Vec<QueryHit>> {
        let query_terms = terms(text);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }
        let stored = self.records.read().unwrap();
        let mut hits: Vec<QueryHit> = stored
            .iter()
            .filter_map(|r| {
                let overlap = terms(&r.text).intersection(&query_terms).count();
                (overlap > 0).then(|| QueryHit {
                    record: r.clone(),
                    score: overlap as f64,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| numeric_key(&a.record.id).cmp(&numeric_key(&b.record.id)))
        });
        hits.truncate(top_n);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, filename: &str, line_number: i64, text: &str) -> LineRecord {
        LineRecord {
            id: id.to_string(),
            text: text.to_string(),
            filename: filename.to_string(),
            line_number,
        }
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_ids() {
        let store = InMemoryStore::new();
        store.add(&[record("0", "a.txt", 1, "x")]).await.unwrap();
        let err = store.add(&[record("0", "b.txt", 1, "y")]).await;
        assert!(err.is_err());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_orders_by_numeric_id() {
        let store = InMemoryStore::with_records(vec![
            record("10", "a.txt", 3, "c"),
            record("9", "a.txt", 2, "b"),
            record("2", "a.txt", 1, "a"),
            record("3", "b.txt", 1, "z"),
        ]);
        let got: Vec<String> = store
            .get(Some("a.txt"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(got, vec!["2", "9", "10"]);
    }

    #[tokio::test]
    async fn test_query_ranks_by_term_overlap() {
        let store = InMemoryStore::with_records(vec![
            record("0", "geo.txt", 1, "Paris is the capital of France"),
            record("1", "geo.txt", 2, "Berlin is in Germany"),
            record("2", "geo.txt", 3, "France has many regions"),
        ]);
        let hits = store
            .query("What is the capital of France?", 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record.id, "0");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let store = InMemoryStore::new();
        let err = store
            .update(&["7".to_string()], &["new".to_string()])
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_delete_returns_removed_count() {
        let store = InMemoryStore::with_records(vec![
            record("0", "a.txt", 1, "x"),
            record("1", "a.txt", 2, "y"),
            record("2", "b.txt", 1, "z"),
        ]);
        assert_eq!(store.delete("a.txt").await.unwrap(), 2);
        assert_eq!(store.delete("a.txt").await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
