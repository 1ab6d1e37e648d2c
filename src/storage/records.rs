// src/storage/records.rs

//! Persistent record store with exact-match deduplication.
//!
//! Backed by a single JSON document; the full record set is held in
//! memory and rewritten atomically on every insert. Lookup is an exact
//! structural match over the (code, title, mark) triple, so a grade
//! change for a known course is a new entry, never an update. The store
//! only ever appends in steady state; `drop_all` exists to force a
//! clean re-initialization epoch at process start.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::CourseRecord;

/// JSON-file-backed store of every record ever reported.
pub struct RecordStore {
    path: PathBuf,
    rows: Vec<CourseRecord>,
}

impl RecordStore {
    /// Open the store, loading any existing rows. A missing file is an
    /// empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(AppError::Io(e)),
        };
        Ok(Self { path, rows })
    }

    /// Remove every stored record and persist the empty set.
    pub async fn drop_all(&mut self) -> Result<()> {
        self.rows.clear();
        self.persist().await
    }

    /// Whether this exact (code, title, mark) triple is already stored.
    pub fn is_known(&self, record: &CourseRecord) -> bool {
        self.rows.iter().any(|row| row == record)
    }

    /// One logical check-then-insert: remembers the record and returns
    /// `true` iff it was not already known.
    pub async fn check_and_insert(&mut self, record: &CourseRecord) -> Result<bool> {
        if self.is_known(record) {
            return Ok(false);
        }
        self.rows.push(record.clone());
        self.persist().await?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the full row set atomically (temp file + rename).
    async fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.rows)?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(mark: &str) -> CourseRecord {
        CourseRecord::new("MATH151", "Algebra", mark)
    }

    #[tokio::test]
    async fn missing_file_opens_empty() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::open(tmp.path().join("records.json"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn insert_then_duplicate_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = RecordStore::open(tmp.path().join("records.json"))
            .await
            .unwrap();

        assert!(store.check_and_insert(&record("B+")).await.unwrap());
        assert!(!store.check_and_insert(&record("B+")).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn mark_change_is_a_new_entry() {
        let tmp = TempDir::new().unwrap();
        let mut store = RecordStore::open(tmp.path().join("records.json"))
            .await
            .unwrap();

        assert!(store.check_and_insert(&record("B+")).await.unwrap());
        assert!(store.check_and_insert(&record("A")).await.unwrap());
        assert_eq!(store.len(), 2);
        assert!(store.is_known(&record("B+")));
        assert!(store.is_known(&record("A")));
    }

    #[tokio::test]
    async fn rows_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.json");

        let mut store = RecordStore::open(&path).await.unwrap();
        store.check_and_insert(&record("A")).await.unwrap();
        drop(store);

        let reopened = RecordStore::open(&path).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.is_known(&record("A")));
    }

    #[tokio::test]
    async fn drop_all_clears_persisted_state() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("records.json");

        let mut store = RecordStore::open(&path).await.unwrap();
        store.check_and_insert(&record("A")).await.unwrap();
        store.drop_all().await.unwrap();
        drop(store);

        let reopened = RecordStore::open(&path).await.unwrap();
        assert!(reopened.is_empty());
    }
}
