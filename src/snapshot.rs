//! Snapshot file store (C3): periodic dump of all metrics to a line-oriented
//! JSON file, and restore at startup (spec.md §4.2).
//!
//! Kept as free functions over a `Storage` trait object, the way the teacher
//! keeps `db/schema.rs` as free functions over a pool rather than an object —
//! there is no state here beyond the file path.

use std::path::Path;

use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::model::Data;
use crate::storage::Storage;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot record: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] crate::storage::Error),
}

/// If the file is missing or empty, returns `Ok(())` and leaves storage
/// untouched. Otherwise parses each non-empty line as one record and applies
/// it via `Storage::update`, aborting on the first parse error.
pub async fn restore(storage: &dyn Storage, path: &Path) -> Result<(), Error> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if contents.trim().is_empty() {
        return Ok(());
    }

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let data: Data = serde_json::from_str(line)?;
        storage.update(data).await?;
    }
    Ok(())
}

/// Reads all records; if none, returns `Ok(())` without writing. Otherwise
/// marshals each and writes them newline-joined to a temp file, then renames
/// it over the target path so a concurrent reader never observes a partial
/// file (spec.md: "creating or truncating... atomically from the caller's
/// point of view").
pub async fn dump(storage: &dyn Storage, path: &Path) -> Result<(), Error> {
    let records = storage.read_all().await?;
    if records.is_empty() {
        return Ok(());
    }

    let mut body = String::new();
    for record in &records {
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(body.as_bytes()).await?;
        file.flush().await?;
    }
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn restore_missing_file_is_noop() {
        let storage = MemoryStorage::new();
        let path = std::env::temp_dir().join("snapshot_missing_test.json");
        let _ = tokio::fs::remove_file(&path).await;
        restore(&storage, &path).await.unwrap();
        assert!(storage.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restore_empty_file_is_noop() {
        let storage = MemoryStorage::new();
        let path = std::env::temp_dir().join("snapshot_empty_test.json");
        tokio::fs::write(&path, b"").await.unwrap();
        restore(&storage, &path).await.unwrap();
        assert!(storage.read_all().await.unwrap().is_empty());
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn dump_then_restore_round_trips() {
        let storage = MemoryStorage::new();
        storage.update(Data::counter("PollCount", 5)).await.unwrap();
        storage.update(Data::gauge("Alloc", 12.5)).await.unwrap();

        let path = std::env::temp_dir().join("snapshot_roundtrip_test.json");
        dump(&storage, &path).await.unwrap();

        let fresh = MemoryStorage::new();
        restore(&fresh, &path).await.unwrap();

        let mut before = storage.read_all().await.unwrap();
        let mut after = fresh.read_all().await.unwrap();
        before.sort_by(|a, b| a.name.cmp(&b.name));
        after.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(before, after);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn dump_with_no_records_does_not_write_file() {
        let storage = MemoryStorage::new();
        let path = std::env::temp_dir().join("snapshot_no_write_test.json");
        let _ = tokio::fs::remove_file(&path).await;
        dump(&storage, &path).await.unwrap();
        assert!(!path.exists());
    }
}
