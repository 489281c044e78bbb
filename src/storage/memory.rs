//! In-memory storage backend (spec.md §4.1 "memory backend").
//!
//! Grounded on `original_source/internal/storage/memory.go`'s
//! `sync.RWMutex`-guarded map, translated to `tokio::sync::RwLock` since the
//! guarded accesses span `.await` points used by other backends behind the
//! same trait object.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::Data;

use super::{Error, Storage};

#[derive(Default)]
pub struct MemoryStorage {
    metrics: RwLock<HashMap<String, Data>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, name: &str) -> Result<Option<Data>, Error> {
        let metrics = self.metrics.read().await;
        Ok(metrics.get(name).cloned())
    }

    async fn read_all(&self) -> Result<Vec<Data>, Error> {
        let metrics = self.metrics.read().await;
        Ok(metrics.values().cloned().collect())
    }

    async fn update(&self, data: Data) -> Result<(), Error> {
        let mut metrics = self.metrics.write().await;
        let merged = Data::merge(metrics.get(&data.name), data);
        metrics.insert(merged.name.clone(), merged);
        Ok(())
    }

    /// Applies every update in the batch under a single write-lock
    /// acquisition (spec.md §3 "atomic with respect to concurrent reads and
    /// writes").
    async fn update_batch(&self, data: Vec<Data>) -> Result<(), Error> {
        let mut metrics = self.metrics.write().await;
        for incoming in data {
            let merged = Data::merge(metrics.get(&incoming.name), incoming);
            metrics.insert(merged.name.clone(), merged);
        }
        Ok(())
    }

    /// Always succeeds for the memory backend (spec.md §4.1).
    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), Error> {
        let mut metrics = self.metrics.write().await;
        metrics.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counter_updates_accumulate() {
        let storage = MemoryStorage::new();
        storage.update(Data::counter("c", 3)).await.unwrap();
        storage.update(Data::counter("c", 4)).await.unwrap();
        let stored = storage.read("c").await.unwrap().unwrap();
        assert_eq!(stored.delta, Some(7));
    }

    #[tokio::test]
    async fn gauge_update_replaces() {
        let storage = MemoryStorage::new();
        storage.update(Data::gauge("Alloc", 12.5)).await.unwrap();
        storage.update(Data::gauge("Alloc", 99.0)).await.unwrap();
        let stored = storage.read("Alloc").await.unwrap().unwrap();
        assert_eq!(stored.value, Some(99.0));
    }

    #[tokio::test]
    async fn batch_of_same_counter_sums_both_into_existing() {
        let storage = MemoryStorage::new();
        storage.update(Data::counter("c", 100)).await.unwrap();
        storage
            .update_batch(vec![Data::counter("c", 10), Data::counter("c", 5)])
            .await
            .unwrap();
        let stored = storage.read("c").await.unwrap().unwrap();
        assert_eq!(stored.delta, Some(115));
    }

    #[tokio::test]
    async fn read_absent_returns_none() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_all_empty_is_empty_vec() {
        let storage = MemoryStorage::new();
        assert!(storage.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ping_always_ok() {
        let storage = MemoryStorage::new();
        storage.ping().await.unwrap();
    }
}
