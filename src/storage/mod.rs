//! Storage abstraction (C2): `Read`/`ReadAll`/`Update`/`UpdateBatch`/`Ping`/`Delete`
//! over the metric record, same contract for every backend (spec.md §4.1).
//!
//! Kept as an explicit capability-shaped trait rather than the source's
//! interface-plus-loose-functions split (§9 REDESIGN FLAG): one trait object
//! per server, `delete` stays on the trait (reachable in tests, not wired to
//! any external surface) per spec.md §3's lifecycle note.

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

use crate::model::Data;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn read(&self, name: &str) -> Result<Option<Data>, Error>;
    async fn read_all(&self) -> Result<Vec<Data>, Error>;
    async fn update(&self, data: Data) -> Result<(), Error>;
    async fn update_batch(&self, data: Vec<Data>) -> Result<(), Error>;
    async fn ping(&self) -> Result<(), Error>;
    async fn delete(&self, name: &str) -> Result<(), Error>;
}
