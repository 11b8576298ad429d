//! Durable dataset persistence
//!
//! The [`DatasetStore`](crate::data_registry::DatasetStore) keeps the working
//! history in memory and, when a database is configured, mirrors every change
//! through a [`DatasetRepository`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Dataset;
use crate::types::AppResult;

pub use operations::*;
pub use pool::*;

pub mod pool;
pub mod operations;

#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// Most recent first, at most `limit` datasets with their records.
    async fn load_recent(&self, limit: usize) -> AppResult<Vec<Dataset>>;

    /// Delete everything but the `keep` most recent datasets. Returns the number removed.
    async fn prune(&self, keep: usize) -> AppResult<u64>;

    /// Persist `dataset` and delete `evicted` atomically.
    async fn commit(&self, dataset: &Dataset, evicted: &[Uuid]) -> AppResult<()>;

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
