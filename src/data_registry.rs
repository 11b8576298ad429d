//! Dataset store and bounded upload history
//!
//! Datasets live in a most-recent-N [`History`] behind a tokio `RwLock`.
//! `ingest` holds the write lock across persist + insert + evict, so
//! concurrent uploads are serialized and readers only ever observe complete
//! datasets.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::summarize;
use crate::db::DatasetRepository;
use crate::models::{Dataset, DatasetSummary, EquipmentRecord};
use crate::session::Session;
use crate::types::{AppError, AppResult};

/// Number of uploads kept retrievable.
pub const HISTORY_LIMIT: usize = 5;

/// Fixed-capacity, recency-ordered dataset history.
///
/// `order` holds ids most recent first; `datasets` indexes them. Insertion
/// order breaks ties between equal upload timestamps.
#[derive(Debug)]
pub struct History {
    capacity: usize,
    order: VecDeque<Uuid>,
    datasets: HashMap<Uuid, Arc<Dataset>>,
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity + 1),
            datasets: HashMap::with_capacity(capacity + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids that the next `push` would evict, oldest last.
    pub fn pending_evictions(&self) -> Vec<Uuid> {
        self.order.iter().skip(self.capacity - 1).copied().collect()
    }

    /// Insert as most recent and return the ids evicted to stay within capacity.
    pub fn push(&mut self, dataset: Arc<Dataset>) -> Vec<Uuid> {
        self.order.push_front(dataset.id);
        self.datasets.insert(dataset.id, dataset);

        let mut evicted = Vec::new();
        while self.order.len() > self.capacity {
            if let Some(id) = self.order.pop_back() {
                self.datasets.remove(&id);
                evicted.push(id);
            }
        }
        evicted
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Dataset>> {
        self.datasets.get(id).cloned()
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Dataset>> + '_ {
        self.order.iter().filter_map(|id| self.datasets.get(id))
    }
}

#[derive(Clone)]
pub struct DatasetStore {
    inner: Arc<RwLock<History>>,
    repository: Option<Arc<dyn DatasetRepository>>,
}

impl DatasetStore {
    /// Store without durable persistence
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(History::with_capacity(HISTORY_LIMIT))),
            repository: None,
        }
    }

    pub fn with_repository(repository: Arc<dyn DatasetRepository>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(History::with_capacity(HISTORY_LIMIT))),
            repository: Some(repository),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.repository.is_some()
    }

    /// Load the most recent datasets from the repository into memory,
    /// deleting anything older than the history bound.
    pub async fn hydrate(&self) -> AppResult<usize> {
        let Some(repository) = &self.repository else {
            return Ok(0);
        };

        let mut guard = self.inner.write().await;
        let pruned = repository.prune(HISTORY_LIMIT).await?;
        let recent = repository.load_recent(HISTORY_LIMIT).await?;

        // load_recent is most recent first; push oldest first to rebuild the order
        for dataset in recent.into_iter().rev() {
            guard.push(Arc::new(dataset));
        }

        info!(loaded = guard.len(), pruned, "Dataset history hydrated");
        Ok(guard.len())
    }

    pub async fn ingest(
        &self,
        name: &str,
        file_name: &str,
        records: Vec<EquipmentRecord>,
    ) -> AppResult<Arc<Dataset>> {
        let summary_stats = summarize(&records);

        let mut guard = self.inner.write().await;

        let dataset = Arc::new(Dataset {
            id: Uuid::new_v4(),
            name: name.to_string(),
            file_name: file_name.to_string(),
            uploaded_at: Utc::now(),
            equipments: records,
            summary_stats,
        });

        if let Some(repository) = &self.repository {
            let evicting = guard.pending_evictions();
            repository.commit(&dataset, &evicting).await?;
        }

        let evicted = guard.push(Arc::clone(&dataset));
        if !evicted.is_empty() {
            debug!(?evicted, "Evicted datasets beyond history limit");
        }

        info!(
            dataset_id = %dataset.id,
            name = %dataset.name,
            records = dataset.summary_stats.total_count,
            "Dataset ingested"
        );
        Ok(dataset)
    }

    pub async fn list_history(&self) -> Vec<DatasetSummary> {
        let guard = self.inner.read().await;
        guard.iter().map(|d| DatasetSummary::from(d.as_ref())).collect()
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Arc<Dataset>> {
        let guard = self.inner.read().await;
        guard.get(&id).ok_or_else(|| AppError::dataset_not_found(id))
    }

    /// The session's current dataset; `None` once it has been evicted.
    pub async fn get_current(&self, session: &Session) -> Option<Arc<Dataset>> {
        let id = session.current_id()?;
        let guard = self.inner.read().await;
        guard.get(&id)
    }

    /// Point `session` at `id` and return that dataset, checked and fetched
    /// under one read lock.
    pub async fn set_current(&self, session: &mut Session, id: Uuid) -> AppResult<Arc<Dataset>> {
        let guard = self.inner.read().await;
        let dataset = guard.get(&id).ok_or_else(|| AppError::dataset_not_found(id))?;
        session.point_to(id);
        Ok(dataset)
    }

    pub async fn ping(&self) -> AppResult<()> {
        match &self.repository {
            Some(repository) => repository.ping().await,
            None => Ok(()),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
