//! Per-client session context
//!
//! A [`Session`] carries the client's "current dataset" pointer. Handlers
//! resolve it from the `X-Session-Id` header, pass it explicitly to the
//! [`EquipmentService`](crate::service::EquipmentService), and write it back
//! when an upload or a history selection moves the pointer.

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";
pub const DEFAULT_SESSION: &str = "default";

const MAX_SESSION_KEY_LEN: usize = 128;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    current: Option<Uuid>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current
    }

    /// Replace the pointer. Callers validate that `id` exists first.
    pub(crate) fn point_to(&mut self, id: Uuid) {
        self.current = Some(id);
    }
}

/// Session key taken from the `X-Session-Id` header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(key) if !key.is_empty() && key.len() <= MAX_SESSION_KEY_LEN => {
                SessionKey(key.to_string())
            }
            _ => SessionKey(DEFAULT_SESSION.to_string()),
        }
    }
}

impl<S> FromRequestParts<S> for SessionKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok());
        Ok(SessionKey::from_header(value))
    }
}

/// Most sessions kept before the least recently updated one is dropped
pub const MAX_SESSIONS: usize = 1024;

/// Sessions keyed by client, bounded to `capacity` entries.
///
/// Each `put` stamps the entry with a fresh tick; once the table is full the
/// entry with the oldest tick is evicted. A dropped client simply starts
/// over with no current dataset.
#[derive(Debug)]
struct SessionTable {
    capacity: usize,
    tick: u64,
    entries: HashMap<SessionKey, (Session, u64)>,
    recency: BTreeMap<u64, SessionKey>,
}

impl SessionTable {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
        }
    }

    fn insert(&mut self, key: SessionKey, session: Session) {
        self.tick += 1;
        if let Some((_, previous)) = self.entries.insert(key.clone(), (session, self.tick)) {
            self.recency.remove(&previous);
        }
        self.recency.insert(self.tick, key);

        while self.entries.len() > self.capacity {
            match self.recency.pop_first() {
                Some((_, oldest)) => {
                    self.entries.remove(&oldest);
                    debug!(session = %oldest.0, "Evicted idle session");
                }
                None => break,
            }
        }
    }
}

#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<SessionTable>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionTable::with_capacity(capacity))),
        }
    }

    pub async fn get(&self, key: &SessionKey) -> Session {
        let guard = self.inner.read().await;
        guard
            .entries
            .get(key)
            .map(|(session, _)| *session)
            .unwrap_or_default()
    }

    pub async fn put(&self, key: SessionKey, session: Session) {
        let mut guard = self.inner.write().await;
        guard.insert(key, session);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
