//! Document registry mapping document ids to their chunk sets.
//!
//! [`DocumentStore`] is the seam for pluggable backings;
//! [`InMemoryDocumentStore`] keeps documents in a `HashMap` behind a
//! `tokio::sync::RwLock` and enforces a [`StorePolicy`] so memory use stays
//! bounded.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::document::Document;
use crate::error::{RagError, Result};

/// A keyed registry of stored documents.
///
/// Writes for an id replace the whole [`Document`] at once, so readers see
/// either the previous chunk set or the new one, never a mix.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a document under its id, replacing any previous one.
    async fn put(&self, document: Document) -> Result<()>;

    /// Fetch a document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotFound`] if no live document has this id.
    async fn get(&self, id: &str) -> Result<Arc<Document>>;

    /// Remove a document. Returns whether one was stored.
    async fn remove(&self, id: &str) -> Result<bool>;

    /// Number of live documents.
    async fn len(&self) -> usize;
}

/// Lifecycle limits for an [`InMemoryDocumentStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorePolicy {
    /// Maximum number of documents; the least recently used is evicted first.
    pub capacity: Option<usize>,
    /// Time after which a stored document is no longer served.
    pub ttl: Option<Duration>,
}

impl StorePolicy {
    /// No limits at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self { capacity: config.store_capacity, ttl: config.store_ttl }
    }
}

#[derive(Debug)]
struct Entry {
    document: Arc<Document>,
    stored_at: Instant,
    last_access: AtomicU64,
}

/// An in-memory [`DocumentStore`].
///
/// Reads share the lock; `put` and `remove` take it exclusively. Expired
/// entries are hidden immediately and purged on the next write.
///
/// # Example
///
/// ```rust,ignore
/// use litnav_rag::{InMemoryDocumentStore, StorePolicy};
///
/// let store = InMemoryDocumentStore::with_policy(StorePolicy {
///     capacity: Some(100),
///     ttl: Some(Duration::from_secs(3600)),
/// });
/// store.put(document).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Entry>>,
    policy: StorePolicy,
    clock: AtomicU64,
}

impl InMemoryDocumentStore {
    /// Create an empty store with no lifecycle limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given lifecycle limits.
    pub fn with_policy(policy: StorePolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn policy(&self) -> StorePolicy {
        self.policy
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut documents = self.documents.write().await;
        self.purge_locked(&mut documents)
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.policy.ttl.is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
    }

    fn purge_locked(&self, documents: &mut HashMap<String, Entry>) -> usize {
        let before = documents.len();
        documents.retain(|_, entry| !self.is_expired(entry));
        let purged = before - documents.len();
        if purged > 0 {
            debug!(purged, "purged expired documents");
        }
        purged
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn put(&self, document: Document) -> Result<()> {
        let mut documents = self.documents.write().await;
        self.purge_locked(&mut documents);

        if let Some(capacity) = self.policy.capacity {
            while documents.len() >= capacity && !documents.contains_key(&document.id) {
                let Some(oldest) = documents
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
                    .map(|(id, _)| id.clone())
                else {
                    break;
                };
                warn!(document.id = %oldest, capacity, "evicting least recently used document");
                documents.remove(&oldest);
            }
        }

        let entry = Entry {
            document: Arc::new(document),
            stored_at: Instant::now(),
            last_access: AtomicU64::new(self.tick()),
        };
        documents.insert(entry.document.id.clone(), entry);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Arc<Document>> {
        let documents = self.documents.read().await;
        match documents.get(id) {
            Some(entry) if !self.is_expired(entry) => {
                entry.last_access.store(self.tick(), Ordering::Relaxed);
                Ok(Arc::clone(&entry.document))
            }
            _ => Err(RagError::not_found(id)),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let removed = documents.remove(id).is_some_and(|entry| !self.is_expired(&entry));
        self.purge_locked(&mut documents);
        Ok(removed)
    }

    async fn len(&self) -> usize {
        let documents = self.documents.read().await;
        documents.values().filter(|entry| !self.is_expired(entry)).count()
    }
}
