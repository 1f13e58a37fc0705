//! In-memory vector index over one document's chunks.
//!
//! A [`VectorIndex`] is built per question by embedding every chunk. The
//! optional [`IndexCache`] lets a pipeline reuse an index while the
//! document's content hash is unchanged.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// A chunk paired with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Embeddings for every chunk of one document, in chunk order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimensions: usize,
}

impl VectorIndex {
    /// Embed `chunks` through `provider`, `batch_size` texts per request.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CollaboratorUnavailable`] if any batch fails or
    /// returns unusable vectors. No partial index is returned.
    pub async fn build(
        chunks: &[Chunk],
        provider: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        let mut embeddings = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let vectors = provider.embed_batch(&texts).await.map_err(|e| {
                error!(batch_size = texts.len(), error = %e, "embedding failed during index build");
                into_embedding_error(e)
            })?;
            if vectors.len() != texts.len() {
                return Err(RagError::embedding(format!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            embeddings.extend(vectors);
        }

        let index = Self::from_embeddings(chunks.to_vec(), embeddings)?;
        debug!(chunk_count = index.len(), dimensions = index.dimensions, "built vector index");
        Ok(index)
    }

    /// Assemble an index from precomputed embeddings.
    ///
    /// # Errors
    ///
    /// Returns an embedding error if the counts differ or the vectors are
    /// empty or of mixed dimensions.
    pub fn from_embeddings(chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(RagError::embedding(format!(
                "{} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = embeddings.first().map_or(0, Vec::len);
        if embeddings.iter().any(|e| e.is_empty() || e.len() != dimensions) {
            return Err(RagError::embedding("embeddings are empty or of mixed dimensions"));
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();
        Ok(Self { entries, dimensions })
    }

    pub fn entries(&self) -> &[IndexedChunk] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality of the stored vectors; 0 for an empty index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The embedding stored for `chunk`, matched by document id and index.
    pub fn embedding_of(&self, chunk: &Chunk) -> Option<&[f32]> {
        self.entries
            .iter()
            .find(|e| e.chunk.index == chunk.index && e.chunk.document_id == chunk.document_id)
            .map(|e| e.embedding.as_slice())
    }
}

fn into_embedding_error(err: RagError) -> RagError {
    if err.is_unavailable() { err } else { RagError::embedding(err.to_string()) }
}

#[derive(Debug)]
struct CachedIndex {
    content_hash: String,
    index: Arc<VectorIndex>,
    inserted: u64,
}

/// Reuses vector indices keyed by `(document_id, content_hash)`.
///
/// A lookup with a different content hash is a miss. When full, the oldest
/// insertion is dropped.
#[derive(Debug)]
pub struct IndexCache {
    indices: RwLock<HashMap<String, CachedIndex>>,
    capacity: Option<usize>,
    inserts: AtomicU64,
}

impl IndexCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self { indices: RwLock::new(HashMap::new()), capacity, inserts: AtomicU64::new(0) }
    }

    pub async fn get(&self, document_id: &str, content_hash: &str) -> Option<Arc<VectorIndex>> {
        let indices = self.indices.read().await;
        indices
            .get(document_id)
            .filter(|cached| cached.content_hash == content_hash)
            .map(|cached| Arc::clone(&cached.index))
    }

    pub async fn insert(&self, document_id: &str, content_hash: &str, index: Arc<VectorIndex>) {
        let mut indices = self.indices.write().await;
        if let Some(capacity) = self.capacity {
            while indices.len() >= capacity && !indices.contains_key(document_id) {
                let Some(oldest) =
                    indices.iter().min_by_key(|(_, c)| c.inserted).map(|(id, _)| id.clone())
                else {
                    break;
                };
                indices.remove(&oldest);
            }
        }

        let inserted = self.inserts.fetch_add(1, Ordering::Relaxed);
        indices.insert(
            document_id.to_string(),
            CachedIndex { content_hash: content_hash.to_string(), index, inserted },
        );
    }

    pub async fn invalidate(&self, document_id: &str) {
        self.indices.write().await.remove(document_id);
    }

    pub async fn len(&self) -> usize {
        self.indices.read().await.len()
    }
}
