//! Maximal Marginal Relevance (MMR) retrieval.
//!
//! MMR picks chunks one at a time, balancing relevance to the query against
//! redundancy with what is already picked:
//!
//! `score(c) = λ × sim(query, c) − (1 − λ) × max(sim(c, s) for s in selected)`
//!
//! λ = 1.0 is plain top-k by similarity; λ = 0.0 is pure diversity.

use std::cmp::Ordering;

use tracing::debug;

use crate::document::RetrievalCandidate;
use crate::error::{RagError, Result};
use crate::index::{IndexedChunk, VectorIndex, cosine_similarity};

/// Check `k` and `fetch_k` before any work is done on their behalf.
///
/// # Errors
///
/// Returns [`RagError::InvalidInput`] if either is zero.
pub fn validate_retrieval_params(k: usize, fetch_k: usize) -> Result<()> {
    if k < 1 {
        return Err(RagError::InvalidInput("k must be at least 1".to_string()));
    }
    if fetch_k < 1 {
        return Err(RagError::InvalidInput("fetch_k must be at least 1".to_string()));
    }
    Ok(())
}

/// Selects a relevant, non-redundant subset of an index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmrRetriever {
    lambda: f32,
}

impl Default for MmrRetriever {
    fn default() -> Self {
        Self { lambda: Self::DEFAULT_LAMBDA }
    }
}

/// A pool member: an index entry and its similarity to the query.
struct PoolEntry<'a> {
    entry: &'a IndexedChunk,
    relevance: f32,
}

impl MmrRetriever {
    pub const DEFAULT_LAMBDA: f32 = 0.5;

    /// Create a retriever; `lambda` is clamped to `0.0..=1.0`.
    pub fn new(lambda: f32) -> Self {
        Self { lambda: lambda.clamp(0.0, 1.0) }
    }

    pub fn lambda(&self) -> f32 {
        self.lambda
    }

    /// Select up to `k` chunks from the `fetch_k` most similar ones.
    ///
    /// `k` larger than `fetch_k` is capped at `fetch_k`. Results come back in
    /// selection order, not document order. Ties are broken by ascending
    /// chunk index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] if `k` or `fetch_k` is zero, and an
    /// embedding error if the query and index dimensions differ.
    pub fn retrieve(
        &self,
        index: &VectorIndex,
        query: &[f32],
        k: usize,
        fetch_k: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        validate_retrieval_params(k, fetch_k)?;
        if index.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != index.dimensions() {
            return Err(RagError::embedding(format!(
                "query embedding has {} dimensions, index has {}",
                query.len(),
                index.dimensions()
            )));
        }

        let pool = candidate_pool(index, query, fetch_k);
        let k = k.min(pool.len());

        let mut selected: Vec<usize> = Vec::with_capacity(k);
        let mut taken = vec![false; pool.len()];
        // Highest similarity of each pool member to anything selected so far.
        let mut redundancy = vec![f32::NEG_INFINITY; pool.len()];

        while selected.len() < k {
            let mut best: Option<(usize, f32)> = None;

            for (i, candidate) in pool.iter().enumerate() {
                if taken[i] {
                    continue;
                }
                let penalty = if selected.is_empty() { 0.0 } else { redundancy[i] };
                let score = self.lambda * candidate.relevance - (1.0 - self.lambda) * penalty;

                let better = match best {
                    None => true,
                    Some((j, best_score)) => match score.total_cmp(&best_score) {
                        Ordering::Greater => true,
                        Ordering::Equal => chunk_index(&pool[i]) < chunk_index(&pool[j]),
                        Ordering::Less => false,
                    },
                };
                if better {
                    best = Some((i, score));
                }
            }

            let Some((pick, _)) = best else { break };
            taken[pick] = true;
            selected.push(pick);

            let picked = &pool[pick].entry.embedding;
            for (i, candidate) in pool.iter().enumerate() {
                if !taken[i] {
                    let sim = cosine_similarity(&candidate.entry.embedding, picked);
                    redundancy[i] = redundancy[i].max(sim);
                }
            }
        }

        debug!(
            pool_size = pool.len(),
            selected = selected.len(),
            lambda = self.lambda,
            "mmr selection complete"
        );

        Ok(selected
            .into_iter()
            .map(|i| RetrievalCandidate {
                chunk: pool[i].entry.chunk.clone(),
                relevance: pool[i].relevance,
            })
            .collect())
    }
}

fn chunk_index(candidate: &PoolEntry<'_>) -> usize {
    candidate.entry.chunk.index
}

/// The `fetch_k` entries most similar to `query`, best first.
fn candidate_pool<'a>(index: &'a VectorIndex, query: &[f32], fetch_k: usize) -> Vec<PoolEntry<'a>> {
    let mut pool: Vec<PoolEntry<'a>> = index
        .entries()
        .iter()
        .map(|entry| PoolEntry { entry, relevance: cosine_similarity(query, &entry.embedding) })
        .collect();

    pool.sort_by(|a, b| {
        b.relevance.total_cmp(&a.relevance).then_with(|| chunk_index(a).cmp(&chunk_index(b)))
    });
    pool.truncate(fetch_k);
    pool
}
