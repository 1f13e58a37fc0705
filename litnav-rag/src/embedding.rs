//! The embedding seam between LitNav and a vector model.

use async_trait::async_trait;

use crate::error::Result;

/// Turns chunk texts and questions into vectors in one shared space.
///
/// LitNav calls [`embed_batch`](EmbeddingProvider::embed_batch) while
/// building a [`VectorIndex`](crate::VectorIndex), with at most
/// [`RagConfig::embed_batch_size`](crate::RagConfig::embed_batch_size) chunk
/// texts per call, and [`embed`](EmbeddingProvider::embed) once per
/// question. Chunks and questions must go through the same model, or cosine
/// scores between them mean nothing.
///
/// A failed call fails the whole question; nothing is retried. Report it as
/// [`RagError::CollaboratorUnavailable`](crate::RagError::CollaboratorUnavailable)
/// with [`Collaborator::Embedding`](crate::Collaborator::Embedding). Other
/// error variants are re-labelled as embedding failures by the pipeline.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one question.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of chunk texts.
    ///
    /// The result is positional: vector `i` belongs to `texts[i]`, and a
    /// reply of the wrong length is rejected by the index. Without an
    /// override this falls back to one [`embed`](EmbeddingProvider::embed)
    /// call per text, stopping at the first failure.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}
