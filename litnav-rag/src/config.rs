//! Configuration for the LitNav pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the LitNav pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks handed to generation when a request does not say.
    pub default_k: usize,
    /// Size of the relevance-ranked candidate pool when a request does not say.
    pub default_fetch_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity.
    pub mmr_lambda: f32,
    /// Maximum number of texts per embedding request.
    pub embed_batch_size: usize,
    /// Reuse vector indices across questions on the same document.
    pub cache_indices: bool,
    /// Maximum number of stored documents; `None` means unbounded.
    pub store_capacity: Option<usize>,
    /// How long a stored document stays available; `None` means forever.
    #[serde(with = "optional_secs")]
    pub store_ttl: Option<Duration>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            default_k: 8,
            default_fetch_k: 20,
            mmr_lambda: 0.5,
            embed_batch_size: 64,
            cache_indices: false,
            store_capacity: Some(256),
            store_ttl: Some(Duration::from_secs(24 * 60 * 60)),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that parameters are consistent.
    ///
    /// Deserialized configs bypass the builder, so callers loading one from
    /// disk should run this before use.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.default_k == 0 {
            return Err(RagError::Config("default_k must be greater than zero".to_string()));
        }
        if self.default_fetch_k == 0 {
            return Err(RagError::Config("default_fetch_k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::Config("embed_batch_size must be greater than zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return Err(RagError::Config(format!(
                "mmr_lambda ({}) must be within 0.0..=1.0",
                self.mmr_lambda
            )));
        }
        if self.store_capacity == Some(0) {
            return Err(RagError::Config("store_capacity must be greater than zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of chunks passed to generation.
    pub fn default_k(mut self, k: usize) -> Self {
        self.config.default_k = k;
        self
    }

    /// Set the default MMR candidate pool size.
    pub fn default_fetch_k(mut self, fetch_k: usize) -> Self {
        self.config.default_fetch_k = fetch_k;
        self
    }

    /// Set the MMR relevance/diversity trade-off.
    pub fn mmr_lambda(mut self, lambda: f32) -> Self {
        self.config.mmr_lambda = lambda;
        self
    }

    /// Set the maximum number of texts per embedding request.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Enable or disable the per-document index cache.
    pub fn cache_indices(mut self, enabled: bool) -> Self {
        self.config.cache_indices = enabled;
        self
    }

    /// Bound the number of stored documents.
    pub fn store_capacity(mut self, capacity: Option<usize>) -> Self {
        self.config.store_capacity = capacity;
        self
    }

    /// Set how long stored documents stay available.
    pub fn store_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.config.store_ttl = ttl;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `default_k`, `default_fetch_k`, `embed_batch_size` or `store_capacity` is zero
    /// - `mmr_lambda` is outside `0.0..=1.0`
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
