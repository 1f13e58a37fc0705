//! LitNav pipeline orchestrator.
//!
//! The [`LitNavPipeline`] coordinates upload (extract → chunk → store) and
//! question answering (lookup → index → embed query → MMR retrieve → format
//! context → generate) by composing an [`Extractor`], an
//! [`EmbeddingProvider`], a [`Generator`], a [`DocumentStore`] and a
//! [`Chunker`].
//!
//! # Example
//!
//! ```rust,ignore
//! use litnav_rag::{LitNavPipeline, RagConfig};
//!
//! let pipeline = LitNavPipeline::builder()
//!     .config(RagConfig::default())
//!     .extractor(Arc::new(grobid))
//!     .embedding_provider(Arc::new(embedder))
//!     .generator(Arc::new(llm))
//!     .build()?;
//!
//! let receipt = pipeline.upload_document(Some("paper.pdf"), &bytes).await?;
//! let answer = pipeline.answer(&receipt.document_id, "What is the main result?", 8, 20).await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::api::{AnswerResponse, AskRequest, UploadReceipt};
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::context::format_context;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{Collaborator, RagError, Result};
use crate::extraction::Extractor;
use crate::generation::{Generator, SYSTEM_PROMPT, build_user_prompt};
use crate::index::{IndexCache, VectorIndex};
use crate::mmr::{MmrRetriever, validate_retrieval_params};
use crate::store::{DocumentStore, InMemoryDocumentStore, StorePolicy};

/// The LitNav pipeline orchestrator.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and requests
/// run independently. Construct one via [`LitNavPipeline::builder()`].
pub struct LitNavPipeline {
    config: RagConfig,
    extractor: Arc<dyn Extractor>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn Generator>,
    document_store: Arc<dyn DocumentStore>,
    chunker: Arc<dyn Chunker>,
    retriever: MmrRetriever,
    index_cache: Option<IndexCache>,
}

impl LitNavPipeline {
    /// Create a new [`LitNavPipelineBuilder`].
    pub fn builder() -> LitNavPipelineBuilder {
        LitNavPipelineBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn document_store(&self) -> &Arc<dyn DocumentStore> {
        &self.document_store
    }

    /// The index cache, when `cache_indices` is enabled.
    pub fn index_cache(&self) -> Option<&IndexCache> {
        self.index_cache.as_ref()
    }

    /// Extract, chunk and store a PDF under a fresh document id.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `pdf` is empty or `filename` does not
    ///   end in `.pdf`.
    /// - [`RagError::CollaboratorUnavailable`] if extraction fails.
    /// - [`RagError::NoContentExtracted`] if no text or no chunks come out.
    pub async fn upload_document(
        &self,
        filename: Option<&str>,
        pdf: &[u8],
    ) -> Result<UploadReceipt> {
        if let Some(name) = filename {
            if !name.to_ascii_lowercase().ends_with(".pdf") {
                return Err(RagError::InvalidInput(format!("'{name}' is not a .pdf file")));
            }
        }
        if pdf.is_empty() {
            return Err(RagError::InvalidInput("uploaded PDF is empty".to_string()));
        }

        let extracted = self.extractor.extract(pdf).await.map_err(|e| {
            error!(filename = filename.unwrap_or_default(), error = %e, "extraction failed");
            as_collaborator_failure(e, Collaborator::Extraction)
        })?;
        if extracted.is_blank() {
            return Err(RagError::NoContentExtracted);
        }

        let document_id = uuid::Uuid::new_v4().to_string();
        let chunks = self.chunker.chunk(&document_id, &extracted);
        if chunks.is_empty() {
            return Err(RagError::NoContentExtracted);
        }

        let title = extracted.title;
        let document = Document::new(document_id.clone(), title.clone(), chunks);
        let chunk_count = document.len();
        self.document_store.put(document).await?;

        info!(
            document.id = %document_id,
            chunk_count,
            title = title.as_deref(),
            "uploaded document"
        );
        Ok(UploadReceipt { document_id, chunk_count, title })
    }

    /// Answer a question from one stored document.
    ///
    /// Parameters are checked before the document is looked up, and the
    /// lookup happens before any collaborator is called.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `k` or `fetch_k` is zero or the
    ///   question is blank.
    /// - [`RagError::NotFound`] if no document has this id.
    /// - [`RagError::CollaboratorUnavailable`] if embedding or generation
    ///   fails.
    pub async fn answer(
        &self,
        document_id: &str,
        question: &str,
        k: usize,
        fetch_k: usize,
    ) -> Result<String> {
        validate_retrieval_params(k, fetch_k)?;
        if question.trim().is_empty() {
            return Err(RagError::InvalidInput("question must not be blank".to_string()));
        }

        // 1. Lookup
        let document = self.document_store.get(document_id).await?;

        // 2. Build (or reuse) the vector index
        let index = self.index_for(&document).await?;

        // 3. Embed the question
        let query = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(document.id = %document_id, error = %e, "query embedding failed");
            as_collaborator_failure(e, Collaborator::Embedding)
        })?;

        // 4. Retrieve
        let candidates = self.retriever.retrieve(&index, &query, k, fetch_k)?;
        debug!(
            document.id = %document_id,
            selected = candidates.len(),
            pool = fetch_k.min(index.len()),
            "retrieved context chunks"
        );

        // 5. Format context and generate
        let context = format_context(candidates.iter().map(|c| &c.chunk));
        let prompt = build_user_prompt(question, &context);
        let answer = self.generator.complete(SYSTEM_PROMPT, &prompt).await.map_err(|e| {
            error!(
                document.id = %document_id,
                model = self.generator.model(),
                error = %e,
                "generation failed"
            );
            as_collaborator_failure(e, Collaborator::Generation)
        })?;

        info!(document.id = %document_id, k, fetch_k, answer_len = answer.len(), "answered question");
        Ok(answer)
    }

    /// [`answer`](Self::answer) for a deserialized request. Omitted `k` and
    /// `fetch_k` take the configured defaults.
    pub async fn ask(&self, request: &AskRequest) -> Result<AnswerResponse> {
        let k = request.k.unwrap_or(self.config.default_k);
        let fetch_k = request.fetch_k.unwrap_or(self.config.default_fetch_k);
        let answer = self.answer(&request.document_id, &request.question, k, fetch_k).await?;
        Ok(AnswerResponse { answer })
    }

    /// Remove a document and any cached index for it. Returns whether the
    /// document was stored.
    pub async fn remove_document(&self, document_id: &str) -> Result<bool> {
        // Store first: answers that look the id up after this point get NotFound
        // and never re-insert an index for it.
        let removed = self.document_store.remove(document_id).await?;
        if let Some(cache) = &self.index_cache {
            cache.invalidate(document_id).await;
        }
        if removed {
            info!(document.id = %document_id, "removed document");
        }
        Ok(removed)
    }

    async fn index_for(&self, document: &Document) -> Result<Arc<VectorIndex>> {
        if let Some(cache) = &self.index_cache {
            if let Some(index) = cache.get(&document.id, &document.content_hash).await {
                debug!(document.id = %document.id, "reusing cached index");
                return Ok(index);
            }
        }

        let index = VectorIndex::build(
            &document.chunks,
            self.embedding_provider.as_ref(),
            self.config.embed_batch_size,
        )
        .await
        .map_err(|e| {
            error!(document.id = %document.id, error = %e, "index build failed");
            as_collaborator_failure(e, Collaborator::Embedding)
        })?;
        let index = Arc::new(index);

        if let Some(cache) = &self.index_cache {
            cache.insert(&document.id, &document.content_hash, Arc::clone(&index)).await;
        }
        Ok(index)
    }
}

/// Attribute a collaborator's error to it, keeping errors that already are.
fn as_collaborator_failure(err: RagError, collaborator: Collaborator) -> RagError {
    match err {
        RagError::CollaboratorUnavailable { .. } => err,
        other => RagError::CollaboratorUnavailable { collaborator, message: other.to_string() },
    }
}

/// Builder for constructing a [`LitNavPipeline`].
///
/// The extractor, embedding provider and generator are required. The config
/// defaults to [`RagConfig::default()`], the store to an
/// [`InMemoryDocumentStore`] with the config's [`StorePolicy`], and the
/// chunker to a [`RecursiveChunker`] with the config's sizes.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = LitNavPipeline::builder()
///     .config(config)
///     .extractor(Arc::new(extractor))
///     .embedding_provider(Arc::new(embedder))
///     .generator(Arc::new(generator))
///     .document_store(Arc::new(store))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct LitNavPipelineBuilder {
    config: Option<RagConfig>,
    extractor: Option<Arc<dyn Extractor>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn Generator>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl LitNavPipelineBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override the document store.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Override the chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`LitNavPipeline`], validating the config and that all
    /// required collaborators are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the config is invalid or a required
    /// collaborator is missing.
    pub fn build(self) -> Result<LitNavPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let extractor =
            self.extractor.ok_or_else(|| RagError::Config("extractor is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;

        let document_store = match self.document_store {
            Some(store) => store,
            None => Arc::new(InMemoryDocumentStore::with_policy(StorePolicy::from_config(&config))),
        };
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::from_config(&config)?),
        };
        let index_cache = config.cache_indices.then(|| IndexCache::new(config.store_capacity));

        Ok(LitNavPipeline {
            retriever: MmrRetriever::new(config.mmr_lambda),
            config,
            extractor,
            embedding_provider,
            generator,
            document_store,
            chunker,
            index_cache,
        })
    }
}
