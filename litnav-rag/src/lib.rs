//! Retrieval-augmented question answering over research papers.
//!
//! This crate provides:
//! - Recursive, overlapping chunking of extracted paper text with citation
//!   metadata (paper id, year, page, section) on every chunk
//! - A bounded in-memory document store
//! - Per-document vector indices and MMR retrieval
//! - Citation-tagged context formatting and prompt construction
//! - The [`LitNavPipeline`] tying upload and answering together
//!
//! HTTP collaborators are feature-gated: `grobid` for PDF extraction and
//! `openai` for embeddings and chat completions.

pub mod api;
pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod generation;
pub mod index;
pub mod mmr;
pub mod pipeline;
pub mod store;
pub mod tei;

#[cfg(feature = "grobid")]
pub mod grobid;
#[cfg(feature = "openai")]
pub mod openai;

pub use api::{AnswerResponse, AskRequest, UploadReceipt};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{citation_tag, format_context};
pub use document::{
    Chunk, CitationMetadata, Document, ExtractedText, PageBreak, RetrievalCandidate, SectionSpan,
};
pub use embedding::EmbeddingProvider;
pub use error::{Collaborator, RagError, Result};
pub use extraction::Extractor;
pub use generation::{Generator, SYSTEM_PROMPT, build_user_prompt};
pub use index::{IndexCache, IndexedChunk, VectorIndex, cosine_similarity};
pub use mmr::MmrRetriever;
pub use pipeline::{LitNavPipeline, LitNavPipelineBuilder};
pub use store::{DocumentStore, InMemoryDocumentStore, StorePolicy};
pub use tei::parse_tei;

#[cfg(feature = "grobid")]
pub use grobid::{GrobidConfig, GrobidExtractor};
#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIEmbeddingProvider, OpenAIGenerator};
