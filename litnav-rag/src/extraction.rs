//! PDF-to-text extraction seam.

use async_trait::async_trait;

use crate::document::ExtractedText;
use crate::error::Result;

/// Turns the bytes of a PDF into plain text with recovered structure.
///
/// Implementations call out to a document-structure service (see
/// `GrobidExtractor` behind the `grobid` feature). Failures should be
/// reported as
/// [`RagError::CollaboratorUnavailable`](crate::RagError::CollaboratorUnavailable)
/// with [`Collaborator::Extraction`](crate::Collaborator::Extraction). An
/// unreadable but well-formed PDF should yield blank text rather than an
/// error; the pipeline reports that as
/// [`RagError::NoContentExtracted`](crate::RagError::NoContentExtracted).
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, pdf: &[u8]) -> Result<ExtractedText>;
}
