//! Error types for the `litnav-rag` crate.

use std::fmt;

use thiserror::Error;

/// The external service a [`RagError::CollaboratorUnavailable`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    /// PDF-to-text extraction.
    Extraction,
    /// Embedding computation.
    Embedding,
    /// Answer generation.
    Generation,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extraction => "extraction",
            Self::Embedding => "embedding",
            Self::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in LitNav operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied an unusable upload or parameter.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No document is stored under the given id.
    #[error("Document not found: {document_id}")]
    NotFound {
        /// The id that was looked up.
        document_id: String,
    },

    /// An external collaborator failed or returned an unusable response.
    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        /// Which collaborator failed.
        collaborator: Collaborator,
        /// A description of the failure.
        message: String,
    },

    /// Extraction succeeded but produced no indexable text.
    #[error("No text extracted from PDF")]
    NoContentExtracted,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// Shorthand for an extraction failure.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: Collaborator::Extraction,
            message: message.into(),
        }
    }

    /// Shorthand for an embedding failure.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: Collaborator::Embedding,
            message: message.into(),
        }
    }

    /// Shorthand for a generation failure.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: Collaborator::Generation,
            message: message.into(),
        }
    }

    /// Shorthand for an unknown document id.
    pub fn not_found(document_id: impl Into<String>) -> Self {
        Self::NotFound { document_id: document_id.into() }
    }

    /// Whether the caller caused this error and should not retry unchanged.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::NotFound { .. } | Self::NoContentExtracted)
    }

    /// Whether an external collaborator caused this error.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::CollaboratorUnavailable { .. })
    }

    /// The HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound { .. } => 404,
            Self::NoContentExtracted => 422,
            Self::CollaboratorUnavailable { .. } => 503,
            Self::Config(_) => 500,
        }
    }
}

/// A convenience result type for LitNav operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors_for_transport() {
        assert_eq!(RagError::InvalidInput("k".into()).status_code(), 400);
        assert_eq!(RagError::not_found("doc").status_code(), 404);
        assert_eq!(RagError::NoContentExtracted.status_code(), 422);
        assert_eq!(RagError::embedding("timeout").status_code(), 503);

        assert!(RagError::not_found("doc").is_client_error());
        assert!(!RagError::generation("boom").is_client_error());
        assert!(RagError::extraction("boom").is_unavailable());
    }

    #[test]
    fn display_names_the_collaborator() {
        let err = RagError::embedding("connection reset");
        assert_eq!(err.to_string(), "embedding unavailable: connection reset");
    }
}
