//! Request and response types for a transport layer in front of the
//! pipeline.
//!
//! Errors map to HTTP statuses through
//! [`RagError::status_code`](crate::RagError::status_code).

use serde::{Deserialize, Serialize};

/// Returned after a PDF has been extracted, chunked and stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadReceipt {
    pub document_id: String,
    pub chunk_count: usize,
    /// Paper title, if extraction found one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A question about one uploaded document.
///
/// `k` and `fetch_k` fall back to the pipeline's configured
/// [`default_k`](crate::RagConfig::default_k) and
/// [`default_fetch_k`](crate::RagConfig::default_fetch_k) when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    pub document_id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_k: Option<usize>,
}

impl AskRequest {
    /// A request leaving `k` and `fetch_k` to the pipeline's config.
    pub fn new(document_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self { document_id: document_id.into(), question: question.into(), k: None, fetch_k: None }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    pub fn with_fetch_k(mut self, fetch_k: usize) -> Self {
        self.fetch_k = Some(fetch_k);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResponse {
    pub answer: String,
}
