//! GROBID full-text extraction.
//!
//! This module is only available when the `grobid` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, error};

use crate::document::ExtractedText;
use crate::error::{RagError, Result};
use crate::extraction::Extractor;
use crate::tei::parse_tei;

const DEFAULT_BASE_URL: &str = "http://localhost:8070";
const FULLTEXT_PATH: &str = "/api/processFulltextDocument";

/// Where the GROBID service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct GrobidConfig {
    /// Service root, without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
    /// Ask GROBID to consolidate header metadata (DOI, year) against
    /// external bibliographic sources.
    pub consolidate_header: bool,
}

impl Default for GrobidConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            consolidate_header: true,
        }
    }
}

impl GrobidConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_consolidate_header(mut self, enabled: bool) -> Self {
        self.consolidate_header = enabled;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{FULLTEXT_PATH}", self.base_url)
    }
}

/// An [`Extractor`] that sends PDFs to a GROBID server and parses the TEI
/// it returns.
pub struct GrobidExtractor {
    client: reqwest::Client,
    config: GrobidConfig,
}

impl GrobidExtractor {
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the HTTP client cannot be built.
    pub fn new(config: GrobidConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build GROBID client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Extractor for GrobidExtractor {
    async fn extract(&self, pdf: &[u8]) -> Result<ExtractedText> {
        debug!(extractor = "GROBID", pdf_bytes = pdf.len(), "requesting full-text extraction");

        let part = Part::bytes(pdf.to_vec())
            .file_name("paper.pdf")
            .mime_str("application/pdf")
            .map_err(|e| RagError::extraction(format!("invalid multipart body: {e}")))?;
        let form = Form::new()
            .part("input", part)
            .text("consolidateHeader", if self.config.consolidate_header { "1" } else { "0" });

        let response =
            self.client.post(self.config.endpoint()).multipart(form).send().await.map_err(|e| {
                error!(extractor = "GROBID", error = %e, "extraction request failed");
                RagError::extraction(format!("GROBID request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(extractor = "GROBID", %status, "extraction rejected");
            return Err(RagError::extraction(format!("GROBID returned {status}: {body}")));
        }

        let tei = response.text().await.map_err(|e| {
            error!(extractor = "GROBID", error = %e, "failed to read TEI body");
            RagError::extraction(format!("failed to read GROBID response: {e}"))
        })?;

        let extracted = parse_tei(&tei)?;
        debug!(
            extractor = "GROBID",
            text_len = extracted.text.len(),
            sections = extracted.sections.len(),
            "parsed TEI"
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_path() {
        let config = GrobidConfig::new("http://grobid:8070/");
        assert_eq!(config.endpoint(), "http://grobid:8070/api/processFulltextDocument");
    }

    #[test]
    fn header_consolidation_is_on_by_default() {
        assert!(GrobidConfig::default().consolidate_header);
    }
}
