//! Data types for extracted papers, chunks, and retrieval candidates.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Placeholder rendered for citation fields the extractor could not supply.
pub const UNKNOWN: &str = "unknown";

/// Citation fields attached to every chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationMetadata {
    /// Stable paper identifier, usually a DOI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    /// Publication year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Page the chunk starts on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Section the chunk starts in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl CitationMetadata {
    pub fn paper_id_or_unknown(&self) -> &str {
        self.paper_id.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn year_or_unknown(&self) -> &str {
        self.year.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn page_or_unknown(&self) -> &str {
        self.page.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn section_or_unknown(&self) -> &str {
        self.section.as_deref().unwrap_or(UNKNOWN)
    }
}

/// A contiguous span of a paper's extracted text; the retrieval unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The trimmed text content of the chunk, including any overlap.
    pub text: String,
    /// The id of the [`Document`] this chunk belongs to.
    pub document_id: String,
    /// Position in the document's chunk sequence, dense from zero.
    pub index: usize,
    /// Length of `text` in characters.
    pub char_count: usize,
    /// Citation fields rendered into the context block.
    pub metadata: CitationMetadata,
}

impl Chunk {
    /// Create a chunk, computing `char_count` from `text`.
    pub fn new(
        document_id: impl Into<String>,
        index: usize,
        text: impl Into<String>,
        metadata: CitationMetadata,
    ) -> Self {
        let text = text.into();
        let char_count = text.chars().count();
        Self { text, document_id: document_id.into(), index, char_count, metadata }
    }
}

/// A stored paper: its id and the chunks produced from its text.
///
/// Documents are immutable once created; re-uploading produces a new id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Opaque identifier assigned at upload time.
    pub id: String,
    /// Paper title, if extraction found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Chunks in original-text order.
    pub chunks: Vec<Chunk>,
    /// Hex SHA-256 over the chunk texts.
    pub content_hash: String,
}

impl Document {
    /// Create a document, hashing its chunk texts.
    pub fn new(id: impl Into<String>, title: Option<String>, chunks: Vec<Chunk>) -> Self {
        let content_hash = content_hash(&chunks);
        Self { id: id.into(), title, chunks, content_hash }
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the document has no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn content_hash(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update((chunk.text.len() as u64).to_le_bytes());
        hasher.update(chunk.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// A named region of [`ExtractedText::text`], as byte offsets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// The byte offset in [`ExtractedText::text`] where `page` begins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageBreak {
    pub offset: usize,
    pub page: String,
}

/// Plain text produced by an extractor, with the structure it recovered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedText {
    /// The full plain text that gets chunked.
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
    /// Section regions, ordered by `start` and non-overlapping.
    #[serde(default)]
    pub sections: Vec<SectionSpan>,
    /// Page starts, ordered by `offset`.
    #[serde(default)]
    pub pages: Vec<PageBreak>,
}

impl ExtractedText {
    /// Wrap unstructured text with no citation information.
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Whether there is nothing to index.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Citation fields for a chunk whose own text begins at `offset`.
    pub fn citation_at(&self, offset: usize) -> CitationMetadata {
        let section = self
            .sections
            .iter()
            .find(|s| s.start <= offset && offset < s.end)
            .map(|s| s.name.clone());
        let page = self
            .pages
            .iter()
            .take_while(|p| p.offset <= offset)
            .last()
            .map(|p| p.page.clone());

        CitationMetadata {
            paper_id: self.paper_id.clone(),
            year: self.year.clone(),
            page,
            section,
        }
    }
}

/// A chunk scored against a query during one retrieval call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalCandidate {
    /// The candidate chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query embedding.
    pub relevance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured() -> ExtractedText {
        ExtractedText {
            text: "Title: T\n\nAbstract:\nA\n\nMethods\nM".to_string(),
            title: Some("T".into()),
            year: Some("2021".into()),
            paper_id: None,
            sections: vec![
                SectionSpan { name: "Title".into(), start: 0, end: 8 },
                SectionSpan { name: "Abstract".into(), start: 10, end: 21 },
                SectionSpan { name: "Methods".into(), start: 23, end: 32 },
            ],
            pages: vec![
                PageBreak { offset: 0, page: "1".into() },
                PageBreak { offset: 23, page: "2".into() },
            ],
        }
    }

    #[test]
    fn citation_follows_section_and_page_of_offset() {
        let text = structured();

        let abstract_cite = text.citation_at(12);
        assert_eq!(abstract_cite.section.as_deref(), Some("Abstract"));
        assert_eq!(abstract_cite.page.as_deref(), Some("1"));
        assert_eq!(abstract_cite.year.as_deref(), Some("2021"));
        assert_eq!(abstract_cite.paper_id_or_unknown(), UNKNOWN);

        let body_cite = text.citation_at(25);
        assert_eq!(body_cite.section.as_deref(), Some("Methods"));
        assert_eq!(body_cite.page.as_deref(), Some("2"));
    }

    #[test]
    fn offsets_between_sections_have_no_section() {
        assert_eq!(structured().citation_at(9).section, None);
    }

    #[test]
    fn content_hash_depends_on_chunk_text() {
        let a = Document::new("a", None, vec![Chunk::new("a", 0, "alpha", Default::default())]);
        let b = Document::new("b", None, vec![Chunk::new("b", 0, "alpha", Default::default())]);
        let c = Document::new("c", None, vec![Chunk::new("c", 0, "beta", Default::default())]);
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn char_count_counts_characters_not_bytes() {
        let chunk = Chunk::new("d", 0, "naïve", CitationMetadata::default());
        assert_eq!(chunk.char_count, 5);
    }
}
