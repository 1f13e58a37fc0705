//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use litnav_rag::{
    EmbeddingProvider, ExtractedText, Extractor, Generator, LitNavPipeline, PageBreak, RagConfig,
    RagError, Result, SectionSpan,
};

/// Hash-based embeddings: identical texts get identical vectors, and each
/// word contributes to a fixed bucket so overlapping vocabularies score
/// higher than disjoint ones.
pub struct HashEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, calls: AtomicUsize::new(0), failing: AtomicBool::new(false) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RagError::embedding("embedder offline"));
        }

        let mut emb = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        // Keep blank input away from the zero vector.
        emb[0] += 0.01;

        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        emb.iter_mut().for_each(|x| *x /= norm);
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Returns the same extraction for every PDF, or fails.
pub struct StaticExtractor {
    extracted: Option<ExtractedText>,
    calls: AtomicUsize,
}

impl StaticExtractor {
    pub fn returning(extracted: ExtractedText) -> Self {
        Self { extracted: Some(extracted), calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { extracted: None, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    async fn extract(&self, _pdf: &[u8]) -> Result<ExtractedText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.extracted.clone().ok_or_else(|| RagError::extraction("connection refused"))
    }
}

/// Records every prompt and answers with a fixed string.
pub struct RecordingGenerator {
    reply: String,
    prompts: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// `(system, user)` prompt pairs in call order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push((system_prompt.to_string(), user_prompt.to_string()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(RagError::generation("model overloaded"));
        }
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "recording"
    }
}

pub const REPLY: &str = "The sources say so [10.1000/test, 2021, p.2, Methods].";

/// Collaborators wired into a pipeline, kept for call-count assertions.
pub struct Harness {
    pub pipeline: LitNavPipeline,
    pub extractor: Arc<StaticExtractor>,
    pub embedder: Arc<HashEmbedder>,
    pub generator: Arc<RecordingGenerator>,
}

pub fn harness(extractor: StaticExtractor, config: RagConfig) -> Harness {
    let extractor = Arc::new(extractor);
    let embedder = Arc::new(HashEmbedder::new(32));
    let generator = Arc::new(RecordingGenerator::new(REPLY));

    let pipeline = LitNavPipeline::builder()
        .config(config)
        .extractor(extractor.clone())
        .embedding_provider(embedder.clone())
        .generator(generator.clone())
        .build()
        .unwrap();

    Harness { pipeline, extractor, embedder, generator }
}

/// A paragraph of exactly `len` characters that ends in a letter.
pub fn paragraph(seed: &str, len: usize) -> String {
    let unit = format!("{seed} ");
    let mut text: String = unit.repeat(len / unit.len() + 1).chars().take(len).collect();
    if text.ends_with(' ') {
        text.pop();
        text.push('x');
    }
    text
}

/// A small paper with a title, an abstract, two sections and a page break.
///
/// With the default 1000/200 chunking it yields three chunks; the Results
/// block is exactly 1000 characters with its separator, so the last chunk
/// starts on the Results heading with no carried overlap.
pub fn sample_paper() -> ExtractedText {
    let title = "Title: Diverse Retrieval for Paper QA";
    let abstract_block = "Abstract:\nWe study retrieval for question answering over papers.";
    let methods = format!(
        "Methods\n{}\n\n{}",
        paragraph("transformers encode every chunk", 700),
        paragraph("maximal marginal relevance balances novelty", 700)
    );
    let results = format!("Results\n{}", paragraph("accuracy improved on every benchmark", 990));

    let mut text = String::new();
    let mut sections = Vec::new();
    for (name, block) in [
        ("Title", title.to_string()),
        ("Abstract", abstract_block.to_string()),
        ("Methods", methods),
        ("Results", results),
    ] {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        let start = text.len();
        text.push_str(&block);
        sections.push(SectionSpan { name: name.to_string(), start, end: text.len() });
    }

    let results_start = sections[3].start;
    ExtractedText {
        text,
        title: Some("Diverse Retrieval for Paper QA".to_string()),
        year: Some("2021".to_string()),
        paper_id: Some("10.1000/test".to_string()),
        sections,
        pages: vec![
            PageBreak { offset: 0, page: "1".to_string() },
            PageBreak { offset: results_start, page: "2".to_string() },
        ],
    }
}
