//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits hierarchically by paragraphs, lines, sentences, words, then
//! characters, and merges the pieces back into overlapping chunks.

use std::collections::VecDeque;
use std::ops::Range;

use crate::config::RagConfig;
use crate::document::{Chunk, ExtractedText};
use crate::error::{RagError, Result};

/// Separators tried in order, largest scope first. The empty separator
/// splits between characters.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// A strategy for splitting extracted text into chunks.
pub trait Chunker: Send + Sync {
    /// Split extracted text into chunks belonging to `document_id`.
    ///
    /// Returns an empty `Vec` if the text is empty or whitespace-only.
    /// Chunk indices are dense from zero in text order.
    fn chunk(&self, document_id: &str, extracted: &ExtractedText) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Text is first broken at the largest separator that occurs in it; any
/// piece longer than `chunk_size` is broken again at the next separator.
/// Separators stay attached to the start of the following piece. Pieces are
/// then merged greedily into chunks of at most `chunk_size` characters, and
/// each new chunk begins with up to `chunk_overlap` trailing characters of
/// the chunk before it.
///
/// # Example
///
/// ```rust,ignore
/// use litnav_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.split("doc-1", &text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` : maximum number of characters per chunk
    /// * `chunk_overlap` : number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidInput`] unless `chunk_size > chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidInput(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split unstructured text. Citation fields are left unset.
    pub fn split(&self, document_id: &str, text: &str) -> Vec<Chunk> {
        self.chunk(document_id, &ExtractedText::plain(text))
    }

    /// The untrimmed chunks, in text order.
    fn chunk_ranges(&self, text: &str) -> Vec<MergedChunk> {
        let mut pieces = Vec::new();
        split_recursive(text, 0, &SEPARATORS, self.chunk_size, &mut pieces);
        merge_pieces(text, pieces, self.chunk_size, self.chunk_overlap)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document_id: &str, extracted: &ExtractedText) -> Vec<Chunk> {
        if extracted.is_blank() {
            return Vec::new();
        }

        let text = extracted.text.as_str();
        self.chunk_ranges(text)
            .into_iter()
            .filter_map(|merged| {
                let raw = &text[merged.range.clone()];
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return None;
                }
                let start = merged.range.start + (raw.len() - raw.trim_start().len());

                // Cite where the chunk's own text begins, past any carried overlap.
                let own = merged.own_start.max(start);
                let cite_at = text[own..merged.range.end]
                    .find(|c: char| !c.is_whitespace())
                    .map_or(start, |i| own + i);
                Some((cite_at, trimmed))
            })
            .enumerate()
            .map(|(index, (cite_at, body))| {
                Chunk::new(document_id, index, body, extracted.citation_at(cite_at))
            })
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Break `text` (found at byte `base` of the full text) into pieces of at
/// most `chunk_size` characters, appending their absolute byte ranges.
fn split_recursive(
    text: &str,
    base: usize,
    separators: &[&str],
    chunk_size: usize,
    out: &mut Vec<Range<usize>>,
) {
    if text.is_empty() {
        return;
    }
    if char_len(text) <= chunk_size {
        out.push(base..base + text.len());
        return;
    }

    let Some((&separator, remaining)) = separators.split_first() else {
        out.push(base..base + text.len());
        return;
    };

    if separator.is_empty() {
        out.extend(text.char_indices().map(|(i, c)| base + i..base + i + c.len_utf8()));
        return;
    }
    if !text.contains(separator) {
        split_recursive(text, base, remaining, chunk_size, out);
        return;
    }

    for piece in split_keeping_separator(text, separator) {
        let start = base + piece.start;
        let segment = &text[piece];
        if char_len(segment) <= chunk_size {
            out.push(start..start + segment.len());
        } else {
            split_recursive(segment, start, remaining, chunk_size, out);
        }
    }
}

/// Split at each occurrence of `separator`, attaching the separator to the
/// start of the following segment. Empty segments are skipped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    let mut segments = Vec::new();
    let mut start = 0;

    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            segments.push(start..pos);
        }
        start = pos;
    }
    if start < text.len() {
        segments.push(start..text.len());
    }

    segments
}

/// A contiguous run of text held in the merge window.
#[derive(Debug, Clone)]
struct Span {
    range: Range<usize>,
    chars: usize,
}

/// A merged chunk before trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MergedChunk {
    range: Range<usize>,
    /// Where the first piece not carried over from the previous chunk starts.
    own_start: usize,
}

impl MergedChunk {
    /// The chunk held in `window`, whose first `carried` spans are overlap.
    fn from_window(window: &VecDeque<Span>, carried: usize) -> Option<Self> {
        let first = window.front()?;
        let last = window.back()?;
        let own = window.get(carried).unwrap_or(first);
        Some(Self { range: first.range.start..last.range.end, own_start: own.range.start })
    }
}

/// Greedily merge consecutive pieces into chunks of at most `chunk_size`
/// characters, carrying up to `chunk_overlap` trailing characters into each
/// following chunk.
fn merge_pieces(
    text: &str,
    pieces: Vec<Range<usize>>,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<MergedChunk> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<Span> = VecDeque::new();
    let mut total = 0;
    // Leading spans of `window` carried over from the previous chunk.
    let mut carried = 0;

    for range in pieces {
        let chars = char_len(&text[range.clone()]);

        if total + chars > chunk_size {
            if let Some(last) = window.back().cloned() {
                chunks.extend(MergedChunk::from_window(&window, carried));

                while total > chunk_overlap || (total > 0 && total + chars > chunk_size) {
                    let Some(dropped) = window.pop_front() else { break };
                    total -= dropped.chars;
                }

                // No whole piece fits in the overlap; carry a tail of the
                // last piece instead.
                if window.is_empty() {
                    let budget = chunk_overlap.min(chunk_size.saturating_sub(chars));
                    if let Some(seed) = tail_span(text, &last.range, budget) {
                        total += seed.chars;
                        window.push_back(seed);
                    }
                }
                carried = window.len();
            }
        }

        window.push_back(Span { range, chars });
        total += chars;
    }

    chunks.extend(MergedChunk::from_window(&window, carried));
    chunks
}

/// The last at most `budget` characters of `range`, starting at a word
/// boundary when the range contains whitespace.
fn tail_span(text: &str, range: &Range<usize>, budget: usize) -> Option<Span> {
    if budget == 0 {
        return None;
    }

    let segment = &text[range.clone()];
    let mut start = segment.char_indices().rev().nth(budget - 1).map_or(0, |(i, _)| i);

    let cut_mid_word = segment[..start].chars().next_back().is_some_and(|c| !c.is_whitespace());
    if cut_mid_word {
        if let Some((offset, ws)) =
            segment[start..].char_indices().find(|(_, c)| c.is_whitespace())
        {
            start += offset + ws.len_utf8();
        }
    }

    let tail = segment[start..].trim_start();
    if tail.trim_end().is_empty() {
        return None;
    }

    let tail_start = range.end - tail.len();
    Some(Span { range: tail_start..range.end, chars: char_len(tail) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_attaches_to_following_segment() {
        let text = "a\n\nb\n\nc";
        let segments: Vec<&str> =
            split_keeping_separator(text, "\n\n").into_iter().map(|r| &text[r]).collect();
        assert_eq!(segments, vec!["a", "\n\nb", "\n\nc"]);
    }

    #[test]
    fn leading_separator_produces_no_empty_segment() {
        let text = "\n\nabc";
        let segments: Vec<&str> =
            split_keeping_separator(text, "\n\n").into_iter().map(|r| &text[r]).collect();
        assert_eq!(segments, vec!["\n\nabc"]);
    }

    #[test]
    fn pieces_reassemble_the_input() {
        let text = "First paragraph here.\n\nSecond one is a bit longer. It has two sentences.\nA line.";
        let mut pieces = Vec::new();
        split_recursive(text, 0, &SEPARATORS, 20, &mut pieces);

        let rebuilt: String = pieces.iter().map(|r| &text[r.clone()]).collect();
        assert_eq!(rebuilt, text);
        assert!(pieces.iter().all(|r| char_len(&text[r.clone()]) <= 20));
    }

    #[test]
    fn tail_span_starts_after_whitespace() {
        let text = "alpha beta gamma";
        let span = tail_span(text, &(0..text.len()), 8).unwrap();
        assert_eq!(&text[span.range], "gamma");
    }

    #[test]
    fn tail_span_without_whitespace_cuts_at_character() {
        let text = "abcdefgh";
        let span = tail_span(text, &(0..text.len()), 3).unwrap();
        assert_eq!(&text[span.range], "fgh");
    }

    #[test]
    fn tail_span_respects_multibyte_characters() {
        let text = "ééééé";
        let span = tail_span(text, &(0..text.len()), 2).unwrap();
        assert_eq!(&text[span.range.clone()], "éé");
        assert_eq!(span.chars, 2);
    }

    #[test]
    fn own_start_skips_carried_overlap() {
        let text = "aaaa bbbb\n\ncccc dddd";
        let chunker = RecursiveChunker::new(16, 5).unwrap();
        let merged = chunker.chunk_ranges(text);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].own_start, 0);
        assert_eq!(&text[merged[1].range.clone()], "bbbb\n\ncccc dddd");
        assert_eq!(&text[merged[1].own_start..merged[1].range.end], "\n\ncccc dddd");
    }

    #[test]
    fn zero_overlap_carries_nothing() {
        let chunker = RecursiveChunker::new(10, 0).unwrap();
        let chunks = chunker.split("d", "aaaa bbbb cccc dddd");
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(joined, "aaaa bbbb cccc dddd");
    }
}
