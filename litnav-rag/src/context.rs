//! Citation-tagged context rendering.
//!
//! The tag layout `[paper_id, year, p.page, section]` is also what the
//! generation prompt tells the model to cite with, so the two must agree.

use crate::document::Chunk;

/// Separator between rendered chunks.
const ENTRY_SEPARATOR: &str = "\n\n";

/// The citation tag for one chunk, e.g. `[10.1000/xyz, 2021, p.3, Methods]`.
pub fn citation_tag(chunk: &Chunk) -> String {
    let meta = &chunk.metadata;
    format!(
        "[{}, {}, p.{}, {}]",
        meta.paper_id_or_unknown(),
        meta.year_or_unknown(),
        meta.page_or_unknown(),
        meta.section_or_unknown()
    )
}

/// Render chunks as tagged entries separated by blank lines, in input order.
///
/// An empty slice renders as the empty string.
pub fn format_context<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a Chunk>,
{
    chunks
        .into_iter()
        .map(|chunk| format!("{} {}", citation_tag(chunk), chunk.text))
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR)
}
