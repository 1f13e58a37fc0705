//! TEI XML to [`ExtractedText`].
//!
//! Reads the TEI documents produced by GROBID-style extractors: the header
//! title, publication year and DOI, the abstract paragraphs, and each body
//! `div` with its `head`. Page breaks (`pb`) are recorded as offsets into
//! the resulting text. Figures, notes and back matter are skipped.
//!
//! The text layout is:
//!
//! ```text
//! Title: {title}
//!
//! Abstract:
//! {abstract paragraphs, one per line}
//!
//! {section heading}
//! {paragraph}
//!
//! {paragraph}
//! ```

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::document::{ExtractedText, PageBreak, SectionSpan};
use crate::error::{RagError, Result};

const TITLE_SECTION: &str = "Title";
const ABSTRACT_SECTION: &str = "Abstract";
const UNTITLED_SECTION: &str = "Body";

/// Parse a TEI document.
///
/// # Errors
///
/// Returns an extraction error if the XML is malformed.
pub fn parse_tei(xml: &str) -> Result<ExtractedText> {
    let mut reader = Reader::from_str(xml);
    let mut parser = TeiParser::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                parser.start(&e);
                parser.stack.push(local_name(&e));
            }
            Ok(Event::Empty(e)) => parser.empty(&e),
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                parser.stack.pop();
                parser.end(&name);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| RagError::extraction(format!("malformed TEI text: {e}")))?;
                parser.text(&text);
            }
            Ok(Event::CData(c)) => parser.text(&String::from_utf8_lossy(&c)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(RagError::extraction(format!("malformed TEI: {e}"))),
        }
    }

    Ok(parser.finish())
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Title,
    Doi,
    Head,
    Paragraph,
}

#[derive(Debug, Default)]
struct Paragraph {
    raw: String,
    /// Page numbers starting at a byte offset of `raw`.
    pages: Vec<(usize, String)>,
}

#[derive(Debug, Default)]
struct Section {
    heading: Option<String>,
    paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Default)]
struct TeiParser {
    stack: Vec<String>,
    capture: Option<Capture>,
    buffer: String,
    paragraph: Paragraph,
    pending_pages: Vec<String>,
    skip_depth: usize,

    title: Option<String>,
    year: Option<String>,
    doi: Option<String>,
    abstract_paragraphs: Vec<String>,
    sections: Vec<Section>,
}

impl TeiParser {
    fn within(&self, name: &str) -> bool {
        self.stack.iter().any(|n| n == name)
    }

    fn parent_is(&self, name: &str) -> bool {
        self.stack.last().is_some_and(|n| n == name)
    }

    fn in_body(&self) -> bool {
        self.within("body") && self.skip_depth == 0
    }

    fn start(&mut self, e: &BytesStart<'_>) {
        let name = local_name(e);
        let in_header = self.within("teiHeader");

        match name.as_str() {
            "figure" | "note" if self.within("body") => self.skip_depth += 1,
            "title" if in_header && self.parent_is("titleStmt") && self.title.is_none() => {
                self.begin(Capture::Title);
            }
            "idno" if in_header && self.doi.is_none() => {
                if attribute(e, "type").is_some_and(|t| t.eq_ignore_ascii_case("doi")) {
                    self.begin(Capture::Doi);
                }
            }
            "date" if in_header => self.record_year(e),
            "div" if self.in_body() && self.capture.is_none() => {
                self.sections.push(Section::default());
            }
            "head" if self.in_body() && self.parent_is("div") => self.begin(Capture::Head),
            "p" if self.within("abstract") || self.in_body() => {
                self.begin(Capture::Paragraph);
                self.paragraph = Paragraph {
                    raw: String::new(),
                    pages: self.pending_pages.drain(..).map(|page| (0, page)).collect(),
                };
            }
            "pb" => self.page_break(e),
            _ => {}
        }
    }

    fn empty(&mut self, e: &BytesStart<'_>) {
        match local_name(e).as_str() {
            "date" if self.within("teiHeader") => self.record_year(e),
            "pb" => self.page_break(e),
            _ => {}
        }
    }

    fn end(&mut self, name: &str) {
        match name {
            "figure" | "note" if self.skip_depth > 0 => self.skip_depth -= 1,
            "title" if self.capture == Some(Capture::Title) => {
                self.title = self.take_buffer();
            }
            "idno" if self.capture == Some(Capture::Doi) => {
                self.doi = self.take_buffer();
            }
            "head" if self.capture == Some(Capture::Head) => {
                let heading = self.take_buffer();
                if self.sections.is_empty() {
                    self.sections.push(Section::default());
                }
                if let Some(section) = self.sections.last_mut() {
                    section.heading = heading;
                }
            }
            "p" if self.capture == Some(Capture::Paragraph) => self.finish_paragraph(),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 {
            return;
        }
        match self.capture {
            Some(Capture::Paragraph) => self.paragraph.raw.push_str(text),
            Some(_) => self.buffer.push_str(text),
            None => {}
        }
    }

    fn begin(&mut self, capture: Capture) {
        self.capture = Some(capture);
        self.buffer.clear();
    }

    fn take_buffer(&mut self) -> Option<String> {
        self.capture = None;
        let (text, _) = normalize_whitespace(&std::mem::take(&mut self.buffer), &[]);
        (!text.is_empty()).then_some(text)
    }

    fn record_year(&mut self, e: &BytesStart<'_>) {
        if self.year.is_some() {
            return;
        }
        if let Some(when) = attribute(e, "when") {
            let year: String = when.chars().take(4).collect();
            if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
                self.year = Some(year);
            }
        }
    }

    fn page_break(&mut self, e: &BytesStart<'_>) {
        if !self.within("text") {
            return;
        }
        let Some(page) = attribute(e, "n") else { return };
        if self.capture == Some(Capture::Paragraph) {
            self.paragraph.pages.push((self.paragraph.raw.len(), page));
        } else {
            self.pending_pages.push(page);
        }
    }

    fn finish_paragraph(&mut self) {
        self.capture = None;
        let paragraph = std::mem::take(&mut self.paragraph);

        if self.within("abstract") {
            let (text, _) = normalize_whitespace(&paragraph.raw, &[]);
            if !text.is_empty() {
                self.abstract_paragraphs.push(text);
            }
            return;
        }

        if self.sections.is_empty() {
            self.sections.push(Section::default());
        }
        if let Some(section) = self.sections.last_mut() {
            section.paragraphs.push(paragraph);
        }
    }

    fn finish(self) -> ExtractedText {
        let mut out = TextBuilder::default();

        if let Some(title) = &self.title {
            let start = out.begin_block();
            out.text.push_str("Title: ");
            out.text.push_str(title);
            out.close_section(TITLE_SECTION, start);
        }

        if !self.abstract_paragraphs.is_empty() {
            let start = out.begin_block();
            out.text.push_str("Abstract:\n");
            out.text.push_str(&self.abstract_paragraphs.join("\n"));
            out.close_section(ABSTRACT_SECTION, start);
        }

        for section in &self.sections {
            let paragraphs: Vec<(String, Vec<(usize, String)>)> = section
                .paragraphs
                .iter()
                .map(|p| normalize_whitespace(&p.raw, &p.pages))
                .filter(|(text, _)| !text.is_empty())
                .collect();
            if paragraphs.is_empty() {
                continue;
            }

            let start = out.begin_block();
            if let Some(heading) = &section.heading {
                out.text.push_str(heading);
                out.text.push('\n');
            }
            for (i, (text, pages)) in paragraphs.iter().enumerate() {
                if i > 0 {
                    out.text.push_str("\n\n");
                }
                let base = out.text.len();
                out.pages.extend(
                    pages.iter().map(|(offset, page)| PageBreak { offset: base + offset, page: page.clone() }),
                );
                out.text.push_str(text);
            }
            let name = section.heading.as_deref().unwrap_or(UNTITLED_SECTION);
            out.close_section(name, start);
        }

        // Anything before the first recorded break sits on page 1.
        if out.pages.first().is_some_and(|p| p.offset > 0 && p.page != "1") {
            out.pages.insert(0, PageBreak { offset: 0, page: "1".to_string() });
        }

        ExtractedText {
            text: out.text,
            title: self.title,
            year: self.year,
            paper_id: self.doi,
            sections: out.sections,
            pages: out.pages,
        }
    }
}

#[derive(Debug, Default)]
struct TextBuilder {
    text: String,
    sections: Vec<SectionSpan>,
    pages: Vec<PageBreak>,
}

impl TextBuilder {
    /// Separate from the previous block and return the new block's start.
    fn begin_block(&mut self) -> usize {
        if !self.text.is_empty() {
            self.text.push_str("\n\n");
        }
        self.text.len()
    }

    fn close_section(&mut self, name: &str, start: usize) {
        self.sections.push(SectionSpan { name: name.to_string(), start, end: self.text.len() });
    }
}

/// Collapse whitespace runs to single spaces and trim, carrying page marks
/// (byte offsets into `raw`) over to offsets into the result.
fn normalize_whitespace(raw: &str, marks: &[(usize, String)]) -> (String, Vec<(usize, String)>) {
    let mut out = String::with_capacity(raw.len());
    let mut mapped = Vec::with_capacity(marks.len());
    let mut marks = marks.iter().peekable();
    let mut pending_space = false;

    for (i, c) in raw.char_indices() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        while let Some((_, page)) = marks.next_if(|(offset, _)| *offset <= i) {
            mapped.push((out.len() + usize::from(pending_space), page.clone()));
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    mapped.extend(marks.map(|(_, page)| (out.len(), page.clone())));

    (out, mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_maps_marks() {
        let (text, marks) = normalize_whitespace("  one \n two   three ", &[(8, "2".into())]);
        assert_eq!(text, "one two three");
        assert_eq!(marks, vec![(4, "2".to_string())]);
        assert_eq!(&text[4..], "two three");
    }

    #[test]
    fn trailing_mark_lands_at_end() {
        let (text, marks) = normalize_whitespace("abc ", &[(4, "9".into())]);
        assert_eq!(marks, vec![(text.len(), "9".to_string())]);
    }
}
