//! Hybrid splitting: structure first, recursive for what is left too big.
//!
//! Paragraphs (blank-line separated) accumulate until a header paragraph
//! arrives, which closes the running segment and opens the next one.
//! Segments within `size` are emitted as they are.

use super::recursive::RecursiveSplitter;
use crate::document::structure::is_likely_header;

/// Header-led groups of paragraphs, before any size limit.
pub fn structural_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let first_line = paragraph.lines().next().unwrap_or_default();
        if is_likely_header(first_line) && !buffer.is_empty() {
            segments.push(buffer.join("\n\n"));
            buffer.clear();
        }
        buffer.push(paragraph);
    }
    if !buffer.is_empty() {
        segments.push(buffer.join("\n\n"));
    }
    segments
}

pub fn split_hybrid(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let splitter = RecursiveSplitter::new(size, overlap);
    structural_segments(text)
        .into_iter()
        .flat_map(|segment| {
            if segment.chars().count() > size {
                splitter.split(&segment)
            } else {
                vec![segment]
            }
        })
        .collect()
}
