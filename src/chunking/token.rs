//! Token-window splitting.
//!
//! Tokens are runs of word characters or single punctuation marks. Windows
//! of `size` tokens advance by `size - overlap`; each chunk is the original
//! text from its first token to its last, whitespace preserved.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+|[^\w\s]").unwrap());

/// Byte spans of every token in `text`.
pub fn token_spans(text: &str) -> Vec<(usize, usize)> {
    RE_TOKEN
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect()
}

pub fn count_tokens(text: &str) -> usize {
    RE_TOKEN.find_iter(text).count()
}

pub fn split_tokens(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let spans = token_spans(text);
    if spans.is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(spans.len());
        chunks.push(text[spans[start].0..spans[end - 1].1].to_string());
        if end == spans.len() {
            break;
        }
        start += step;
    }
    chunks
}
