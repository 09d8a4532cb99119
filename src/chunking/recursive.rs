//! Recursive character splitting.
//!
//! Try separators in order and cut on the first one the text contains.
//! Pieces that fit are merged greedily into chunks of at most `size`
//! characters, with up to `overlap` trailing characters carried into the
//! next chunk. Oversized pieces recurse with the remaining separators.

use std::collections::VecDeque;
use tracing::warn;

/// Where a separator goes once the text is cut on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorMode {
    /// Removed from the pieces and re-inserted between them on merge.
    Drop,
    /// Stays at the start of the piece it introduces (headings, bullets).
    Leading,
    /// Stays at the end of the piece it closes (sentence punctuation).
    Trailing,
}

/// One split boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    pub pattern: &'static str,
    pub mode: SeparatorMode,
}

impl Separator {
    pub const fn drop(pattern: &'static str) -> Self {
        Self {
            pattern,
            mode: SeparatorMode::Drop,
        }
    }

    pub const fn leading(pattern: &'static str) -> Self {
        Self {
            pattern,
            mode: SeparatorMode::Leading,
        }
    }

    pub const fn trailing(pattern: &'static str) -> Self {
        Self {
            pattern,
            mode: SeparatorMode::Trailing,
        }
    }

    fn joiner(&self) -> &'static str {
        match self.mode {
            SeparatorMode::Drop => self.pattern,
            SeparatorMode::Leading | SeparatorMode::Trailing => "",
        }
    }
}

/// Paragraph, line, sentence end, clause, word, character.
pub const RECURSIVE_SEPARATORS: &[Separator] = &[
    Separator::drop("\n\n"),
    Separator::drop("\n"),
    Separator::trailing("."),
    Separator::trailing("!"),
    Separator::trailing("?"),
    Separator::trailing(","),
    Separator::drop(" "),
    Separator::drop(""),
];

/// Splitter over an arbitrary separator list.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    size: usize,
    overlap: usize,
    separators: Vec<Separator>,
}

impl RecursiveSplitter {
    pub fn new(size: usize, overlap: usize) -> Self {
        Self::with_separators(size, overlap, RECURSIVE_SEPARATORS.to_vec())
    }

    pub fn with_separators(size: usize, overlap: usize, separators: Vec<Separator>) -> Self {
        Self {
            size: size.max(1),
            overlap: overlap.min(size.saturating_sub(1)),
            separators,
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if trimmed.chars().count() <= self.size {
            return vec![trimmed.to_string()];
        }
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        let found = separators
            .iter()
            .position(|s| s.pattern.is_empty() || text.contains(s.pattern));
        let (separator, rest) = match found {
            Some(i) => (separators[i], &separators[i + 1..]),
            None => (Separator::drop(""), &separators[separators.len()..]),
        };

        let mut out = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in split_on(text, &separator) {
            if piece.chars().count() <= self.size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                out.extend(self.merge(&fitting, separator.joiner()));
                fitting.clear();
            }
            if rest.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            } else {
                out.extend(self.split_with(piece, rest));
            }
        }
        if !fitting.is_empty() {
            out.extend(self.merge(&fitting, separator.joiner()));
        }
        out
    }

    /// Greedy merge of pieces that each fit, carrying overlap forward.
    fn merge(&self, pieces: &[&str], joiner: &str) -> Vec<String> {
        let joiner_len = joiner.chars().count();
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = piece.chars().count();
            let gap = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { joiner_len };

            if total + len + gap(&current) > self.size {
                if total > self.size {
                    warn!(
                        "Created a chunk of {} chars, longer than the {} limit",
                        total, self.size
                    );
                }
                if !current.is_empty() {
                    push_joined(&mut chunks, &current, joiner);
                    while total > self.overlap
                        || (total > 0 && total + len + gap(&current) > self.size)
                    {
                        let joined_gap = if current.len() > 1 { joiner_len } else { 0 };
                        let Some(front) = current.pop_front() else {
                            break;
                        };
                        total = total.saturating_sub(front.chars().count() + joined_gap);
                    }
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { joiner_len } else { 0 };
        }
        push_joined(&mut chunks, &current, joiner);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, current: &VecDeque<&str>, joiner: &str) {
    let joined = current.iter().copied().collect::<Vec<_>>().join(joiner);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Cut `text` on `separator`, dropping empty pieces.
pub(crate) fn split_on<'t>(text: &'t str, separator: &Separator) -> Vec<&'t str> {
    if separator.pattern.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    match separator.mode {
        SeparatorMode::Drop => text
            .split(separator.pattern)
            .filter(|s| !s.is_empty())
            .collect(),
        SeparatorMode::Trailing => text
            .split_inclusive(separator.pattern)
            .filter(|s| !s.is_empty())
            .collect(),
        SeparatorMode::Leading => {
            let mut pieces = Vec::new();
            let mut start = 0;
            for (idx, _) in text.match_indices(separator.pattern) {
                if idx > start {
                    pieces.push(&text[start..idx]);
                }
                start = idx;
            }
            if start < text.len() {
                pieces.push(&text[start..]);
            }
            pieces
        }
    }
}

/// Split with the default separator list.
pub fn split_recursive(text: &str, size: usize, overlap: usize) -> Vec<String> {
    RecursiveSplitter::new(size, overlap).split(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_recursive("  hello world  ", 100, 10), vec!["hello world"]);
    }

    #[test]
    fn paragraphs_merge_up_to_size() {
        let text = "aaaa bbbb\n\ncccc dddd\n\neeee ffff";
        let chunks = split_recursive(text, 20, 0);
        assert_eq!(chunks, vec!["aaaa bbbb\n\ncccc dddd", "eeee ffff"]);
    }

    #[test]
    fn overlap_repeats_trailing_pieces() {
        let text = "one two three four five six seven eight";
        let chunks = split_recursive(text, 15, 5);
        assert!(chunks.len() > 2);
        // each boundary repeats the last word of the previous chunk
        for pair in chunks.windows(2) {
            let last_word = pair[0].rsplit(' ').next().unwrap();
            assert!(pair[1].starts_with(last_word), "{pair:?}");
        }
    }

    #[test]
    fn falls_through_to_characters() {
        let chunks = split_recursive("abcdefghij", 4, 0);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_text_counts_chars() {
        let text = "Chương một. Phần hai. Mục ba.";
        for chunk in split_recursive(text, 12, 0) {
            assert!(chunk.chars().count() <= 12, "{chunk}");
        }
    }

    #[test]
    fn leading_separator_stays_with_next_piece() {
        let sep = Separator::leading("\n# ");
        assert_eq!(
            split_on("intro\n# A\nbody\n# B", &sep),
            vec!["intro", "\n# A\nbody", "\n# B"]
        );
    }

    #[test]
    fn sentence_punctuation_is_kept() {
        assert_eq!(split_recursive("Third page text.", 30, 5), vec!["Third page text."]);
        assert_eq!(split_recursive("Is it done? Yes!", 100, 10), vec!["Is it done? Yes!"]);
        assert_eq!(
            split_recursive("First sentence here. Second sentence here. Third one.", 25, 0),
            vec!["First sentence here.", "Second sentence here.", "Third one."]
        );
    }

    #[test]
    fn trailing_separator_stays_with_previous_piece() {
        let sep = Separator::trailing(".");
        assert_eq!(split_on("One. Two. Three", &sep), vec!["One.", " Two.", " Three"]);
    }

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    proptest! {
        #[test]
        fn chunks_without_overlap_cover_the_text(
            words in prop::collection::vec("[a-zA-Z]{1,10}[.,!?]?", 1..150),
            breaks in prop::collection::vec(prop::sample::select(vec![" ", " ", " ", "\n", "\n\n"]), 150),
            size in 10usize..120,
        ) {
            let text: String = words
                .iter()
                .zip(breaks.iter())
                .map(|(w, b)| format!("{w}{b}"))
                .collect();
            let chunks = split_recursive(&text, size, 0);
            prop_assert_eq!(without_whitespace(&chunks.concat()), without_whitespace(&text));
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= size);
            }
        }


        #[test]
        fn long_text_yields_bounded_chunks(
            words in prop::collection::vec("[a-zA-Z]{1,12}", 40..200),
            size in 20usize..120,
        ) {
            let text = words.join(" ");
            prop_assume!(text.chars().count() > size);
            let chunks = split_recursive(&text, size, size / 5);
            prop_assert!(chunks.len() >= 2);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= size + 1);
            }
        }
    }
}
