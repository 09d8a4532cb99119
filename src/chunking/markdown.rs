//! Markdown-aware splitting: structural boundaries before the generic ones.
//!
//! Structural separators stay attached to the piece they introduce, so a
//! chunk keeps its `## Heading` line or list bullet.

use super::recursive::{RecursiveSplitter, Separator, RECURSIVE_SEPARATORS};

pub const MARKDOWN_SEPARATORS: &[Separator] = &[
    Separator::leading("\n# "),
    Separator::leading("\n## "),
    Separator::leading("\n### "),
    Separator::leading("\n#### "),
    Separator::leading("\n##### "),
    Separator::leading("\n###### "),
    Separator::leading("```\n"),
    Separator::leading("\n***\n"),
    Separator::leading("\n---\n"),
    Separator::leading("\n___\n"),
    Separator::leading("\n- "),
    Separator::leading("\n* "),
    Separator::leading("\n+ "),
];

pub fn markdown_splitter(size: usize, overlap: usize) -> RecursiveSplitter {
    let separators = MARKDOWN_SEPARATORS
        .iter()
        .chain(RECURSIVE_SEPARATORS)
        .copied()
        .collect();
    RecursiveSplitter::with_separators(size, overlap, separators)
}

pub fn split_markdown(text: &str, size: usize, overlap: usize) -> Vec<String> {
    markdown_splitter(size, overlap).split(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn without_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Heading, bullet or prose line.
    fn markdown_line() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["# ", "## ", "- ", "* ", ""]),
            prop::collection::vec("[a-zA-Z]{1,10}[.,]?", 1..12),
        )
            .prop_map(|(marker, words)| format!("{marker}{}", words.join(" ")))
    }

    #[test]
    fn splits_on_top_level_headings() {
        let text = "# Intro\nSome opening words here.\n# Methods\nHow the work was done.";
        let chunks = split_markdown(text, 40, 0);
        assert_eq!(
            chunks,
            vec!["# Intro\nSome opening words here.", "# Methods\nHow the work was done."]
        );
    }

    #[test]
    fn small_document_stays_whole() {
        let text = "## Title\n- one\n- two";
        assert_eq!(split_markdown(text, 200, 20), vec![text]);
    }

    #[test]
    fn list_items_keep_their_bullets() {
        let text = "Shopping list\n- apples and pears\n- bread and butter\n- milk and cheese";
        let chunks = split_markdown(text, 36, 0);
        assert!(chunks.len() >= 2);
        assert!(chunks[1..].iter().all(|c| c.starts_with("- ")), "{chunks:?}");
    }

    #[test]
    fn sentence_endings_survive_markdown_split() {
        let text = "# Results\nCosts fell by ten percent. Revenue grew.\n## Notes\nSee the appendix!";
        let chunks = split_markdown(text, 30, 0);
        assert!(chunks.iter().any(|c| c.ends_with("Revenue grew.")), "{chunks:?}");
        assert!(chunks.last().is_some_and(|c| c.ends_with("appendix!")), "{chunks:?}");
    }

    proptest! {
        #[test]
        fn long_markdown_yields_bounded_chunks(
            lines in prop::collection::vec(markdown_line(), 10..60),
            size in 20usize..120,
        ) {
            let text = lines.join("\n");
            prop_assume!(text.chars().count() > size);
            let chunks = split_markdown(&text, size, size / 5);
            prop_assert!(chunks.len() >= 2);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= size + 1);
            }
        }

        #[test]
        fn markdown_chunks_without_overlap_cover_the_text(
            lines in prop::collection::vec(markdown_line(), 1..40),
            size in 10usize..120,
        ) {
            let text = lines.join("\n");
            let chunks = split_markdown(&text, size, 0);
            prop_assert_eq!(without_whitespace(&chunks.concat()), without_whitespace(&text));
        }
    }
}
