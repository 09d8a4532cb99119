//! Chunk classification: content type, key points and a layout hint.
//!
//! Rules are applied in a fixed order and the first match wins:
//!
//! 1. more than 5 `|` characters                → table
//! 2. more than 2 bullet lines (`-`, `•`, `*`)  → list
//! 3. figure or chart vocabulary                → figure reference
//! 4. more than 10 lines                        → long text
//! 5. otherwise                                 → paragraph
//!
//! Vocabulary lists cover English and Vietnamese.

use crate::chunking::Chunk;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_KEY_POINTS: usize = 5;
const FIGURE_WORDS: &[&str] = &["hình", "biểu đồ", "figure", "chart", "diagram"];
const IMPORTANCE_CUES: &[&str] = &[
    "quan trọng",
    "chính",
    "cần",
    "phải",
    "important",
    "key",
    "main",
    "essential",
];
const ORDINAL_OPENERS: &[&str] = &[
    "Đầu tiên",
    "Thứ hai",
    "Cuối cùng",
    "First",
    "Second",
    "Finally",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Table,
    List,
    FigureReference,
    LongText,
    Paragraph,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentType::Table => "table",
            ContentType::List => "list",
            ContentType::FigureReference => "figure_reference",
            ContentType::LongText => "long_text",
            ContentType::Paragraph => "paragraph",
        };
        f.write_str(s)
    }
}

/// Suggested slide shape for a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutHint {
    pub slide_type: String,
    pub layout: String,
    pub title_suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl LayoutHint {
    fn new(slide_type: &str, layout: &str, title: &str) -> Self {
        Self {
            slide_type: slide_type.to_string(),
            layout: layout.to_string(),
            title_suggestion: title.to_string(),
            suggestion: None,
        }
    }

    pub fn for_content(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Table => Self::new("data_slide", "table", "Data and Statistics"),
            ContentType::List => Self::new("bullet_slide", "bullet_points", "Key Points"),
            ContentType::LongText => Self {
                suggestion: Some("Split across several slides".to_string()),
                ..Self::new("content_slide", "text_heavy", "Detailed Content")
            },
            ContentType::FigureReference | ContentType::Paragraph => {
                Self::new("standard_slide", "title_content", "Overview")
            }
        }
    }
}

/// A chunk with everything the slide planner needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub content_type: ContentType,
    pub key_points: Vec<String>,
    pub layout_hint: LayoutHint,
    /// Always at least 1.
    pub estimated_items: usize,
    pub word_count: usize,
}

pub fn classify(chunk: Chunk) -> ClassifiedChunk {
    let content = chunk.text.trim();
    let content_type = content_type(content);
    let key_points = key_points(content);
    let estimated_items = (key_points.len() / 3).max(1);
    let word_count = content.split_whitespace().count();

    ClassifiedChunk {
        content_type,
        layout_hint: LayoutHint::for_content(content_type),
        key_points,
        estimated_items,
        word_count,
        chunk,
    }
}

pub fn classify_all(chunks: Vec<Chunk>) -> Vec<ClassifiedChunk> {
    chunks.into_iter().map(classify).collect()
}

pub fn content_type(content: &str) -> ContentType {
    if content.matches('|').count() > 5 {
        return ContentType::Table;
    }

    let bullet_lines = content
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            line.starts_with('-') || line.starts_with('•') || line.starts_with('*')
        })
        .count();
    if bullet_lines > 2 {
        return ContentType::List;
    }

    let lower = content.to_lowercase();
    if FIGURE_WORDS.iter().any(|w| lower.contains(w)) {
        return ContentType::FigureReference;
    }
    if content.split('\n').count() > 10 {
        return ContentType::LongText;
    }
    ContentType::Paragraph
}

/// Sentences between 20 and 199 characters that carry an importance cue or
/// open with an ordinal. At most five, in document order.
pub fn key_points(content: &str) -> Vec<String> {
    content
        .replace('\n', " ")
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| (20..200).contains(&s.chars().count()))
        .filter(|s| importance(s) > 0 || ORDINAL_OPENERS.iter().any(|o| s.starts_with(o)))
        .take(MAX_KEY_POINTS)
        .map(str::to_string)
        .collect()
}

fn importance(sentence: &str) -> usize {
    let lower = sentence.to_lowercase();
    IMPORTANCE_CUES.iter().filter(|cue| lower.contains(*cue)).count()
}

/// Sentences of at least 20 characters, used when a chunk has no key points.
pub(crate) fn leading_sentences(content: &str, limit: usize) -> Vec<String> {
    content
        .replace('\n', " ")
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() >= 20)
        .take(limit)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkMetadata, ChunkStrategy};

    fn chunk(text: &str) -> Chunk {
        Chunk::new(
            0,
            text.to_string(),
            ChunkMetadata {
                page_index: 0,
                page_number: 1,
                source: "test.pdf".into(),
                strategy: ChunkStrategy::Recursive,
            },
        )
    }

    #[test]
    fn pipe_block_is_table() {
        let text = "| a | b | c |\n| 1 | 2 | 3 |\n| 4 | 5 | 6 |";
        assert_eq!(content_type(text), ContentType::Table);
    }

    #[test]
    fn bullets_are_list() {
        let text = "Items:\n- one\n- two\n- three\n- four";
        assert_eq!(content_type(text), ContentType::List);
        assert_eq!(content_type("• a\n• b\n• c"), ContentType::List);
        assert_eq!(content_type("- a\n- b"), ContentType::Paragraph);
    }

    #[test]
    fn figure_vocabulary() {
        assert_eq!(content_type("See Figure 3 for the trend."), ContentType::FigureReference);
        assert_eq!(content_type("Biểu đồ cho thấy doanh thu."), ContentType::FigureReference);
    }

    #[test]
    fn many_lines_are_long_text() {
        let text = (0..12)
            .map(|i| format!("Plain sentence number {i} of the body"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(content_type(&text), ContentType::LongText);
        let hint = LayoutHint::for_content(ContentType::LongText);
        assert_eq!(hint.layout, "text_heavy");
        assert!(hint.suggestion.is_some());
    }

    #[test]
    fn table_rule_wins_over_list() {
        let text = "- | a | b |\n- | c | d |\n- | e | f |";
        assert_eq!(content_type(text), ContentType::Table);
    }

    #[test]
    fn key_points_need_cue_or_opener() {
        let text = "This is an important finding about costs. \
                    Short one. \
                    The weather was pleasant all week long. \
                    First we collected every sample available. \
                    Đây là điểm quan trọng nhất của báo cáo.";
        assert_eq!(
            key_points(text),
            vec![
                "This is an important finding about costs",
                "First we collected every sample available",
                "Đây là điểm quan trọng nhất của báo cáo",
            ]
        );
    }

    #[test]
    fn key_points_capped_at_five() {
        let text = (0..8)
            .map(|i| format!("Key observation number {i} matters"))
            .collect::<Vec<_>>()
            .join(". ");
        let points = key_points(&text);
        assert_eq!(points.len(), 5);
        assert!(points[0].ends_with("0 matters"));
    }

    #[test]
    fn estimated_items_at_least_one() {
        let classified = classify(chunk("Nothing notable here."));
        assert_eq!(classified.estimated_items, 1);
        assert_eq!(classified.word_count, 3);
        assert_eq!(classified.layout_hint.slide_type, "standard_slide");

        let text = (0..6)
            .map(|i| format!("The main point {i} is explained here"))
            .collect::<Vec<_>>()
            .join(". ");
        assert_eq!(classify(chunk(&text)).estimated_items, 1);
    }

    #[test]
    fn serialises_flat() {
        let json = serde_json::to_value(classify(chunk("- a\n- b\n- c"))).unwrap();
        assert_eq!(json["content_type"], "list");
        assert_eq!(json["text"], "- a\n- b\n- c");
        assert_eq!(json["layout_hint"]["layout"], "bullet_points");
    }
}
