//! Slide specifications: the per-item payload of the enrichment pipeline.
//!
//! The wire shape uses PascalCase keys because that is what the content
//! analysis collaborator is asked to produce:
//!
//! ```json
//! {"SlideNumber": 1, "Title": "Overview", "Content": ["..."],
//!  "HasData": false, "Data": "", "NeedsImage": true, "ImageKeywords": "solar panel"}
//! ```

use crate::classify::{leading_sentences, ClassifiedChunk, ContentType};
use crate::document::structure::is_likely_header;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const MAX_CONTENT_POINTS: usize = 5;
const MAX_IMAGE_KEYWORDS: usize = 5;
const MAX_TITLE_CHARS: usize = 80;

/// Words too common to make useful image search terms.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "have", "has",
    "see", "shows", "show", "figure", "chart", "diagram", "của", "và", "các", "những", "trong",
    "hình", "biểu", "cho", "thấy", "được", "là",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SlideSpec {
    /// 1-based.
    pub slide_number: usize,
    pub title: String,
    pub content: Vec<String>,
    #[serde(default)]
    pub has_data: bool,
    /// Non-string data from a collaborator is kept as its JSON text.
    #[serde(default, deserialize_with = "lenient_text")]
    pub data: String,
    #[serde(default)]
    pub needs_image: bool,
    /// An array of keywords is joined with `, `.
    #[serde(default, deserialize_with = "lenient_keywords")]
    pub image_keywords: String,
}

fn lenient_text<'de, D: serde::Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_keywords<'de, D: serde::Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl SlideSpec {
    /// Build a slide from a classified chunk. `ordinal` is 0-based.
    pub fn from_classified(ordinal: usize, chunk: &ClassifiedChunk) -> Self {
        let text = chunk.chunk.text.trim();

        let title = text
            .lines()
            .map(str::trim)
            .find(|line| is_likely_header(line))
            .map(|line| truncate_chars(line.trim_start_matches('#').trim(), MAX_TITLE_CHARS))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| chunk.layout_hint.title_suggestion.clone());

        let content = if chunk.key_points.is_empty() {
            leading_sentences(text, MAX_CONTENT_POINTS)
        } else {
            chunk.key_points.clone()
        };

        let has_data = chunk.content_type == ContentType::Table;
        let needs_image = chunk.content_type == ContentType::FigureReference;

        Self {
            slide_number: ordinal + 1,
            title,
            content,
            has_data,
            data: if has_data { text.to_string() } else { String::new() },
            needs_image,
            image_keywords: if needs_image {
                image_keywords(text)
            } else {
                String::new()
            },
        }
    }

    /// Parse a collaborator's slide list.
    ///
    /// Accepts a JSON array, or an object wrapping one under `slides`.
    /// Entries missing `SlideNumber`, `Title` or `Content` are dropped with a
    /// warning; optional fields default.
    pub fn parse_many(value: &Value) -> Vec<SlideSpec> {
        let entries = match value {
            Value::Array(items) => items.as_slice(),
            Value::Object(map) => match map.get("slides").or_else(|| map.get("Slides")) {
                Some(Value::Array(items)) => items.as_slice(),
                _ => std::slice::from_ref(value),
            },
            _ => return Vec::new(),
        };

        entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| match serde_json::from_value::<SlideSpec>(entry.clone()) {
                Ok(spec) => Some(spec),
                Err(e) => {
                    warn!("Dropping slide entry {}: {}", i, e);
                    None
                }
            })
            .collect()
    }

    /// Title plus bullet points, as plain text.
    pub fn outline(&self) -> String {
        let mut out = self.title.clone();
        for point in &self.content {
            out.push_str("\n- ");
            out.push_str(point);
        }
        out
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Distinct content words, longest first, joined by spaces.
fn image_keywords(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3 && !w.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
    {
        if !STOPWORDS.contains(&word.as_str()) && !words.contains(&word) {
            words.push(word);
        }
    }
    words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    words.truncate(MAX_IMAGE_KEYWORDS);
    words.join(" ")
}
