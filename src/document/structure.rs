//! Structure analysis: font profiles and section candidates.
//!
//! Both passes read pages through [`PageSource`], so they work the same on
//! a live PDF and on pre-extracted pages.

use crate::document::{PageSource, Pages};
use crate::error::Pdf2SlidesError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

/// Characters kept in a profile's text sample.
pub const SAMPLE_CHARS: usize = 100;

/// Lines longer than this are never headers.
const MAX_HEADER_CHARS: usize = 200;

const SECTION_INTRODUCERS: &[&str] = &["chương", "bài", "phần", "mục", "chapter", "section"];

/// `1 Introduction`, `2. Kết quả`
static RE_NUMBERED_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.?\s+\p{Lu}").unwrap());

/// Identity of a font combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontKey {
    pub font_id: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl PartialEq for FontKey {
    fn eq(&self, other: &Self) -> bool {
        self.font_id == other.font_id
            && self.size.to_bits() == other.size.to_bits()
            && self.bold == other.bold
            && self.italic == other.italic
    }
}

impl Eq for FontKey {}

impl Hash for FontKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.font_id.hash(state);
        self.size.to_bits().hash(state);
        self.bold.hash(state);
        self.italic.hash(state);
    }
}

/// How often one font combination occurs, with a sample of its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontProfile {
    #[serde(flatten)]
    pub key: FontKey,
    pub count: usize,
    /// At most [`SAMPLE_CHARS`] characters.
    pub sample: String,
}

impl FontProfile {
    pub fn is_bold(&self) -> bool {
        self.key.bold
    }

    pub fn size(&self) -> f32 {
        self.key.size
    }
}

/// Scan the first `sample_pages` pages and count every font combination.
///
/// Result is ordered by descending count, ties broken by font id and size,
/// so the same pages always give the same list. Unreadable pages are skipped.
pub fn build_font_profiles(
    source: &dyn PageSource,
    sample_pages: usize,
) -> Result<Vec<FontProfile>, Pdf2SlidesError> {
    let mut profiles: HashMap<FontKey, FontProfile> = HashMap::new();

    for page in Pages::take_leading(source, sample_pages) {
        let page = match page {
            Ok(page) => page,
            Err(Pdf2SlidesError::PageUnreadable { page, detail }) => {
                warn!("Font scan skipping page {}: {}", page, detail);
                continue;
            }
            Err(e) => return Err(e),
        };
        for span in &page.spans {
            let key = FontKey {
                font_id: span.font_id.clone(),
                size: span.size,
                bold: span.bold,
                italic: span.italic,
            };
            let profile = profiles.entry(key.clone()).or_insert_with(|| FontProfile {
                key,
                count: 0,
                sample: String::new(),
            });
            profile.count += 1;
            extend_sample(&mut profile.sample, &span.text);
        }
    }

    let mut profiles: Vec<FontProfile> = profiles.into_values().collect();
    profiles.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.key.font_id.cmp(&b.key.font_id))
            .then_with(|| a.key.size.total_cmp(&b.key.size))
            .then_with(|| a.key.bold.cmp(&b.key.bold))
            .then_with(|| a.key.italic.cmp(&b.key.italic))
    });
    debug!("Built {} font profiles", profiles.len());
    Ok(profiles)
}

fn extend_sample(sample: &mut String, text: &str) {
    let used = sample.chars().count();
    if used >= SAMPLE_CHARS {
        return;
    }
    if used > 0 {
        sample.push(' ');
    }
    let room = SAMPLE_CHARS.saturating_sub(sample.chars().count());
    sample.extend(text.trim().chars().take(room));
}

/// The most frequent profile, taken to be body text.
pub fn body_profile(profiles: &[FontProfile]) -> Option<&FontProfile> {
    profiles.iter().max_by_key(|p| p.count)
}

/// Profiles that look like headings: bold, or larger than the body size.
pub fn heading_profiles(profiles: &[FontProfile]) -> Vec<&FontProfile> {
    let Some(body) = body_profile(profiles) else {
        return Vec::new();
    };
    profiles
        .iter()
        .filter(|p| p.key != body.key && (p.key.bold || p.key.size > body.key.size))
        .collect()
}

/// Where a section candidate came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionSource {
    /// Document outline entry; certain.
    Toc { level: u32 },
    /// Line heuristic with a confidence in `[0, 1]`.
    Inferred { confidence: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionCandidate {
    pub title: String,
    /// 1-based page number, when known.
    pub page: Option<usize>,
    #[serde(flatten)]
    pub source: SectionSource,
}

impl SectionCandidate {
    /// 1.0 for outline entries.
    pub fn confidence(&self) -> f32 {
        match self.source {
            SectionSource::Toc { .. } => 1.0,
            SectionSource::Inferred { confidence } => confidence,
        }
    }
}

/// Section candidates for the whole document.
///
/// The outline wins when it exists. Otherwise every line of every page is
/// tested with [`is_likely_header`]; this favours recall over precision.
pub fn infer_sections(source: &dyn PageSource) -> Result<Vec<SectionCandidate>, Pdf2SlidesError> {
    let toc = source.toc()?;
    if !toc.is_empty() {
        debug!("Using {} outline entries as sections", toc.len());
        return Ok(toc
            .into_iter()
            .map(|entry| SectionCandidate {
                title: entry.title,
                page: entry.page,
                source: SectionSource::Toc { level: entry.level },
            })
            .collect());
    }

    let mut sections = Vec::new();
    for page in Pages::new(source) {
        let page = match page {
            Ok(page) => page,
            Err(Pdf2SlidesError::PageUnreadable { page, detail }) => {
                warn!("Section scan skipping page {}: {}", page, detail);
                continue;
            }
            Err(e) => return Err(e),
        };
        let lines: Vec<&str> = page.text.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let title = line.trim();
            if !is_likely_header(title) {
                continue;
            }
            let previous = if i == 0 { None } else { Some(lines[i - 1]) };
            sections.push(SectionCandidate {
                title: title.to_string(),
                page: Some(page.page_number()),
                source: SectionSource::Inferred {
                    confidence: header_confidence(title, previous),
                },
            });
        }
    }
    debug!("Inferred {} section candidates", sections.len());
    Ok(sections)
}

/// At least one uppercase letter and no lowercase ones.
pub(crate) fn is_all_upper(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

/// Header heuristic for a single line.
pub fn is_likely_header(line: &str) -> bool {
    let line = line.trim();
    let len = line.chars().count();
    if len == 0 || len > MAX_HEADER_CHARS {
        return false;
    }

    let lower = line.to_lowercase();
    is_all_upper(line)
        || line.starts_with('#')
        || SECTION_INTRODUCERS.iter().any(|w| lower.starts_with(w))
        || (line.ends_with(':') && len < 100)
        || RE_NUMBERED_HEADING.is_match(line)
}

/// Confidence that `line` is a header. `previous` is the line before it,
/// `None` for the first line of a page.
pub fn header_confidence(line: &str, previous: Option<&str>) -> f32 {
    let line = line.trim();
    let len = line.chars().count();
    let mut score: f32 = 0.0;

    if (10..=100).contains(&len) {
        score += 0.3;
    }
    if previous.is_none_or(|p| p.trim().is_empty()) {
        score += 0.2;
    }
    if is_all_upper(line) {
        score += 0.3;
    }
    if line.ends_with(':') {
        score += 0.2;
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryDocument, PageContent, TocEntry, TypedSpan};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn header_rules() {
        assert!(is_likely_header("INTRODUCTION"));
        assert!(is_likely_header("# Overview"));
        assert!(is_likely_header("Chương 1 Tổng quan"));
        assert!(is_likely_header("chapter two"));
        assert!(is_likely_header("Key results:"));
        assert!(is_likely_header("3. Methods"));
        assert!(is_likely_header("12 Kết luận"));

        assert!(!is_likely_header(""));
        assert!(!is_likely_header("   "));
        assert!(!is_likely_header("an ordinary sentence in the body."));
        assert!(!is_likely_header("3 apples were eaten"));
        assert!(!is_likely_header(&"A".repeat(201)));
        assert!(!is_likely_header("1234"));
    }

    #[test]
    fn confidence_scores() {
        // 12 chars, first line, uppercase
        assert!(approx(header_confidence("INTRODUCTION", None), 0.8));
        // every rule fires, capped
        assert!(approx(header_confidence("MAIN RESULTS:", Some("")), 1.0));
        // short, mid-paragraph, mixed case
        assert!(approx(header_confidence("Notes", Some("previous text")), 0.0));
        assert!(approx(header_confidence("Summary of results:", Some("text")), 0.5));
    }

    #[test]
    fn toc_overrides_inference() {
        let doc = MemoryDocument::from_texts(["INTRODUCTION\nbody text here"]).with_toc(vec![
            TocEntry {
                level: 1,
                title: "Part One".into(),
                page: Some(1),
            },
            TocEntry {
                level: 2,
                title: "Details".into(),
                page: Some(3),
            },
        ]);
        let sections = infer_sections(&doc).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].source, SectionSource::Toc { level: 2 });
        assert!(approx(sections[0].confidence(), 1.0));
    }

    #[test]
    fn sections_inferred_from_lines() {
        let doc = MemoryDocument::from_texts([
            "INTRODUCTION\nThis document explains things in prose.",
            "Some text first\n\n2. Results\nwith trailing details",
        ]);
        let sections = infer_sections(&doc).unwrap();
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["INTRODUCTION", "2. Results"]);
        assert_eq!(sections[1].page, Some(2));
        assert!(approx(sections[1].confidence(), 0.3 + 0.2));
    }

    #[test]
    fn font_scan_counts_dominant_bold_profile() {
        let pages: Vec<PageContent> = (0..10)
            .map(|i| {
                let mut spans = Vec::new();
                if i < 5 {
                    for _ in 0..40 {
                        spans.push(TypedSpan::new("Arial-Bold", 18.0, "Heading text").bold());
                    }
                    spans.push(TypedSpan::new("Times", 11.0, "body"));
                } else {
                    // outside the sample window
                    spans.push(TypedSpan::new("Arial-Bold", 18.0, "late").bold());
                }
                PageContent::from_text(i, "text").with_spans(spans)
            })
            .collect();
        let doc = MemoryDocument::new(pages);

        let profiles = build_font_profiles(&doc, 5).unwrap();
        assert_eq!(profiles.len(), 2);
        let top = &profiles[0];
        assert!(top.is_bold());
        assert_eq!(top.count, 200);
        assert!(approx(top.size(), 18.0));
        assert!(top.sample.chars().count() <= SAMPLE_CHARS);
        assert!(top.sample.starts_with("Heading text"));
    }

    #[test]
    fn font_scan_is_deterministic() {
        let doc = MemoryDocument::new(vec![PageContent::from_text(0, "x").with_spans(vec![
            TypedSpan::new("B", 10.0, "one"),
            TypedSpan::new("A", 10.0, "two"),
            TypedSpan::new("C", 12.0, "three").italic(),
        ])]);
        let a = build_font_profiles(&doc, 5).unwrap();
        let b = build_font_profiles(&doc, 5).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].key.font_id, "A");
    }

    #[test]
    fn heading_profiles_exclude_body() {
        let doc = MemoryDocument::new(vec![PageContent::from_text(0, "x").with_spans(vec![
            TypedSpan::new("Body", 10.0, "a"),
            TypedSpan::new("Body", 10.0, "b"),
            TypedSpan::new("Body", 10.0, "c"),
            TypedSpan::new("Title", 16.0, "Big"),
            TypedSpan::new("Body", 10.0, "strong").bold(),
            TypedSpan::new("Small", 8.0, "footnote"),
        ])]);
        let profiles = build_font_profiles(&doc, 5).unwrap();
        assert_eq!(body_profile(&profiles).unwrap().key.font_id, "Body");
        let headings: Vec<&str> = heading_profiles(&profiles)
            .iter()
            .map(|p| p.sample.as_str())
            .collect();
        assert_eq!(headings.len(), 2);
        assert!(headings.contains(&"Big"));
        assert!(headings.contains(&"strong"));
    }
}
