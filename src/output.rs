//! Output types for ingestion and enrichment.

use crate::chunking::{ChunkSpec, ChunkStrategy};
use crate::classify::{ClassifiedChunk, ContentType};
use crate::document::structure::{FontProfile, SectionCandidate};
use crate::document::{DocumentMetadata, PageContent};
use crate::error::ItemError;
use crate::pipeline::runner::ItemResult;
use crate::pipeline::stages::{self, image_url};
use crate::slide::SlideSpec;
use crate::structured::Extracted;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything ingestion learned about a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingestion {
    pub metadata: DocumentMetadata,
    /// Extracted pages, in page order.
    pub pages: Vec<PageContent>,
    pub structure: DocumentStructure,
    pub chunks: Vec<ClassifiedChunk>,
    pub chunking_info: ChunkingInfo,
    pub stats: IngestStats,
}

impl Ingestion {
    /// One slide specification per classified chunk, numbered from 1.
    pub fn slides(&self) -> Vec<SlideSpec> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| SlideSpec::from_classified(i, chunk))
            .collect()
    }

    /// Page text joined with blank lines, as handed to content analysis.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Typography and outline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentStructure {
    /// Sorted by occurrence count, most frequent first.
    pub font_profiles: Vec<FontProfile>,
    pub sections: Vec<SectionCandidate>,
    /// Size of the dominant body font, if any text was sampled.
    pub body_font_size: Option<f32>,
    pub heading_profiles: usize,
}

/// How the document was chunked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingInfo {
    pub strategy: ChunkStrategy,
    pub size: usize,
    pub overlap: usize,
    pub total_chunks: usize,
    pub content_types: BTreeMap<ContentType, usize>,
}

impl ChunkingInfo {
    pub fn new(spec: &ChunkSpec, chunks: &[ClassifiedChunk]) -> Self {
        let mut content_types = BTreeMap::new();
        for chunk in chunks {
            *content_types.entry(chunk.content_type).or_insert(0) += 1;
        }
        Self {
            strategy: spec.strategy,
            size: spec.size,
            overlap: spec.overlap,
            total_chunks: chunks.len(),
            content_types,
        }
    }
}

/// Counts and timings for one ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub total_pages: usize,
    /// Pages actually extracted (after page selection).
    pub processed_pages: usize,
    /// Extracted pages with no text.
    pub empty_pages: usize,
    pub total_chunks: usize,
    pub estimated_slides: usize,
    pub extract_duration_ms: u64,
    pub analyze_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The assembled result for one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideArtifact {
    pub slide_number: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_layout: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
    pub duration_ms: u64,
}

impl SlideArtifact {
    /// Assemble from a slide and its runner result.
    pub fn from_result(spec: &SlideSpec, result: &ItemResult) -> Self {
        let mut artifact = Self {
            slide_number: spec.slide_number,
            title: spec.title.clone(),
            theme_layout: None,
            visualization: None,
            image_url: None,
            slide_html: None,
            narration: None,
            error: result.error().cloned(),
            duration_ms: result.duration_ms,
        };

        if let Some(outputs) = result.outputs() {
            artifact.theme_layout = outputs.get(stages::THEME_LAYOUT).cloned().map(Extracted::into_value);
            artifact.visualization = outputs.get(stages::VISUALIZATION).map(Extracted::to_text);
            artifact.image_url = outputs.get(stages::IMAGE_SEARCH).and_then(image_url);
            artifact.slide_html = outputs.get(stages::SLIDE_HTML).map(Extracted::to_text);
            artifact.narration = outputs.get(stages::NARRATION).map(Extracted::to_text);
        }
        artifact
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Results of an enrichment run, in slide order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentOutput {
    pub slides: Vec<SlideArtifact>,
    pub succeeded: usize,
    pub failed: usize,
    pub total_duration_ms: u64,
}

impl EnrichmentOutput {
    pub fn new(slides: Vec<SlideArtifact>, total_duration_ms: u64) -> Self {
        let succeeded = slides.iter().filter(|s| s.is_ok()).count();
        Self {
            failed: slides.len() - succeeded,
            succeeded,
            slides,
            total_duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::runner::StageOutputs;
    use serde_json::json;

    fn spec() -> SlideSpec {
        SlideSpec {
            slide_number: 3,
            title: "Method".into(),
            content: vec![],
            has_data: false,
            data: String::new(),
            needs_image: true,
            image_keywords: "lab".into(),
        }
    }

    #[test]
    fn artifact_collects_stage_outputs() {
        let mut outputs = StageOutputs::default();
        outputs.insert(stages::THEME_LAYOUT, Extracted::Structured(json!({"layout": "split"})));
        outputs.insert(stages::IMAGE_SEARCH, Extracted::Structured(json!({"url": "https://i"})));
        outputs.insert(stages::SLIDE_HTML, Extracted::Raw("<section/>".into()));
        outputs.insert(stages::NARRATION, Extracted::Raw("Today we…".into()));
        let result = ItemResult {
            ordinal: 2,
            outcome: Ok(outputs),
            duration_ms: 12,
        };

        let artifact = SlideArtifact::from_result(&spec(), &result);
        assert_eq!(artifact.slide_number, 3);
        assert_eq!(artifact.theme_layout, Some(json!({"layout": "split"})));
        assert_eq!(artifact.image_url.as_deref(), Some("https://i"));
        assert!(artifact.visualization.is_none());
        assert!(artifact.is_ok());
    }

    #[test]
    fn artifact_keeps_error() {
        let result = ItemResult {
            ordinal: 2,
            outcome: Err(ItemError::Cancelled { ordinal: 2 }),
            duration_ms: 0,
        };
        let artifact = SlideArtifact::from_result(&spec(), &result);
        assert!(!artifact.is_ok());
        assert!(artifact.slide_html.is_none());

        let output = EnrichmentOutput::new(vec![artifact], 5);
        assert_eq!((output.succeeded, output.failed), (0, 1));
    }
}
