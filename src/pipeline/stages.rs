//! The slide stages.
//!
//! ```text
//! theme_layout ──▶ visualization ──▶ image_search ──▶ slide_html ──▶ narration
//!                  (has_data only)   (needs_image)    (needs theme)  (needs html)
//! ```
//!
//! Each stage builds a prompt, asks its [`Enricher`], and parses the reply
//! leniently. A collaborator failure becomes [`ItemError::StageFailed`].

use crate::error::{EnrichError, ItemError};
use crate::pipeline::enricher::{Enricher, EnrichmentTask};
use crate::pipeline::runner::{Stage, StageOutputs, WorkItem};
use crate::prompts;
use crate::structured::{extract_code, extract_structured, Extracted};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const THEME_LAYOUT: &str = "theme_layout";
pub const VISUALIZATION: &str = "visualization";
pub const IMAGE_SEARCH: &str = "image_search";
pub const SLIDE_HTML: &str = "slide_html";
pub const NARRATION: &str = "narration";

fn stage_failed(ordinal: usize, stage: &str, e: EnrichError) -> ItemError {
    ItemError::StageFailed {
        ordinal,
        stage: stage.to_string(),
        detail: e.to_string(),
    }
}

async fn ask(
    enricher: &dyn Enricher,
    task: EnrichmentTask,
    input: &str,
    ordinal: usize,
    stage: &str,
) -> Result<String, ItemError> {
    enricher
        .enrich(task, input)
        .await
        .map_err(|e| stage_failed(ordinal, stage, e))
}

/// Picks a layout and refines the base theme for one slide.
pub struct ThemeLayoutStage {
    enricher: Arc<dyn Enricher>,
    base_theme: Value,
}

impl ThemeLayoutStage {
    pub fn new(enricher: Arc<dyn Enricher>, base_theme: Option<Value>) -> Self {
        Self {
            enricher,
            base_theme: base_theme.unwrap_or_else(prompts::default_theme),
        }
    }
}

#[async_trait]
impl Stage for ThemeLayoutStage {
    fn name(&self) -> &str {
        THEME_LAYOUT
    }

    async fn run(&self, item: &WorkItem, _prior: &StageOutputs) -> Result<Extracted, ItemError> {
        let input = prompts::theme_layout_input(&item.spec, &self.base_theme);
        let reply = ask(
            self.enricher.as_ref(),
            EnrichmentTask::ThemeLayout,
            &input,
            item.ordinal,
            THEME_LAYOUT,
        )
        .await?;
        Ok(extract_structured(&reply))
    }
}

/// Chart code for slides that carry data.
pub struct VisualizationStage {
    enricher: Arc<dyn Enricher>,
}

impl VisualizationStage {
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self { enricher }
    }
}

#[async_trait]
impl Stage for VisualizationStage {
    fn name(&self) -> &str {
        VISUALIZATION
    }

    fn applies_to(&self, item: &WorkItem) -> bool {
        item.spec.has_data
    }

    async fn run(&self, item: &WorkItem, _prior: &StageOutputs) -> Result<Extracted, ItemError> {
        let input = prompts::visualization_input(&item.spec);
        let reply = ask(
            self.enricher.as_ref(),
            EnrichmentTask::Visualization,
            &input,
            item.ordinal,
            VISUALIZATION,
        )
        .await?;
        Ok(Extracted::Raw(extract_code(&reply)))
    }
}

/// Image lookup for slides that ask for one.
pub struct ImageSearchStage {
    enricher: Arc<dyn Enricher>,
}

impl ImageSearchStage {
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self { enricher }
    }
}

#[async_trait]
impl Stage for ImageSearchStage {
    fn name(&self) -> &str {
        IMAGE_SEARCH
    }

    fn applies_to(&self, item: &WorkItem) -> bool {
        item.spec.needs_image
    }

    async fn run(&self, item: &WorkItem, _prior: &StageOutputs) -> Result<Extracted, ItemError> {
        let input = prompts::image_search_input(&item.spec);
        let reply = ask(
            self.enricher.as_ref(),
            EnrichmentTask::ImageSearch,
            &input,
            item.ordinal,
            IMAGE_SEARCH,
        )
        .await?;
        Ok(extract_structured(&reply))
    }
}

/// The slide markup. Requires the theme/layout output.
pub struct SlideHtmlStage {
    enricher: Arc<dyn Enricher>,
}

impl SlideHtmlStage {
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self { enricher }
    }
}

/// URL from an image-search reply: `url` of a structured value, else the text.
pub fn image_url(output: &Extracted) -> Option<String> {
    match output {
        Extracted::Structured(v) => v
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| v.as_str().map(str::to_string)),
        Extracted::Raw(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
    }
}

#[async_trait]
impl Stage for SlideHtmlStage {
    fn name(&self) -> &str {
        SLIDE_HTML
    }

    async fn run(&self, item: &WorkItem, prior: &StageOutputs) -> Result<Extracted, ItemError> {
        let theme_layout = prior.require(THEME_LAYOUT, item.ordinal, SLIDE_HTML)?.to_text();
        let visualization = prior.get(VISUALIZATION).map(Extracted::to_text);
        let image = prior.get(IMAGE_SEARCH).and_then(image_url);

        let input = prompts::slide_html_input(
            &item.spec,
            &theme_layout,
            visualization.as_deref(),
            image.as_deref(),
        );
        let reply = ask(
            self.enricher.as_ref(),
            EnrichmentTask::SlideHtml,
            &input,
            item.ordinal,
            SLIDE_HTML,
        )
        .await?;
        Ok(Extracted::Raw(extract_code(&reply)))
    }
}

/// Spoken script for the slide. Requires the slide HTML.
pub struct NarrationStage {
    enricher: Arc<dyn Enricher>,
}

impl NarrationStage {
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self { enricher }
    }
}

#[async_trait]
impl Stage for NarrationStage {
    fn name(&self) -> &str {
        NARRATION
    }

    async fn run(&self, item: &WorkItem, prior: &StageOutputs) -> Result<Extracted, ItemError> {
        let html = prior.require(SLIDE_HTML, item.ordinal, NARRATION)?.to_text();
        let input = prompts::narration_input(&item.spec, &html);
        let reply = ask(
            self.enricher.as_ref(),
            EnrichmentTask::Narration,
            &input,
            item.ordinal,
            NARRATION,
        )
        .await?;
        Ok(Extracted::Raw(reply.trim().to_string()))
    }
}

/// The full slide stage list, in run order.
pub fn default_stages(enricher: Arc<dyn Enricher>, base_theme: Option<Value>) -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(ThemeLayoutStage::new(Arc::clone(&enricher), base_theme)),
        Arc::new(VisualizationStage::new(Arc::clone(&enricher))),
        Arc::new(ImageSearchStage::new(Arc::clone(&enricher))),
        Arc::new(SlideHtmlStage::new(Arc::clone(&enricher))),
        Arc::new(NarrationStage::new(enricher)),
    ]
}
