//! Prompts for the enrichment collaborators.
//!
//! Every system prompt and user-prompt template lives here so tests can
//! inspect them without a provider, and so wording changes touch one file.

use crate::pipeline::enricher::EnrichmentTask;
use crate::slide::SlideSpec;
use serde_json::{json, Value};

pub const CONTENT_ANALYSIS_PROMPT: &str = r#"You are a presentation planner. Segment the document content you receive into logical slides.

Return ONLY a JSON array. Each element must have:
- "SlideNumber": integer, starting at 1
- "Title": string
- "Content": array of short bullet strings
- "HasData": true when the slide carries tabular or numeric data worth charting
- "Data": the data as text when HasData is true, otherwise ""
- "NeedsImage": true when an illustrative image would help
- "ImageKeywords": search keywords when NeedsImage is true, otherwise ""

Do not add commentary."#;

pub const THEME_LAYOUT_PROMPT: &str = r#"You are a slide designer. Given one slide and a base theme, choose a layout and refine the theme for that slide.

Return ONLY a JSON object with the keys "theme" (name, colors, fonts), "layout" (structure of title, body and media regions), "css_classes" (array of strings) and "visual_recommendations" (array of strings). Build on the base theme; do not replace its palette."#;

pub const VISUALIZATION_PROMPT: &str = r#"You are a data visualisation engineer. Write JavaScript using Chart.js that renders the slide's data in the most fitting chart type.

Return ONLY the code in a single ```javascript fenced block. Target a canvas element with id "chart"."#;

pub const IMAGE_SEARCH_PROMPT: &str = r#"You find illustrative images for slides. Given the slide and its image keywords, answer with the URL of one freely licensed image that fits.

Return ONLY a JSON object: {"url": "...", "alt": "...", "source": "..."}."#;

pub const SLIDE_HTML_PROMPT: &str = r#"You are a front-end developer building academic presentation slides. Produce one complete, responsive HTML slide with inline CSS and any JavaScript it needs.

Use the theme and layout you are given. Embed the visualisation code and image when provided. Add a fitting icon before section headings.

Return ONLY the HTML in a single ```html fenced block."#;

pub const NARRATION_PROMPT: &str = r#"You write lecture narration. Given a slide's HTML and data, write a 300 to 500 word script that introduces the topic, explains every key point, gives context, and ends with a transition to the next slide.

Academic but engaging tone. Return plain text only."#;

/// System prompt for a collaborator task.
pub fn system_prompt(task: EnrichmentTask) -> &'static str {
    match task {
        EnrichmentTask::ContentAnalysis => CONTENT_ANALYSIS_PROMPT,
        EnrichmentTask::ThemeLayout => THEME_LAYOUT_PROMPT,
        EnrichmentTask::Visualization => VISUALIZATION_PROMPT,
        EnrichmentTask::ImageSearch => IMAGE_SEARCH_PROMPT,
        EnrichmentTask::SlideHtml => SLIDE_HTML_PROMPT,
        EnrichmentTask::Narration => NARRATION_PROMPT,
    }
}

/// Theme used when none is configured.
pub fn default_theme() -> Value {
    json!({
        "name": "Default",
        "colors": {
            "primary": "#2c3e50",
            "secondary": "#3498db",
            "accent": "#e74c3c",
            "background": "#f5f9fa",
            "text": "#333333"
        },
        "fonts": {
            "heading": "'Roboto', sans-serif",
            "body": "'Open Sans', sans-serif"
        }
    })
}

fn slide_json(spec: &SlideSpec) -> String {
    serde_json::to_string_pretty(spec).unwrap_or_else(|_| spec.outline())
}

pub fn content_analysis_input(content: &str) -> String {
    format!("Document content:\n\n\"\"\"{}\"\"\"", content)
}

pub fn theme_layout_input(spec: &SlideSpec, base_theme: &Value) -> String {
    format!(
        "Slide data:\n{}\n\nBase theme:\n{}",
        slide_json(spec),
        base_theme
    )
}

pub fn visualization_input(spec: &SlideSpec) -> String {
    format!("Data:\n{}\n\nSlide context:\n{}", spec.data, slide_json(spec))
}

pub fn image_search_input(spec: &SlideSpec) -> String {
    format!(
        "Slide data:\n{}\n\nImage keywords: {}",
        slide_json(spec),
        spec.image_keywords
    )
}

pub fn slide_html_input(
    spec: &SlideSpec,
    theme_layout: &str,
    visualization: Option<&str>,
    image: Option<&str>,
) -> String {
    format!(
        "Slide data:\n{}\n\nTheme and layout:\n{}\n\nVisualisation (if any):\n{}\n\nImage (if any):\n{}",
        slide_json(spec),
        theme_layout,
        visualization.unwrap_or("none"),
        image.unwrap_or("none")
    )
}

pub fn narration_input(spec: &SlideSpec, slide_html: &str) -> String {
    format!(
        "Slide HTML:\n{}\n\nSlide data:\n{}",
        slide_html,
        slide_json(spec)
    )
}
