//! Streaming enrichment: emit slides as they complete.
//!
//! [`crate::ingest::enrich`] returns only after every slide finishes.
//! [`enrich_stream`] yields each [`SlideArtifact`] as soon as its stages are
//! done, so callers can render or save slides incrementally. Artifacts
//! arrive in completion order; sort by `slide_number` if order matters.

use crate::config::IngestConfig;
use crate::output::SlideArtifact;
use crate::pipeline::enricher::Enricher;
use crate::pipeline::runner::{CancelHandle, Runner, WorkItem};
use crate::pipeline::stages::default_stages;
use crate::slide::SlideSpec;
use futures::stream::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of slide artifacts.
pub type SlideStream = Pin<Box<dyn Stream<Item = SlideArtifact> + Send>>;

/// Enrich `specs`, streaming artifacts in completion order.
///
/// At most `config.max_concurrency` slides are in flight. Failed slides are
/// yielded too, with `error` set.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2slides::{enrich_stream, ingest, CancelHandle, IngestConfig, LlmEnricher};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IngestConfig::default();
/// let ingestion = ingest("paper.pdf", &config).await?;
/// let enricher = Arc::new(LlmEnricher::from_config(&config)?);
/// let mut slides = enrich_stream(ingestion.slides(), enricher, &config, CancelHandle::new());
/// while let Some(slide) = slides.next().await {
///     println!("slide {}: {}", slide.slide_number, slide.title);
/// }
/// # Ok(())
/// # }
/// ```
pub fn enrich_stream(
    specs: Vec<SlideSpec>,
    enricher: Arc<dyn Enricher>,
    config: &IngestConfig,
    cancel: CancelHandle,
) -> SlideStream {
    info!("Starting streaming enrichment of {} slides", specs.len());
    let runner = Runner::new(default_stages(enricher, config.base_theme.clone()))
        .with_bound(config.max_concurrency)
        .with_progress(config.progress_callback.clone())
        .with_cancel(cancel);

    let items = WorkItem::from_specs(specs.clone());
    let specs = Arc::new(specs);
    let s = runner.run_stream(items).filter_map(move |result| {
        let artifact = specs
            .get(result.ordinal)
            .map(|spec| SlideArtifact::from_result(spec, &result));
        async move { artifact }
    });

    Box::pin(s)
}
