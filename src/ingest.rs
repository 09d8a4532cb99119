//! Eager entry points: ingest a PDF, plan slides, enrich them.
//!
//! [`ingest`] returns once every selected page is extracted, structured,
//! chunked and classified. [`enrich`] runs the slide pipeline over a list of
//! slide specifications and returns one artifact per slide, in order. Use
//! [`crate::stream::enrich_stream`] to receive artifacts as they finish.

use crate::classify::classify_all;
use crate::config::IngestConfig;
use crate::document::input::{self, ResolvedInput};
use crate::document::reader::{extract_pages, DocumentHandle, ExtractOptions};
use crate::document::structure::{body_profile, build_font_profiles, heading_profiles, infer_sections};
use crate::document::{DocumentMetadata, MemoryDocument, PageSource};
use crate::chunking::chunk_document;
use crate::error::{Pdf2SlidesError, StoreError};
use crate::output::{ChunkingInfo, DocumentStructure, EnrichmentOutput, IngestStats, Ingestion, SlideArtifact};
use crate::pipeline::enricher::{Enricher, EnrichmentTask, LlmEnricher};
use crate::pipeline::runner::{CancelHandle, Runner, WorkItem};
use crate::pipeline::stages::default_stages;
use crate::prompts;
use crate::slide::SlideSpec;
use crate::store::{keys, ResultStore};
use crate::structured::extract_structured;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ingest a PDF file or URL.
///
/// # Errors
/// Only fatal errors: missing or unreadable input, a page selection that
/// matches nothing, or a document with no extractable text.
pub async fn ingest(
    input_str: impl AsRef<str>,
    config: &IngestConfig,
) -> Result<Ingestion, Pdf2SlidesError> {
    let input_str = input_str.as_ref();
    info!("Starting ingestion: {}", input_str);
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    ingest_resolved(resolved, config).await
}

/// Ingest PDF bytes held in memory.
///
/// The bytes go to a managed temp file that is removed on return.
pub async fn ingest_from_bytes(
    bytes: &[u8],
    config: &IngestConfig,
) -> Result<Ingestion, Pdf2SlidesError> {
    let resolved = input::resolve_bytes(bytes)?;
    ingest_resolved(resolved, config).await
}

/// Synchronous wrapper around [`ingest`].
///
/// Creates a temporary tokio runtime internally.
pub fn ingest_sync(
    input_str: impl AsRef<str>,
    config: &IngestConfig,
) -> Result<Ingestion, Pdf2SlidesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2SlidesError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ingest(input_str, config))
}

/// Read PDF metadata without extracting content.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, Pdf2SlidesError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let options = ExtractOptions {
        extract_images: false,
        detect_tables: false,
    };
    let handle = DocumentHandle::open_async(resolved.path(), None, options).await?;
    Ok(handle.metadata())
}

async fn ingest_resolved(
    resolved: ResolvedInput,
    config: &IngestConfig,
) -> Result<Ingestion, Pdf2SlidesError> {
    let total_start = Instant::now();
    config.chunk_spec().validate()?;

    let options = ExtractOptions {
        extract_images: config.extract_images,
        detect_tables: config.detect_tables,
    };
    let handle = Arc::new(
        DocumentHandle::open_async(resolved.path(), config.password.clone(), options).await?,
    );
    let total_pages = handle.page_count();

    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() {
        return Err(Pdf2SlidesError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    debug!("Selected {} of {} pages", indices.len(), total_pages);

    let extract_start = Instant::now();
    let pages = extract_pages(Arc::clone(&handle), indices, config.max_concurrency).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!("Extracted {} pages in {}ms", pages.len(), extract_duration_ms);

    let document = MemoryDocument::new(pages)
        .with_toc(handle.toc()?)
        .with_metadata(handle.metadata());
    // The temp file backing a URL or byte input is no longer needed.
    drop(resolved);

    let mut ingestion = analyze(Arc::new(document), config).await?;
    ingestion.stats.total_pages = total_pages;
    ingestion.stats.extract_duration_ms = extract_duration_ms;
    ingestion.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Ingestion complete: {} pages, {} chunks, {}ms total",
        ingestion.stats.processed_pages, ingestion.stats.total_chunks, ingestion.stats.total_duration_ms
    );
    Ok(ingestion)
}

/// Structure, chunk and classify pages that are already in memory.
///
/// The structure analyzer and the chunker read the same pages on two
/// blocking tasks; classification runs once both are done.
pub async fn analyze(
    document: Arc<MemoryDocument>,
    config: &IngestConfig,
) -> Result<Ingestion, Pdf2SlidesError> {
    let start = Instant::now();
    let spec = config.chunk_spec();
    spec.validate()?;
    let sample_pages = config.font_sample_pages;
    let append_tables = config.append_tables;

    let structure_doc = Arc::clone(&document);
    let structure_task = tokio::task::spawn_blocking(move || {
        let profiles = build_font_profiles(&*structure_doc, sample_pages)?;
        let sections = infer_sections(&*structure_doc)?;
        Ok::<_, Pdf2SlidesError>((profiles, sections))
    });
    let chunk_doc = Arc::clone(&document);
    let chunk_task =
        tokio::task::spawn_blocking(move || chunk_document(&*chunk_doc, &spec, append_tables));

    let (structure, chunks) = tokio::join!(structure_task, chunk_task);
    let (font_profiles, sections) = structure
        .map_err(|e| Pdf2SlidesError::Internal(format!("Structure task panicked: {}", e)))??;
    let chunks =
        chunks.map_err(|e| Pdf2SlidesError::Internal(format!("Chunking task panicked: {}", e)))??;

    let chunks = classify_all(chunks);
    let chunking_info = ChunkingInfo::new(&spec, &chunks);

    let structure = DocumentStructure {
        body_font_size: body_profile(&font_profiles).map(|p| p.size()),
        heading_profiles: heading_profiles(&font_profiles).len(),
        font_profiles,
        sections,
    };

    let pages = document.as_pages().to_vec();
    let stats = IngestStats {
        total_pages: document.page_count(),
        processed_pages: pages.len(),
        empty_pages: pages.iter().filter(|p| !p.has_text()).count(),
        total_chunks: chunks.len(),
        estimated_slides: chunks.iter().map(|c| c.estimated_items).sum(),
        analyze_duration_ms: start.elapsed().as_millis() as u64,
        ..Default::default()
    };
    debug!(
        "Analyzed {} pages: {} sections, {} font profiles, {} chunks",
        stats.processed_pages,
        structure.sections.len(),
        structure.font_profiles.len(),
        stats.total_chunks
    );

    Ok(Ingestion {
        metadata: document.metadata(),
        pages,
        structure,
        chunks,
        chunking_info,
        stats,
    })
}

/// Write the ingestion artifacts into `store`.
pub fn record_ingestion(ingestion: &Ingestion, store: &ResultStore) -> Result<(), StoreError> {
    store.put(keys::PDF_CONTENT, &ingestion.pages)?;
    store.put(keys::DOCUMENT_STRUCTURE, &ingestion.structure)?;
    let chunks: Vec<_> = ingestion.chunks.iter().map(|c| &c.chunk).collect();
    store.put(keys::CHUNKS, &chunks)?;
    store.put(keys::PRESENTATION_CHUNKS, &ingestion.chunks)?;
    Ok(())
}

/// Slide specifications for an ingestion.
///
/// With an enricher, the content-analysis collaborator segments the text and
/// its reply is parsed leniently. An unusable reply falls back to one slide
/// per classified chunk.
pub async fn plan_slides(ingestion: &Ingestion, enricher: Option<&dyn Enricher>) -> Vec<SlideSpec> {
    let Some(enricher) = enricher else {
        return ingestion.slides();
    };

    let input = prompts::content_analysis_input(&ingestion.full_text());
    match enricher.enrich(EnrichmentTask::ContentAnalysis, &input).await {
        Ok(reply) => {
            let parsed = extract_structured(&reply);
            let specs = parsed.as_value().map(SlideSpec::parse_many).unwrap_or_default();
            if specs.is_empty() {
                warn!("Content analysis returned no usable slides; using classified chunks");
                ingestion.slides()
            } else {
                info!("Content analysis planned {} slides", specs.len());
                specs
            }
        }
        Err(e) => {
            warn!("Content analysis failed ({}); using classified chunks", e);
            ingestion.slides()
        }
    }
}

/// Run the slide stages over `specs`.
///
/// Results are stored under `slides` and `slide_results` and returned in
/// slide order. Item failures are reported in their artifact; they never
/// abort the run.
pub async fn enrich(
    specs: Vec<SlideSpec>,
    enricher: Arc<dyn Enricher>,
    config: &IngestConfig,
    store: &ResultStore,
    cancel: CancelHandle,
) -> Result<EnrichmentOutput, Pdf2SlidesError> {
    let start = Instant::now();
    store
        .put(keys::SLIDES, &specs)
        .map_err(|e| Pdf2SlidesError::Internal(e.to_string()))?;

    let runner = Runner::new(default_stages(enricher, config.base_theme.clone()))
        .with_bound(config.max_concurrency)
        .with_progress(config.progress_callback.clone())
        .with_cancel(cancel);
    let results = runner.run(WorkItem::from_specs(specs.clone())).await;

    let artifacts: Vec<SlideArtifact> = specs
        .iter()
        .zip(results.iter())
        .map(|(spec, result)| SlideArtifact::from_result(spec, result))
        .collect();
    store
        .put(keys::SLIDE_RESULTS, &artifacts)
        .map_err(|e| Pdf2SlidesError::Internal(e.to_string()))?;

    let output = EnrichmentOutput::new(artifacts, start.elapsed().as_millis() as u64);
    info!(
        "Enrichment complete: {}/{} slides, {}ms",
        output.succeeded,
        output.slides.len(),
        output.total_duration_ms
    );
    Ok(output)
}

/// Ingest, plan and enrich in one call, using the LLM enricher from `config`.
///
/// The store is cleared first and holds every intermediate artifact on
/// return.
pub async fn generate(
    input_str: impl AsRef<str>,
    config: &IngestConfig,
    store: &ResultStore,
    use_content_analysis: bool,
) -> Result<(Ingestion, EnrichmentOutput), Pdf2SlidesError> {
    let enricher: Arc<dyn Enricher> = Arc::new(LlmEnricher::from_config(config)?);
    store.clear();

    let ingestion = ingest(input_str, config).await?;
    record_ingestion(&ingestion, store).map_err(|e| Pdf2SlidesError::Internal(e.to_string()))?;

    let planner = use_content_analysis.then_some(enricher.as_ref());
    let specs = plan_slides(&ingestion, planner).await;
    let output = enrich(specs, enricher, config, store, CancelHandle::new()).await?;
    Ok((ingestion, output))
}
