//! # edgequake-pdf2slides
//!
//! Turn PDF documents into slide specifications and enrich each slide through
//! a concurrent, multi-stage pipeline.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file, URL download, or in-memory bytes
//!  ├─ 2. Extract   text, typography spans, images, tables via pdfium
//!  │               (bounded spawn_blocking batches, page order kept)
//!  ├─ 3. Analyze   font profiles + section outline ┐ run in parallel
//!  ├─ 4. Chunk     recursive / markdown / token /  ┘ over the same pages
//!  │               hybrid
//!  ├─ 5. Classify  content type, key points, layout hint
//!  └─ 6. Enrich    one task per slide: theme/layout → visualization →
//!                  image search → slide HTML → narration
//! ```
//!
//! Steps 1 to 5 need no LLM. Step 6 talks to collaborators through the
//! [`Enricher`] trait; [`LlmEnricher`] is the `edgequake-llm` backed one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2slides::{ingest, IngestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig::default();
//!     let ingestion = ingest("paper.pdf", &config).await?;
//!     for chunk in &ingestion.chunks {
//!         println!("#{} [{}] {} key points", chunk.chunk.id, chunk.content_type, chunk.key_points.len());
//!     }
//!     for slide in ingestion.slides() {
//!         println!("{}", slide.outline());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2slides` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2slides = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chunking;
pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod slide;
pub mod store;
pub mod stream;
pub mod structured;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chunking::{chunk_document, Chunk, ChunkSpec, ChunkStrategy};
pub use classify::{classify, ClassifiedChunk, ContentType, LayoutHint};
pub use config::{IngestConfig, IngestConfigBuilder, PageSelection};
pub use document::reader::{DocumentHandle, ExtractOptions};
pub use document::structure::{FontProfile, SectionCandidate};
pub use document::{DocumentMetadata, MemoryDocument, PageContent, PageSource};
pub use error::{EnrichError, ItemError, Pdf2SlidesError, StoreError};
pub use ingest::{analyze, enrich, generate, ingest, ingest_from_bytes, ingest_sync, inspect, plan_slides};
pub use output::{EnrichmentOutput, IngestStats, Ingestion, SlideArtifact};
pub use pipeline::{CancelHandle, Enricher, EnrichmentTask, ItemResult, LlmEnricher, Runner, Stage, StageOutputs, WorkItem};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use slide::SlideSpec;
pub use store::ResultStore;
pub use stream::enrich_stream;
pub use structured::{extract_structured, Extracted};
