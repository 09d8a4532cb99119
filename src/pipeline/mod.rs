//! The per-slide enrichment pipeline.
//!
//! ## Data Flow
//!
//! ```text
//! SlideSpec ──▶ WorkItem ──▶ Runner ──▶ [theme_layout ─▶ … ─▶ narration] ──▶ ItemResult
//!                                 (one task per item, bounded by a semaphore)
//! ```
//!
//! 1. [`enricher`] is the collaborator boundary. The LLM-backed implementation
//!    owns retries and timeouts.
//! 2. [`runner`] fans items out, runs each item's stages in order, and joins
//!    results back in input order.
//! 3. [`stages`] holds the five slide stages and their skip predicates.

pub mod enricher;
pub mod runner;
pub mod stages;

pub use enricher::{Enricher, EnrichmentTask, LlmEnricher};
pub use runner::{CancelHandle, ItemResult, ItemStream, Runner, Stage, StageOutputs, WorkItem};
pub use stages::default_stages;
