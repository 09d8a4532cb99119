//! Configuration types for PDF ingestion and slide enrichment.
//!
//! All behaviour is controlled through [`IngestConfig`], built via its
//! [`IngestConfigBuilder`]. Every heuristic threshold that has a sensible
//! knob (chunk size, overlap, font sample pages, concurrency bound) lives
//! here as a documented default instead of a constant buried in an algorithm.

use crate::chunking::{ChunkSpec, ChunkStrategy};
use crate::error::Pdf2SlidesError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for ingesting a PDF and enriching its chunks.
///
/// Built via [`IngestConfig::builder()`] or using [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2slides::{ChunkStrategy, IngestConfig};
///
/// let config = IngestConfig::builder()
///     .chunk_strategy(ChunkStrategy::Hybrid)
///     .chunk_size(1200)
///     .chunk_overlap(150)
///     .max_concurrency(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.chunk_spec().size, 1200);
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Chunking strategy. Default: [`ChunkStrategy::Recursive`].
    pub chunk_strategy: ChunkStrategy,

    /// Target chunk size in characters (tokens for the token strategy). Default: 1000.
    pub chunk_size: usize,

    /// Overlap repeated across chunk boundaries. Must be smaller than
    /// `chunk_size`. Default: 200.
    pub chunk_overlap: usize,

    /// Number of leading pages scanned for font profiles. Default: 5.
    pub font_sample_pages: usize,

    /// Upper bound on simultaneously in-flight tasks, both for page
    /// extraction batches and for enrichment items. `None` means unbounded.
    /// Default: `Some(5)`.
    pub max_concurrency: Option<usize>,

    /// Decode embedded images while reading pages. Default: false.
    ///
    /// Image decoding dominates extraction time on scanned documents, so it
    /// is opt-in.
    pub extract_images: bool,

    /// Run the geometric table detector on every page. Default: true.
    pub detect_tables: bool,

    /// Append detected tables as pipe-format Markdown to their page text
    /// before chunking. Default: false.
    pub append_tables: bool,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// LLM model identifier used by the enrichment collaborators.
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for enrichment calls. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens generated per enrichment call. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts per enrichment call. Default: 3.
    ///
    /// Retries belong to the collaborator boundary; the pipeline runner
    /// itself never retries a failed stage.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled on every attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-enrichment-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Theme handed to the theme/layout collaborator. `None` uses
    /// [`crate::prompts::default_theme`].
    pub base_theme: Option<serde_json::Value>,

    /// Optional progress callback for per-item pipeline events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_strategy: ChunkStrategy::default(),
            chunk_size: 1000,
            chunk_overlap: 200,
            font_sample_pages: 5,
            max_concurrency: Some(5),
            extract_images: false,
            detect_tables: true,
            append_tables: false,
            pages: PageSelection::default(),
            password: None,
            download_timeout_secs: 120,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            base_theme: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("chunk_strategy", &self.chunk_strategy)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("font_sample_pages", &self.font_sample_pages)
            .field("max_concurrency", &self.max_concurrency)
            .field("extract_images", &self.extract_images)
            .field("detect_tables", &self.detect_tables)
            .field("append_tables", &self.append_tables)
            .field("pages", &self.pages)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// The chunking parameters as one value.
    pub fn chunk_spec(&self) -> ChunkSpec {
        ChunkSpec {
            strategy: self.chunk_strategy,
            size: self.chunk_size,
            overlap: self.chunk_overlap,
        }
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn chunk_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.config.chunk_strategy = strategy;
        self
    }

    /// Select the strategy by name; unknown names fall back to recursive.
    pub fn chunk_strategy_name(mut self, name: &str) -> Self {
        self.config.chunk_strategy = ChunkStrategy::from_name(name);
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    pub fn font_sample_pages(mut self, pages: usize) -> Self {
        self.config.font_sample_pages = pages;
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.max_concurrency = Some(n);
        self
    }

    /// Remove the concurrency bound entirely.
    pub fn unbounded(mut self) -> Self {
        self.config.max_concurrency = None;
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.extract_images = v;
        self
    }

    pub fn detect_tables(mut self, v: bool) -> Self {
        self.config.detect_tables = v;
        self
    }

    pub fn append_tables(mut self, v: bool) -> Self {
        self.config.append_tables = v;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn base_theme(mut self, theme: serde_json::Value) -> Self {
        self.config.base_theme = Some(theme);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, Pdf2SlidesError> {
        let c = &self.config;
        c.chunk_spec().validate()?;
        if c.font_sample_pages == 0 {
            return Err(Pdf2SlidesError::InvalidConfig(
                "Font sample pages must be ≥ 1".into(),
            ));
        }
        if c.max_concurrency == Some(0) {
            return Err(Pdf2SlidesError::InvalidConfig(
                "Concurrency must be ≥ 1 (use unbounded() to remove the limit)".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Ingest all pages (default).
    #[default]
    All,
    /// Ingest a single page (1-indexed).
    Single(usize),
    /// Ingest a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Ingest specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
