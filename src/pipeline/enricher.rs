//! Enrichment collaborators: the boundary to the LLM.
//!
//! Stages never talk to a provider directly; they call an [`Enricher`] with
//! a task and a prompt and get text back. [`LlmEnricher`] is the shipped
//! implementation over `edgequake-llm`, and tests swap in their own.
//!
//! ## Retry Strategy
//!
//! Retries happen here and nowhere else. Each attempt is bounded by
//! `api_timeout_secs`; failed attempts back off `retry_backoff_ms * 2^n`,
//! so 500 ms with 3 retries waits 500 ms, 1 s, then 2 s. Waits cap at 60 s.

use crate::config::IngestConfig;
use crate::error::{EnrichError, Pdf2SlidesError};
use crate::prompts::system_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Longest wait between two attempts.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Exponential backoff before retry `attempt` (1-based), capped.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// What a collaborator is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentTask {
    ContentAnalysis,
    ThemeLayout,
    Visualization,
    ImageSearch,
    SlideHtml,
    Narration,
}

impl EnrichmentTask {
    pub const ALL: [EnrichmentTask; 6] = [
        EnrichmentTask::ContentAnalysis,
        EnrichmentTask::ThemeLayout,
        EnrichmentTask::Visualization,
        EnrichmentTask::ImageSearch,
        EnrichmentTask::SlideHtml,
        EnrichmentTask::Narration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrichmentTask::ContentAnalysis => "content_analysis",
            EnrichmentTask::ThemeLayout => "theme_layout",
            EnrichmentTask::Visualization => "visualization",
            EnrichmentTask::ImageSearch => "image_search",
            EnrichmentTask::SlideHtml => "slide_html",
            EnrichmentTask::Narration => "narration",
        }
    }
}

impl fmt::Display for EnrichmentTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collaborator that turns a prompt into text for one task.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, task: EnrichmentTask, input: &str) -> Result<String, EnrichError>;
}

/// [`Enricher`] backed by an `edgequake-llm` provider.
pub struct LlmEnricher {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl fmt::Debug for LlmEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmEnricher")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl LlmEnricher {
    /// Wrap a provider, taking call settings from `config`.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &IngestConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: &IngestConfig) -> Result<Self, Pdf2SlidesError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    async fn enrich(&self, task: EnrichmentTask, input: &str) -> Result<String, EnrichError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(system_prompt(task)),
            ChatMessage::user(input),
        ];
        let options = self.options();
        let mut last_err = EnrichError::Provider {
            retries: 0,
            detail: "no attempt made".to_string(),
        };

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    task, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let call = self.provider.chat(&messages, Some(&options));
            match timeout(Duration::from_secs(self.api_timeout_secs), call).await {
                Ok(Ok(response)) => {
                    debug!(
                        "{}: {} input tokens, {} output tokens, {:?}",
                        task,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    warn!("{}: attempt {} failed: {}", task, attempt + 1, e);
                    last_err = EnrichError::Provider {
                        retries: attempt,
                        detail: e.to_string(),
                    };
                }
                Err(_) => {
                    warn!(
                        "{}: attempt {} timed out after {}s",
                        task,
                        attempt + 1,
                        self.api_timeout_secs
                    );
                    last_err = EnrichError::Timeout {
                        secs: self.api_timeout_secs,
                    };
                }
            }
        }

        Err(last_err)
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2SlidesError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2SlidesError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most specific to least specific:
///
/// 1. the pre-built `config.provider`
/// 2. `config.provider_name` with `config.model`
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. whatever `ProviderFactory::from_env` detects
pub fn resolve_provider(config: &IngestConfig) -> Result<Arc<dyn LLMProvider>, Pdf2SlidesError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2SlidesError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
