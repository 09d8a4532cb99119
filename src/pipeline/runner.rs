//! Concurrent pipeline runner.
//!
//! Every work item gets its own tokio task that runs the stage list in
//! order, handing each stage the outputs of the stages before it. Items run
//! concurrently, at most `bound` at a time when a bound is set.
//!
//! ```text
//! items ──▶ spawn per item ──▶ [permit] ──▶ stage 1 ─▶ stage 2 ─▶ … ──▶ ItemResult
//!                                               (skip when !applies_to)
//! join handles in input order ──▶ Vec<ItemResult>  (result i is item i)
//! ```
//!
//! A failing stage ends its own item only. Nothing is retried here; retries
//! belong to the collaborator behind the stage.

use crate::error::ItemError;
use crate::progress::ProgressCallback;
use crate::slide::SlideSpec;
use crate::structured::Extracted;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// One unit of work: a slide and its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub ordinal: usize,
    pub spec: SlideSpec,
}

impl WorkItem {
    pub fn new(ordinal: usize, spec: SlideSpec) -> Self {
        Self { ordinal, spec }
    }

    /// Number the specs 0, 1, 2, … in the given order.
    pub fn from_specs(specs: Vec<SlideSpec>) -> Vec<WorkItem> {
        specs
            .into_iter()
            .enumerate()
            .map(|(ordinal, spec)| WorkItem { ordinal, spec })
            .collect()
    }
}

/// Outputs of the stages that ran so far for one item, in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageOutputs {
    entries: Vec<(String, Extracted)>,
    skipped: Vec<String>,
}

impl StageOutputs {
    pub fn get(&self, stage: &str) -> Option<&Extracted> {
        self.entries
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, out)| out)
    }

    /// Output of `stage`, or `MissingInput` on behalf of `requester`.
    pub fn require(
        &self,
        stage: &str,
        ordinal: usize,
        requester: &str,
    ) -> Result<&Extracted, ItemError> {
        self.get(stage).ok_or_else(|| ItemError::MissingInput {
            ordinal,
            stage: requester.to_string(),
            requires: stage.to_string(),
        })
    }

    pub fn insert(&mut self, stage: impl Into<String>, output: Extracted) {
        let stage = stage.into();
        self.entries.retain(|(name, _)| *name != stage);
        self.entries.push((stage, output));
    }

    pub fn mark_skipped(&mut self, stage: impl Into<String>) {
        self.skipped.push(stage.into());
    }

    pub fn was_skipped(&self, stage: &str) -> bool {
        self.skipped.iter().any(|s| s == stage)
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Names of the stages that produced output, in run order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Extracted)> {
        self.entries.iter().map(|(name, out)| (name.as_str(), out))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One step of the per-item pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Key under which the output is stored.
    fn name(&self) -> &str;

    /// `false` skips the stage for this item.
    fn applies_to(&self, item: &WorkItem) -> bool {
        let _ = item;
        true
    }

    async fn run(&self, item: &WorkItem, prior: &StageOutputs) -> Result<Extracted, ItemError>;
}

/// Outcome for one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub ordinal: usize,
    pub outcome: Result<StageOutputs, ItemError>,
    pub duration_ms: u64,
}

impl ItemResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn outputs(&self) -> Option<&StageOutputs> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ItemError> {
        self.outcome.as_ref().err()
    }

    fn failed(ordinal: usize, error: ItemError, duration_ms: u64) -> Self {
        Self {
            ordinal,
            outcome: Err(error),
            duration_ms,
        }
    }
}

/// Shared cancellation flag.
///
/// Cancelling lets in-flight items finish; items that have not started yet
/// end as [`ItemError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A boxed stream of item results in completion order.
pub type ItemStream = Pin<Box<dyn Stream<Item = ItemResult> + Send>>;

/// Runs a fixed stage list over many items.
#[derive(Clone)]
pub struct Runner {
    stages: Arc<Vec<Arc<dyn Stage>>>,
    bound: Option<usize>,
    progress: Option<ProgressCallback>,
    cancel: CancelHandle,
}

impl Runner {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages: Arc::new(stages),
            bound: None,
            progress: None,
            cancel: CancelHandle::new(),
        }
    }

    /// At most `bound` items in flight. `None` is unbounded.
    pub fn with_bound(mut self, bound: Option<usize>) -> Self {
        self.bound = bound.map(|n| n.max(1));
        self
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every item; result `i` belongs to `items[i]`.
    pub async fn run(&self, items: Vec<WorkItem>) -> Vec<ItemResult> {
        let total = items.len();
        let start = Instant::now();
        info!(
            "Running {} items through {} stages (bound: {:?})",
            total,
            self.stages.len(),
            self.bound
        );
        if let Some(ref cb) = self.progress {
            cb.on_run_start(total);
        }

        let semaphore = self.bound.map(|n| Arc::new(Semaphore::new(n)));
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let ordinal = item.ordinal;
                let semaphore = semaphore.clone();
                let runner = self.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match semaphore {
                        Some(sem) => match sem.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => return ItemResult::failed(ordinal, ItemError::Cancelled { ordinal }, 0),
                        },
                        None => None,
                    };
                    runner.run_item(item, total).await
                });
                (ordinal, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        for (ordinal, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let error = ItemError::TaskPanicked {
                        ordinal,
                        detail: e.to_string(),
                    };
                    warn!("{}", error);
                    if let Some(ref cb) = self.progress {
                        cb.on_item_error(ordinal, total, error.to_string());
                    }
                    ItemResult::failed(ordinal, error, 0)
                }
            };
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        info!(
            "Run complete: {}/{} items succeeded in {}ms",
            succeeded,
            total,
            start.elapsed().as_millis()
        );
        if let Some(ref cb) = self.progress {
            cb.on_run_complete(total, succeeded);
        }
        results
    }

    /// Like [`Runner::run`], but yields each result as soon as it is ready.
    pub fn run_stream(&self, items: Vec<WorkItem>) -> ItemStream {
        let total = items.len();
        let limit = self.bound.unwrap_or(total).max(1);
        let runner = self.clone();

        let s = stream::iter(items.into_iter().map(move |item| {
            let runner = runner.clone();
            async move {
                let ordinal = item.ordinal;
                let progress = runner.progress.clone();
                match tokio::spawn(async move { runner.run_item(item, total).await }).await {
                    Ok(result) => result,
                    Err(e) => {
                        let error = ItemError::TaskPanicked {
                            ordinal,
                            detail: e.to_string(),
                        };
                        if let Some(cb) = progress {
                            cb.on_item_error(ordinal, total, error.to_string());
                        }
                        ItemResult::failed(ordinal, error, 0)
                    }
                }
            }
        }))
        .buffer_unordered(limit);

        Box::pin(s)
    }

    async fn run_item(&self, item: WorkItem, total: usize) -> ItemResult {
        let ordinal = item.ordinal;
        let start = Instant::now();

        if self.cancel.is_cancelled() {
            debug!("Item {} cancelled before start", ordinal);
            let error = ItemError::Cancelled { ordinal };
            if let Some(ref cb) = self.progress {
                cb.on_item_error(ordinal, total, error.to_string());
            }
            return ItemResult::failed(ordinal, error, 0);
        }
        if let Some(ref cb) = self.progress {
            cb.on_item_start(ordinal, total);
        }

        let mut outputs = StageOutputs::default();
        for stage in self.stages.iter() {
            let name = stage.name();
            if !stage.applies_to(&item) {
                debug!("Item {}: skipping stage '{}'", ordinal, name);
                outputs.mark_skipped(name);
                continue;
            }

            match stage.run(&item, &outputs).await {
                Ok(output) => {
                    debug!("Item {}: stage '{}' done", ordinal, name);
                    outputs.insert(name, output);
                    if let Some(ref cb) = self.progress {
                        cb.on_stage_complete(ordinal, name);
                    }
                }
                Err(error) => {
                    warn!("{}", error);
                    if let Some(ref cb) = self.progress {
                        cb.on_item_error(ordinal, total, error.to_string());
                    }
                    return ItemResult::failed(ordinal, error, start.elapsed().as_millis() as u64);
                }
            }
        }

        if let Some(ref cb) = self.progress {
            cb.on_item_complete(ordinal, total);
        }
        ItemResult {
            ordinal,
            outcome: Ok(outputs),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
