//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::IngestConfigBuilder::progress_callback`] to receive
//! events as the runner drives each work item through its stages.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2slides::{IngestConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, ordinal: usize, total: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("slide {} done ({}/{})", ordinal + 1, done, total);
//!     }
//! }
//!
//! let config = IngestConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline runner as it processes each work item.
///
/// Items run concurrently, so every method except `on_run_start` and
/// `on_run_complete` may be called from several tasks at once. All methods
/// have default no-op implementations.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before any item starts.
    fn on_run_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called when an item acquires its slot and its first stage begins.
    fn on_item_start(&self, ordinal: usize, total_items: usize) {
        let _ = (ordinal, total_items);
    }

    /// Called after each stage that actually ran (skipped stages are silent).
    fn on_stage_complete(&self, ordinal: usize, stage: &str) {
        let _ = (ordinal, stage);
    }

    /// Called when every stage of an item succeeded.
    fn on_item_complete(&self, ordinal: usize, total_items: usize) {
        let _ = (ordinal, total_items);
    }

    /// Called when an item failed or was cancelled.
    fn on_item_error(&self, ordinal: usize, total_items: usize, error: String) {
        let _ = (ordinal, total_items, error);
    }

    /// Called once after every item has a result.
    fn on_run_complete(&self, total_items: usize, success_count: usize) {
        let _ = (total_items, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IngestConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        stages: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_item_start(&self, _ordinal: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _ordinal: usize, _stage: &str) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _ordinal: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _ordinal: usize, _total: usize, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_item_start(0, 3);
        cb.on_stage_complete(0, "theme_layout");
        cb.on_item_complete(0, 3);
        cb.on_item_error(1, 3, "boom".into());
        cb.on_run_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_item_start(0, 2);
        tracker.on_stage_complete(0, "theme_layout");
        tracker.on_stage_complete(0, "slide_html");
        tracker.on_item_complete(0, 2);
        tracker.on_item_start(1, 2);
        tracker.on_item_error(1, 2, "collaborator timeout".into());

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.stages.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
