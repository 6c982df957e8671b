//! Progress-callback trait for per-page pipeline events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::VideoConfigBuilder::progress_callback`] to receive events
//! as the pipeline renders, narrates and encodes each page.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2video::{ConversionProgressCallback, VideoConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, clip_secs: f64) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({:.1}s clip)", page_num, total_pages, clip_secs);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = VideoConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// Pages are processed strictly in document order on a single task, so
/// events for two pages never interleave. The trait is still `Send + Sync`
/// because the config that holds it is shared across the blocking render
/// thread. All methods have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page clip is built.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before narration synthesis starts for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page clip has been encoded.
    ///
    /// `clip_secs` is the reconciled clip duration.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, clip_secs: f64) {
        let _ = (page_num, total_pages, clip_secs);
    }

    /// Called when a page is dropped from the video.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once before the page clips are joined into the final video.
    fn on_export_start(&self, clip_count: usize) {
        let _ = clip_count;
    }

    /// Called once after the video has been written.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::VideoConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for RecordingCallback {
        fn on_conversion_start(&self, total_pages: usize) {
            self.events.lock().unwrap().push(format!("start {total_pages}"));
        }

        fn on_page_complete(&self, page_num: usize, _total_pages: usize, clip_secs: f64) {
            self.events
                .lock()
                .unwrap()
                .push(format!("page {page_num} {clip_secs}"));
        }

        fn on_page_error(&self, page_num: usize, _total_pages: usize, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error {page_num} {error}"));
        }

        fn on_export_start(&self, clip_count: usize) {
            self.events.lock().unwrap().push(format!("export {clip_count}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 4.0);
        cb.on_page_error(2, 5, "some error");
        cb.on_export_start(4);
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn recording_callback_sees_events_in_order() {
        let cb = RecordingCallback::default();
        cb.on_conversion_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 4.0);
        cb.on_page_error(2, 2, "encode failed");
        cb.on_export_start(1);

        let events = cb.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start 2", "page 1 4", "error 2 encode failed", "export 1"]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(10);
        cb.on_page_complete(1, 10, 12.5);
    }
}
