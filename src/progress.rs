//! Progress-callback trait for scan and assembly events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to receive events
//! while the splitter scans pages and writes segments. The library knows
//! nothing about how the host reports progress: a terminal bar, a job-queue
//! window, or a log line are all just implementations of this trait.
//!
//! # Example
//!
//! ```rust
//! use pdfsplit::{SplitConfig, SplitProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct MarkerCounter {
//!     found: AtomicUsize,
//! }
//!
//! impl SplitProgressCallback for MarkerCounter {
//!     fn on_page_scanned(&self, page_num: usize, total_pages: usize, marker: Option<&str>) {
//!         if marker.is_some() {
//!             self.found.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("separator on page {}/{}", page_num, total_pages);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(MarkerCounter { found: AtomicUsize::new(0) });
//!
//! let config = SplitConfig::builder()
//!     .progress_callback(counter as Arc<dyn SplitProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the splitter as it scans pages and writes outputs.
///
/// Implementations must be `Send + Sync`: in QR and barcode modes
/// `on_page_scanned` and `on_page_error` are called from concurrently
/// running page tasks, in completion order rather than page order.
/// All methods have default no-op implementations.
pub trait SplitProgressCallback: Send + Sync {
    /// Called once before the first page is scanned.
    fn on_scan_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page has been scanned.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: pages in the document
    /// * `marker`: `Some(postfix)` when the page is a separator
    ///   (empty string when it carries no custom postfix)
    fn on_page_scanned(&self, page_num: usize, total_pages: usize, marker: Option<&str>) {
        let _ = (page_num, total_pages, marker);
    }

    /// Called when a page could not be scanned. The page counts as "no marker".
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called after each output PDF is saved (including the unsplit fallback copy).
    fn on_segment_written(&self, path: &Path) {
        let _ = path;
    }

    /// Called once after all outputs have been attempted.
    ///
    /// # Arguments
    /// * `files_written`: output PDFs that were saved successfully
    /// * `markers_found`: separator pages detected by the scan
    fn on_split_complete(&self, files_written: usize, markers_found: usize) {
        let _ = (files_written, markers_found);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;
