//! Scan coordination: turn a document into a [`MarkerMap`].
//!
//! ## Image modes (QR, barcode)
//!
//! Every page is duplicated into its own single-page PDF first. Each
//! duplicate then goes to an independent `spawn_blocking` task that re-opens
//! it and runs the [`Detector`]; `buffer_unordered(workers)` caps how many
//! tasks run at once. Tasks share no document handle, so a slow or broken
//! page never blocks or corrupts another one.
//!
//! The coordinator waits for every task before building the map. Results
//! arrive in completion order; the `BTreeMap` puts them back in page order.
//!
//! ## Keyword mode
//!
//! Text extraction is cheap, so keyword mode walks the document once on a
//! single blocking thread.

use crate::config::SplitConfig;
use crate::error::{PageError, SplitError};
use crate::output::MarkerMap;
use crate::pipeline::detect::Detector;
use crate::pipeline::document;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a full scan.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub markers: MarkerMap,
    pub total_pages: usize,
    pub failed_pages: Vec<PageError>,
}

/// Scan `scan_path` for separator pages with the mode set in `config`.
pub async fn scan(
    pdfium: Arc<Pdfium>,
    scan_path: &Path,
    config: &SplitConfig,
) -> Result<ScanResult, SplitError> {
    let detector = Arc::new(Detector::from_config(config));
    if detector.mode().is_image_based() {
        scan_images(pdfium, scan_path, detector, config).await
    } else {
        scan_text(pdfium, scan_path, detector, config).await
    }
}

/// Concurrent per-page image scan.
async fn scan_images(
    pdfium: Arc<Pdfium>,
    scan_path: &Path,
    detector: Arc<Detector>,
    config: &SplitConfig,
) -> Result<ScanResult, SplitError> {
    let path = scan_path.to_path_buf();
    let isolating = Arc::clone(&pdfium);
    let isolated = tokio::task::spawn_blocking(move || document::isolate_pages(&isolating, &path))
        .await
        .map_err(|e| SplitError::Internal(format!("Page isolation task panicked: {}", e)))??;

    let total_pages = isolated.len();
    let workers = config.effective_workers();
    info!(
        "Scanning {} pages for {} codes with {} workers",
        total_pages,
        detector.mode(),
        workers
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_scan_start(total_pages);
    }

    let outcomes: Vec<(usize, Result<Option<String>, PageError>)> =
        stream::iter(isolated.into_iter().map(|(idx, page_pdf)| {
            let pdfium = Arc::clone(&pdfium);
            let detector = Arc::clone(&detector);
            let callback = config.progress_callback.clone();
            async move {
                let outcome = match page_pdf {
                    Ok(bytes) => tokio::task::spawn_blocking(move || {
                        detect_isolated(&pdfium, &detector, idx, bytes)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        Err(PageError::TaskFailed {
                            page: idx + 1,
                            detail: e.to_string(),
                        })
                    }),
                    Err(e) => Err(e),
                };
                report(callback.as_ref(), idx, total_pages, &outcome);
                (idx, outcome)
            }
        }))
        .buffer_unordered(workers)
        .collect()
        .await;

    Ok(collect_markers(outcomes, total_pages))
}

/// Detection on one isolated single-page document. Runs on a blocking thread.
fn detect_isolated(
    pdfium: &Pdfium,
    detector: &Detector,
    idx: usize,
    bytes: Vec<u8>,
) -> Result<Option<String>, PageError> {
    let page_num = idx + 1;
    debug!("Analyzing page {}", page_num);

    let failed = |e: PdfiumError| PageError::IsolateFailed {
        page: page_num,
        detail: format!("{:?}", e),
    };
    let single = pdfium.load_pdf_from_byte_vec(bytes, None).map_err(failed)?;
    let page = single.pages().get(0).map_err(failed)?;
    Ok(detector.detect(page_num, &page))
}

/// Single-pass keyword scan over the whole document.
async fn scan_text(
    pdfium: Arc<Pdfium>,
    scan_path: &Path,
    detector: Arc<Detector>,
    config: &SplitConfig,
) -> Result<ScanResult, SplitError> {
    let path: PathBuf = scan_path.to_path_buf();
    let callback = config.progress_callback.clone();

    tokio::task::spawn_blocking(move || {
        let document = document::open_document(&pdfium, &path)?;
        let total_pages = document::page_count(&document);
        info!("Scanning {} pages for keyword", total_pages);
        if let Some(ref cb) = callback {
            cb.on_scan_start(total_pages);
        }

        let outcomes = document
            .pages()
            .iter()
            .enumerate()
            .map(|(idx, page)| {
                let outcome = Ok(detector.detect(idx + 1, &page));
                report(callback.as_ref(), idx, total_pages, &outcome);
                (idx, outcome)
            })
            .collect();

        Ok(collect_markers(outcomes, total_pages))
    })
    .await
    .map_err(|e| SplitError::Internal(format!("Keyword scan task panicked: {}", e)))?
}

fn report(
    callback: Option<&ProgressCallback>,
    idx: usize,
    total_pages: usize,
    outcome: &Result<Option<String>, PageError>,
) {
    if let Err(e) = outcome {
        warn!("{}", e);
    }
    if let Some(cb) = callback {
        match outcome {
            Ok(marker) => cb.on_page_scanned(idx + 1, total_pages, marker.as_deref()),
            Err(e) => cb.on_page_error(idx + 1, total_pages, &e.to_string()),
        }
    }
}

/// Fan-in: keep the pages that produced a marker, in page order.
fn collect_markers(
    outcomes: Vec<(usize, Result<Option<String>, PageError>)>,
    total_pages: usize,
) -> ScanResult {
    let mut result = ScanResult {
        total_pages,
        ..ScanResult::default()
    };
    for (idx, outcome) in outcomes {
        match outcome {
            Ok(Some(value)) => {
                result.markers.insert(idx, value);
            }
            Ok(None) => {}
            Err(e) => result.failed_pages.push(e),
        }
    }
    info!(
        "Analysis completed: {} separators found on {} pages",
        result.markers.len(),
        total_pages
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SplitProgressCallback;
    use std::sync::Mutex;

    /// Records every page event as `(page, total, marker-or-error)`.
    #[derive(Default)]
    struct PageLog {
        scanned: Mutex<Vec<(usize, usize, Option<String>)>>,
        failed: Mutex<Vec<(usize, usize, String)>>,
    }

    impl SplitProgressCallback for PageLog {
        fn on_page_scanned(&self, page_num: usize, total_pages: usize, marker: Option<&str>) {
            self.scanned
                .lock()
                .unwrap()
                .push((page_num, total_pages, marker.map(str::to_string)));
        }

        fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
            self.failed
                .lock()
                .unwrap()
                .push((page_num, total_pages, error.to_string()));
        }
    }

    #[test]
    fn report_forwards_page_outcomes() {
        let log = Arc::new(PageLog::default());
        let callback: ProgressCallback = log.clone();

        report(Some(&callback), 0, 4, &Ok(None));
        report(Some(&callback), 2, 4, &Ok(Some("Cover".into())));
        report(Some(&callback), 3, 4, &Ok(Some(String::new())));
        report(
            Some(&callback),
            1,
            4,
            &Err(PageError::IsolateFailed {
                page: 2,
                detail: "bad xref".into(),
            }),
        );

        // Page numbers are 1-based; an empty postfix is still a marker.
        assert_eq!(
            *log.scanned.lock().unwrap(),
            vec![
                (1, 4, None),
                (3, 4, Some("Cover".to_string())),
                (4, 4, Some(String::new())),
            ]
        );
        let failed = log.failed.lock().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!((failed[0].0, failed[0].1), (2, 4));
        assert!(failed[0].2.contains("bad xref"));
    }

    #[test]
    fn report_without_callback_is_silent() {
        report(None, 0, 1, &Ok(Some("Cover".into())));
        report(
            None,
            0,
            1,
            &Err(PageError::TaskFailed {
                page: 1,
                detail: "panicked".into(),
            }),
        );
    }

    #[test]
    fn collect_is_independent_of_completion_order() {
        let forward: Vec<(usize, Result<Option<String>, PageError>)> = vec![
            (0, Ok(None)),
            (1, Ok(Some("Cover".to_string()))),
            (2, Ok(None)),
            (3, Ok(Some(String::new()))),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let a = collect_markers(forward, 4);
        let b = collect_markers(backward, 4);
        assert_eq!(a.markers, b.markers);
        assert_eq!(a.markers.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(a.markers[&1], "Cover");
        assert_eq!(a.markers[&3], "");
    }

    #[test]
    fn failed_pages_count_as_no_marker() {
        let outcomes = vec![
            (0, Ok(Some(String::new()))),
            (
                1,
                Err(PageError::TaskFailed {
                    page: 2,
                    detail: "panicked".into(),
                }),
            ),
            (2, Ok(None)),
        ];
        let result = collect_markers(outcomes, 3);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.markers.len(), 1);
        assert!(result.markers.contains_key(&0));
        assert_eq!(result.failed_pages.len(), 1);
    }
}
