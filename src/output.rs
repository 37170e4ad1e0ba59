//! Result records returned by [`crate::split`].

use crate::error::SegmentError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Separator pages found by the scan: 0-based page index → marker value.
///
/// The value is the custom postfix carried by the code (`NEXT|Cover` →
/// `"Cover"`), or empty when the page only carries the bare token. A
/// `BTreeMap` keeps the keys sorted no matter in which order concurrent page
/// tasks finished.
pub type MarkerMap = BTreeMap<usize, String>;

/// Everything a split run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitOutput {
    /// Output PDFs that were written, in segment order.
    pub files: Vec<PathBuf>,
    /// Text sidecars that were written.
    pub sidecars: Vec<PathBuf>,
    /// Separator pages that were detected.
    pub markers: MarkerMap,
    /// One entry per planned segment, including failed saves.
    pub segments: Vec<SegmentResult>,
    /// True when no separator was found and the source was passed through.
    pub fallback: bool,
    pub stats: SplitStats,
}

/// Outcome of writing a single segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentResult {
    /// First page of the segment (1-indexed, inclusive).
    pub start_page: usize,
    /// Last page of the segment (1-indexed, inclusive).
    pub end_page: usize,
    pub postfix: String,
    pub path: PathBuf,
    /// Sidecar path, when text extraction was requested and succeeded.
    pub sidecar: Option<PathBuf>,
    /// Set when the segment PDF could not be saved.
    pub error: Option<SegmentError>,
}

impl SegmentResult {
    pub fn is_written(&self) -> bool {
        self.error.is_none()
    }
}

/// Counters and timings for a split run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitStats {
    pub total_pages: usize,
    pub markers_found: usize,
    pub segments_written: usize,
    pub segments_failed: usize,
    pub sidecars_written: usize,
    /// Rewrite plus page scan.
    pub scan_duration_ms: u64,
    /// Segment assembly plus writing.
    pub assemble_duration_ms: u64,
    pub total_duration_ms: u64,
}
