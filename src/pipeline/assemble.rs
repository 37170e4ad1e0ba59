//! Segment planning: turn sorted separator pages into page ranges and names.
//!
//! Planning is pure: no PDF is touched here. [`super::write`] cuts the
//! planned ranges out of the original document afterwards.

use crate::config::SplitPolicy;
use crate::output::MarkerMap;
use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One output document: a half-open, 0-based page range plus its file postfix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPlan {
    pub start: usize,
    pub end: usize,
    pub postfix: String,
}

impl SegmentPlan {
    pub fn pages(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// `{output_dir}/{prefix}{postfix}.pdf`
    pub fn output_path(&self, output_dir: &Path, prefix: &str) -> PathBuf {
        output_dir.join(format!("{}{}.pdf", prefix, self.postfix))
    }
}

/// Plan the output segments for a document of `page_count` pages.
///
/// Returns nothing when `markers` is empty; the caller then passes the
/// source through unchanged. Marker indices at or beyond `page_count` are
/// ignored.
pub fn plan_segments(markers: &MarkerMap, page_count: usize, policy: SplitPolicy) -> Vec<SegmentPlan> {
    let markers: Vec<(usize, &str)> = markers
        .range(..page_count)
        .map(|(&page, value)| (page, value.as_str()))
        .collect();
    if markers.is_empty() {
        return Vec::new();
    }

    let plans = match policy {
        SplitPolicy::Drop => plan_drop(&markers, page_count),
        SplitPolicy::Sticker => plan_sticker(&markers, page_count),
    };
    dedupe_postfixes(plans)
}

/// Separator pages are discarded; empty gaps are skipped and not numbered.
fn plan_drop(markers: &[(usize, &str)], page_count: usize) -> Vec<SegmentPlan> {
    let boundaries = markers
        .iter()
        .map(|&(page, _)| page)
        .chain(std::iter::once(page_count));

    let mut plans = Vec::with_capacity(markers.len() + 1);
    let mut start = 0;
    for end in boundaries {
        if end > start {
            plans.push(SegmentPlan {
                start,
                end,
                postfix: format!("{:04}", plans.len() + 1),
            });
        } else {
            debug!(
                "Gap before page {} has no pages. Separator on first page, last page or consecutive pages?",
                end + 1
            );
        }
        start = end + 1;
    }
    plans
}

/// Separator pages start a new segment and are kept.
fn plan_sticker(markers: &[(usize, &str)], page_count: usize) -> Vec<SegmentPlan> {
    if let Some(&(first, _)) = markers.first() {
        if first > 0 {
            info!(
                "Pages 1-{} come before the first separator and are not part of any segment",
                first
            );
        }
    }

    markers
        .iter()
        .enumerate()
        .map(|(i, &(start, value))| {
            let end = markers.get(i + 1).map_or(page_count, |&(next, _)| next);
            let postfix = if value.is_empty() {
                format!("{:04}", i + 1)
            } else {
                value.to_string()
            };
            SegmentPlan { start, end, postfix }
        })
        .collect()
}

/// Make every postfix unique by appending the segment's 1-based position.
fn dedupe_postfixes(mut plans: Vec<SegmentPlan>) -> Vec<SegmentPlan> {
    let mut seen = HashSet::with_capacity(plans.len());
    for (i, plan) in plans.iter_mut().enumerate() {
        while !seen.insert(plan.postfix.clone()) {
            let renamed = format!("{}_{:04}", plan.postfix, i + 1);
            debug!("Postfix '{}' already used, renaming to '{}'", plan.postfix, renamed);
            plan.postfix = renamed;
        }
    }
    plans
}
