//! Top-level split entry points.
//!
//! [`split`] drives the whole pipeline for one source file and returns once
//! every output has been attempted. Only the per-page scan runs concurrently;
//! planning and writing happen on one blocking thread after the scan.

use crate::config::SplitConfig;
use crate::error::SplitError;
use crate::output::{SplitOutput, SplitStats};
use crate::pipeline::write::{self, WriteTarget};
use crate::pipeline::{assemble, document, input, normalize, scan};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Split a PDF at its separator pages.
///
/// # Returns
/// `Ok(SplitOutput)` once every segment has been attempted. Segments that
/// failed to save are listed in `output.segments` with their error and
/// counted in `stats.segments_failed`.
///
/// # Errors
/// Returns `Err(SplitError)` only for fatal errors:
/// - Source missing, unreadable, not a PDF, corrupt or encrypted
/// - Output folder cannot be created
/// - Ghostscript missing or failing (unless `skip_rewrite` is set)
/// - pdfium cannot be loaded
pub async fn split(
    source: impl AsRef<Path>,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    let total_start = Instant::now();
    let source = source.as_ref();
    info!("Processing {} in {} mode", source.display(), config.mode);

    // ── Step 1: Validate input, prepare output folder ───────────────────
    let resolved = input::resolve_input(source, config.output_dir.as_deref())?;
    let prefix = resolved.output_prefix(config.drop_filename);

    // ── Step 2: Bind pdfium ──────────────────────────────────────────────
    let pdfium = tokio::task::spawn_blocking(document::bind_pdfium)
        .await
        .map_err(|e| SplitError::Internal(format!("pdfium binding task panicked: {}", e)))??;
    let pdfium = Arc::new(pdfium);

    // ── Step 3: Rewrite a scanning copy (image modes only) ──────────────
    let scan_start = Instant::now();
    let normalized = if config.needs_rewrite() {
        Some(normalize::normalize(&resolved.path, config).await?)
    } else {
        debug!("Skipping rewrite, scanning the source directly");
        None
    };
    let scan_path = normalized
        .as_ref()
        .map_or(resolved.path.as_path(), |n| n.path());

    // ── Step 4: Scan pages for separators ───────────────────────────────
    let scanned = scan::scan(Arc::clone(&pdfium), scan_path, config).await?;
    let scan_duration_ms = scan_start.elapsed().as_millis() as u64;
    drop(normalized);

    // ── Step 5: Plan and write outputs ───────────────────────────────────
    let assemble_start = Instant::now();
    let markers = scanned.markers.clone();
    let policy = config.policy;
    let extract_text = config.extract_text;
    let callback = config.progress_callback.clone();
    let total_pages = scanned.total_pages;

    let mut output = tokio::task::spawn_blocking(move || -> Result<SplitOutput, SplitError> {
        let plans = assemble::plan_segments(&markers, total_pages, policy);
        let target = WriteTarget {
            output_dir: &resolved.output_dir,
            prefix: &prefix,
            extract_text,
            progress: callback.as_ref(),
        };

        if plans.is_empty() {
            let copy = write::copy_unsplit(&pdfium, &resolved.path, &target)?;
            return Ok(SplitOutput {
                files: vec![copy.path],
                sidecars: copy.sidecar.into_iter().collect(),
                markers,
                fallback: true,
                ..SplitOutput::default()
            });
        }

        info!("Creating {} output PDF(s)", plans.len());
        let segments = write::write_segments(&pdfium, &resolved.path, &plans, &target)?;
        Ok(SplitOutput {
            files: segments
                .iter()
                .filter(|s| s.is_written())
                .map(|s| s.path.clone())
                .collect(),
            sidecars: segments.iter().filter_map(|s| s.sidecar.clone()).collect(),
            markers,
            segments,
            ..SplitOutput::default()
        })
    })
    .await
    .map_err(|e| SplitError::Internal(format!("Output task panicked: {}", e)))??;

    // ── Step 6: Stats ────────────────────────────────────────────────────
    output.stats = SplitStats {
        total_pages,
        markers_found: output.markers.len(),
        segments_written: output.files.len(),
        segments_failed: output.segments.iter().filter(|s| !s.is_written()).count(),
        sidecars_written: output.sidecars.len(),
        scan_duration_ms,
        assemble_duration_ms: assemble_start.elapsed().as_millis() as u64,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Split complete: {} file(s) from {} pages, {} separator(s), {}ms total",
        output.stats.segments_written,
        total_pages,
        output.stats.markers_found,
        output.stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_split_complete(output.stats.segments_written, output.stats.markers_found);
    }

    Ok(output)
}

/// Synchronous wrapper around [`split`].
///
/// Creates a temporary tokio runtime internally.
pub fn split_sync(
    source: impl AsRef<Path>,
    config: &SplitConfig,
) -> Result<SplitOutput, SplitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SplitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(split(source, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_source_is_fatal() {
        let config = SplitConfig::default();
        let err = split("/definitely/not/here.pdf", &config).await.unwrap_err();
        assert!(matches!(err, SplitError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_fatal_without_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("notes.pdf");
        std::fs::write(&src, b"hello world").unwrap();
        let out = dir.path().join("out");

        let config = SplitConfig::builder().output_dir(&out).build().unwrap();
        let err = split_sync(&src, &config).unwrap_err();
        assert!(matches!(err, SplitError::NotAPdf { .. }), "got {err:?}");
        let produced = std::fs::read_dir(&out).map(|d| d.count()).unwrap_or(0);
        assert_eq!(produced, 0);
    }
}
