//! Output writing: cut planned segments out of the original PDF, write text
//! sidecars, or pass the source through when nothing was found.
//!
//! Everything here is blocking pdfium and file-system work and runs on a
//! single `spawn_blocking` thread. Failures are per artifact: a segment that
//! cannot be saved is recorded and its siblings are still written.

use crate::error::{SegmentError, SplitError};
use crate::output::SegmentResult;
use crate::pipeline::assemble::SegmentPlan;
use crate::pipeline::document;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where and how outputs are written.
pub struct WriteTarget<'a> {
    pub output_dir: &'a Path,
    pub prefix: &'a str,
    pub extract_text: bool,
    pub progress: Option<&'a ProgressCallback>,
}

/// Write every planned segment, copying pages from the original at `source`.
///
/// Only failing to open the original is fatal.
pub fn write_segments(
    pdfium: &Pdfium,
    source: &Path,
    plans: &[SegmentPlan],
    target: &WriteTarget<'_>,
) -> Result<Vec<SegmentResult>, SplitError> {
    let original = document::open_document(pdfium, source)?;
    info!("Pages will be copied from original PDF: {}", source.display());

    let taken: HashSet<&str> = plans.iter().map(|p| p.postfix.as_str()).collect();
    let results = plans
        .iter()
        .enumerate()
        .map(|(i, plan)| {
            let (postfix, path) = segment_destination(plan, i, source, target, &taken);
            let mut result = SegmentResult {
                start_page: plan.start + 1,
                end_page: plan.end,
                postfix,
                path: path.clone(),
                sidecar: None,
                error: None,
            };

            info!(
                "Saving PDF: {} (pages {}-{})",
                path.display(),
                result.start_page,
                result.end_page
            );
            if let Err(e) = save_segment(pdfium, &original, plan, &path) {
                warn!("{}", e);
                result.error = Some(e);
                return result;
            }
            if let Some(cb) = target.progress {
                cb.on_segment_written(&path);
            }

            if target.extract_text {
                result.sidecar = write_sidecar(&original, plan.pages(), &path)
                    .map_err(|e| warn!("{}", e))
                    .ok();
            }
            result
        })
        .collect();

    Ok(results)
}

/// Output postfix and path for the `index`-th planned segment.
///
/// A segment never overwrites the source it is cut from: when the planned
/// name resolves to the source file, `_<position>` is appended until it
/// no longer does and does not clash with another planned postfix.
fn segment_destination(
    plan: &SegmentPlan,
    index: usize,
    source: &Path,
    target: &WriteTarget<'_>,
    taken: &HashSet<&str>,
) -> (String, PathBuf) {
    let mut postfix = plan.postfix.clone();
    let mut path = plan.output_path(target.output_dir, target.prefix);
    while is_same_file(source, &path)
        || (postfix != plan.postfix && taken.contains(postfix.as_str()))
    {
        postfix = format!("{}_{:04}", postfix, index + 1);
        path = target
            .output_dir
            .join(format!("{}{}.pdf", target.prefix, postfix));
    }
    if postfix != plan.postfix {
        warn!(
            "Segment {} would overwrite the source {}, writing it as '{}'",
            index + 1,
            source.display(),
            path.display()
        );
    }
    (postfix, path)
}

fn save_segment(
    pdfium: &Pdfium,
    original: &PdfDocument<'_>,
    plan: &SegmentPlan,
    path: &Path,
) -> Result<(), SegmentError> {
    let failed = |e: PdfiumError| SegmentError::SaveFailed {
        path: path.to_path_buf(),
        detail: format!("{:?}", e),
    };

    let mut segment = pdfium.create_new_pdf().map_err(failed)?;
    debug!(
        "Adding source pages {}-{} to new PDF",
        plan.start + 1,
        plan.end
    );
    segment
        .pages_mut()
        .copy_page_range_from_document(original, plan.start as u16..=(plan.end - 1) as u16, 0)
        .map_err(failed)?;
    segment.save_to_file(path).map_err(failed)
}

/// Sidecar path for an output PDF: same name, `.txt` extension.
pub fn sidecar_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("txt")
}

/// Write one line of extracted text per page of `pages` next to `pdf_path`.
pub fn write_sidecar(
    document: &PdfDocument<'_>,
    pages: std::ops::Range<usize>,
    pdf_path: &Path,
) -> Result<PathBuf, SegmentError> {
    let path = sidecar_path(pdf_path);
    let failed = |detail: String| SegmentError::SidecarFailed {
        path: path.clone(),
        detail,
    };

    let doc_pages = document.pages();
    let mut text = String::new();
    for idx in pages {
        let page = doc_pages
            .get(idx as u16)
            .map_err(|e| failed(format!("page {}: {:?}", idx + 1, e)))?;
        let line = document::page_text_line(&page)
            .map_err(|e| failed(format!("page {}: {:?}", idx + 1, e)))?;
        text.push_str(&line);
        text.push('\n');
    }

    std::fs::write(&path, text).map_err(|e| failed(e.to_string()))?;
    debug!("Wrote text sidecar {}", path.display());
    Ok(path)
}

/// Pass-through result for a document without separators.
#[derive(Debug)]
pub struct FallbackCopy {
    pub path: PathBuf,
    pub sidecar: Option<PathBuf>,
}

/// Copy the unmodified source into the output folder under its own name.
///
/// The source is opened first, so a document pdfium cannot read fails the
/// run instead of being copied. When the output folder is the source's own folder the file is already in
/// place and nothing is copied.
pub fn copy_unsplit(
    pdfium: &Pdfium,
    source: &Path,
    target: &WriteTarget<'_>,
) -> Result<FallbackCopy, SplitError> {
    // A source pdfium cannot read is reported as such, never passed through.
    document::open_document(pdfium, source)?;

    let file_name = source.file_name().unwrap_or(source.as_os_str());
    let dest = target.output_dir.join(file_name);

    if is_same_file(source, &dest) {
        info!("No separators found; source already in output folder, nothing to copy");
    } else {
        info!(
            "No separators found; copying {} to {}",
            source.display(),
            dest.display()
        );
        std::fs::copy(source, &dest).map_err(|e| SegmentError::CopyFailed {
            from: source.to_path_buf(),
            to: dest.clone(),
            detail: e.to_string(),
        })?;
    }
    if let Some(cb) = target.progress {
        cb.on_segment_written(&dest);
    }

    let sidecar = if target.extract_text {
        extract_whole_document(pdfium, &dest)
            .map_err(|e| warn!("{}", e))
            .ok()
    } else {
        None
    };

    Ok(FallbackCopy {
        path: dest,
        sidecar,
    })
}

fn extract_whole_document(pdfium: &Pdfium, pdf_path: &Path) -> Result<PathBuf, SegmentError> {
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| SegmentError::SidecarFailed {
            path: sidecar_path(pdf_path),
            detail: format!("{:?}", e),
        })?;
    let total = document::page_count(&document);
    write_sidecar(&document, 0..total, pdf_path)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_replaces_extension() {
        assert_eq!(
            sidecar_path(Path::new("/out/scan_0001.pdf")),
            PathBuf::from("/out/scan_0001.txt")
        );
    }

    #[test]
    fn same_file_detection() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"%PDF").unwrap();

        let dotted = dir.path().join(".").join("a.pdf");
        assert!(is_same_file(&file, &dotted));
        assert!(!is_same_file(&file, &dir.path().join("b.pdf")));
    }

    #[test]
    fn segment_never_targets_its_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("0001.pdf");
        std::fs::write(&source, b"%PDF").unwrap();
        let target = WriteTarget {
            output_dir: dir.path(),
            prefix: "",
            extract_text: false,
            progress: None,
        };
        let plans = [
            SegmentPlan { start: 0, end: 2, postfix: "0001".into() },
            SegmentPlan { start: 3, end: 5, postfix: "0002".into() },
        ];
        let taken: HashSet<&str> = plans.iter().map(|p| p.postfix.as_str()).collect();

        let (postfix, path) = segment_destination(&plans[0], 0, &source, &target, &taken);
        assert_eq!(postfix, "0001_0001");
        assert_eq!(path, dir.path().join("0001_0001.pdf"));

        let (postfix, path) = segment_destination(&plans[1], 1, &source, &target, &taken);
        assert_eq!(postfix, "0002");
        assert_eq!(path, dir.path().join("0002.pdf"));
    }

    #[test]
    fn renamed_segment_skips_planned_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan_Cover.pdf");
        std::fs::write(&source, b"%PDF").unwrap();
        let target = WriteTarget {
            output_dir: dir.path(),
            prefix: "scan_",
            extract_text: false,
            progress: None,
        };
        let plans = [
            SegmentPlan { start: 0, end: 1, postfix: "Cover".into() },
            SegmentPlan { start: 1, end: 2, postfix: "Cover_0001".into() },
        ];
        let taken: HashSet<&str> = plans.iter().map(|p| p.postfix.as_str()).collect();

        let (postfix, path) = segment_destination(&plans[0], 0, &source, &target, &taken);
        assert_eq!(postfix, "Cover_0001_0001");
        assert_ne!(path, source);
    }
}
