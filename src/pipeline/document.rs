//! PDFium plumbing: binding the library, opening documents, duplicating pages.
//!
//! pdfium is a blocking C++ library. Every function here must run inside
//! `tokio::task::spawn_blocking`; the async entry points in [`crate::split`]
//! and [`super::scan`] take care of that.

use crate::error::{PageError, SplitError};
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming an explicit libpdfium to load.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium library.
///
/// Resolution order: `PDFIUM_LIB_PATH`, a library in the current directory,
/// then the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, SplitError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(path) if !path.is_empty() => {
            debug!("Binding pdfium from {}={}", PDFIUM_LIB_PATH_ENV, path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| SplitError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Open a PDF, mapping pdfium's error into a fatal [`SplitError`].
pub fn open_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, SplitError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| map_load_error(path, e))
}

fn map_load_error(path: &Path, e: PdfiumError) -> SplitError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        SplitError::PasswordRequired {
            path: path.to_path_buf(),
        }
    } else {
        SplitError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

/// Page count as `usize`.
pub fn page_count(document: &PdfDocument<'_>) -> usize {
    document.pages().len() as usize
}

/// Duplicate every page of `path` into its own single-page PDF.
///
/// Each buffer is a complete, independent document, so page tasks can
/// re-open their page without touching the source document or each other.
/// A page that fails to duplicate yields an `Err` for that page only.
pub fn isolate_pages(
    pdfium: &Pdfium,
    path: &Path,
) -> Result<Vec<(usize, Result<Vec<u8>, PageError>)>, SplitError> {
    let source = open_document(pdfium, path)?;
    let total = page_count(&source);
    info!("Scanning copy loaded: {} pages", total);

    let isolated = (0..total)
        .map(|idx| (idx, isolate_page(pdfium, &source, idx)))
        .collect();
    Ok(isolated)
}

fn isolate_page(
    pdfium: &Pdfium,
    source: &PdfDocument<'_>,
    idx: usize,
) -> Result<Vec<u8>, PageError> {
    let failed = |e: PdfiumError| PageError::IsolateFailed {
        page: idx + 1,
        detail: format!("{:?}", e),
    };

    let mut single = pdfium.create_new_pdf().map_err(failed)?;
    single
        .pages_mut()
        .copy_page_from_document(source, idx as u16, 0)
        .map_err(failed)?;
    single.save_to_bytes().map_err(failed)
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Extracted text of a page collapsed onto a single line.
pub fn page_text_line(page: &PdfPage<'_>) -> Result<String, PdfiumError> {
    let text = page.text()?.all();
    Ok(collapse_whitespace(&text))
}

fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
