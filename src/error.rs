//! Error types for the pdfsplit library.
//!
//! Three error types reflect three scopes of failure:
//!
//! * [`SplitError`] is **fatal**: the run cannot proceed at all (source file
//!   missing or corrupt, Ghostscript missing or failing, PDFium not
//!   available). Returned as `Err(SplitError)` from the top-level `split*`
//!   functions. Segments already written before the failure stay on disk.
//!
//! * [`PageError`] is **non-fatal**: a single page could not be scanned (an
//!   embedded image failed to decode, the detection task panicked). The page
//!   simply contributes no marker and the scan carries on.
//!
//! * [`SegmentError`] is **non-fatal**: one output artifact could not be
//!   written. Stored inside [`crate::output::SegmentResult`]; sibling
//!   segments are unaffected.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfsplit library.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password.
    #[error("PDF '{path}' is encrypted and requires a password.")]
    PasswordRequired { path: PathBuf },

    // ── Normalizer errors ─────────────────────────────────────────────────
    /// The rewrite tool could not be started at all.
    #[error(
        "Unable to start rewrite step: '{command}' not found.\n\
Is Ghostscript installed? Use --gs to point at the executable, or --skip-rewrite."
    )]
    RewriteToolMissing { command: String },

    /// The rewrite tool ran but exited with a non-zero status.
    #[error("Rewriting '{path}' failed with exit code {code:?} ({reason})\n{stderr}")]
    RewriteFailed {
        path: PathBuf,
        code: Option<i32>,
        reason: &'static str,
        stderr: String,
    },

    /// The rewrite tool reported success but left no usable PDF behind.
    #[error("Rewrite tool produced no readable PDF at '{path}': {detail}")]
    RewriteOutputInvalid { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Output directory is missing and could not be created.
    #[error("Output folder '{path}' is not usable: {source}")]
    OutputDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The unsplit source could not be passed through to the output folder.
    #[error("No separators found and the source could not be copied: {0}")]
    FallbackFailed(#[from] SegmentError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install libpdfium system-wide (e.g. from bblanchon/pdfium-binaries).\n\
  • Place libpdfium next to the executable's working directory.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error while scanning a single page.
///
/// Page numbers are 1-indexed, the way they are shown to users.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The single-page duplicate could not be created or re-opened.
    #[error("Page {page}: could not isolate page: {detail}")]
    IsolateFailed { page: usize, detail: String },

    /// An embedded image could not be extracted from the page.
    #[error("Page {page}: image {image} could not be extracted: {detail}")]
    ImageExtractFailed {
        page: usize,
        image: usize,
        detail: String,
    },

    /// The detection task died before returning a result.
    #[error("Page {page}: detection task failed: {detail}")]
    TaskFailed { page: usize, detail: String },
}

/// A non-fatal error while writing one output artifact.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SegmentError {
    /// Assembling or saving the segment PDF failed.
    #[error("Saving segment '{path}' failed: {detail}")]
    SaveFailed { path: PathBuf, detail: String },

    /// Extracting text or writing the sidecar failed.
    #[error("Writing text sidecar '{path}' failed: {detail}")]
    SidecarFailed { path: PathBuf, detail: String },

    /// Copying the unsplit source failed.
    #[error("Copying '{from}' to '{to}' failed: {detail}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        detail: String,
    },
}
