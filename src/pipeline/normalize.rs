//! Normalizer: rewrite a scanning copy of the source through Ghostscript.
//!
//! Scanner software produces PDFs of every quality. Rewriting with
//! `pdfwrite` repairs broken xref tables and re-encodes exotic image filters
//! into something pdfium can hand back as a bitmap. `-dFILTERTEXT` and
//! `-dFILTERVECTOR` drop the text and vector layers, leaving only the raster
//! images the barcode decoder looks at.
//!
//! The rewritten copy is only ever scanned. Output segments are always cut
//! from the original file.

use crate::config::SplitConfig;
use crate::error::SplitError;
use crate::pipeline::input::has_pdf_magic;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

/// Lines of rewrite-tool stderr kept in [`SplitError::RewriteFailed`].
const STDERR_TAIL_LINES: usize = 20;

/// A rewritten scanning copy living in a temporary directory.
///
/// The `TempDir` is kept alive alongside the path; dropping this value
/// deletes the copy, whether the run succeeded or not.
#[derive(Debug)]
pub struct NormalizedInput {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl NormalizedInput {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Rewrite `source` into a temporary scanning copy.
///
/// Any failure of the rewrite tool is fatal: a missing executable, a
/// non-zero exit status, or an output file that is not a PDF.
pub async fn normalize(source: &Path, config: &SplitConfig) -> Result<NormalizedInput, SplitError> {
    let start = Instant::now();
    let temp_dir = TempDir::new()
        .map_err(|e| SplitError::Internal(format!("Failed to create temp dir: {}", e)))?;
    let target = temp_dir.path().join("normalized.pdf");

    let args = rewrite_args(source, &target, config.quiet_rewrite);
    info!("Rewriting PDF with {}", config.rewrite_command);
    debug!("Rewrite command: {} {:?}", config.rewrite_command, args);

    let output = Command::new(&config.rewrite_command)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SplitError::RewriteToolMissing {
                    command: config.rewrite_command.clone(),
                }
            } else {
                SplitError::Internal(format!(
                    "Failed to run '{}': {}",
                    config.rewrite_command, e
                ))
            }
        })?;

    if !output.status.success() {
        let code = output.status.code();
        return Err(SplitError::RewriteFailed {
            path: source.to_path_buf(),
            code,
            reason: describe_exit(code),
            stderr: stderr_tail(&output.stderr),
        });
    }

    if !has_pdf_magic(&target) {
        return Err(SplitError::RewriteOutputInvalid {
            path: target,
            detail: "missing or not starting with %PDF".into(),
        });
    }

    info!("Rewrite finished in {}ms", start.elapsed().as_millis());
    Ok(NormalizedInput {
        path: target,
        _temp_dir: temp_dir,
    })
}

/// Ghostscript argument list.
///
/// Relative sources are anchored at `./` so a file name starting with `-`
/// is never read as an option.
fn rewrite_args(source: &Path, target: &Path, quiet: bool) -> Vec<OsString> {
    let source = if source.is_relative() {
        Path::new(".").join(source)
    } else {
        source.to_path_buf()
    };

    let mut args: Vec<OsString> = vec!["-o".into(), target.as_os_str().to_owned()];
    if quiet {
        args.push("-q".into());
    }
    args.extend(
        [
            "-sDEVICE=pdfwrite",
            "-dPDFSETTINGS=/prepress",
            "-dFILTERTEXT",
            "-dFILTERVECTOR",
        ]
        .map(OsString::from),
    );
    args.push(source.into_os_string());
    args
}

/// Ghostscript exit-status taxonomy.
fn describe_exit(code: Option<i32>) -> &'static str {
    match code {
        Some(1) => "unrecoverable error, the input is damaged or not a PDF",
        Some(255) => "interpreter could not be initialised",
        Some(_) => "unexpected exit status",
        None => "terminated by a signal",
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let skip = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[skip..].join("\n")
}
