//! Input resolution: validate the source file and work out where outputs go.
//!
//! We check the `%PDF` magic bytes before handing the path to Ghostscript or
//! pdfium, so callers get a meaningful error instead of a rewrite-tool exit
//! code or a pdfium parse failure.

use crate::error::SplitError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A validated source file plus the directory its outputs go to.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub output_dir: PathBuf,
}

impl ResolvedInput {
    /// Source file name including extension (`batch.scan.pdf`).
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Prefix put in front of every segment postfix.
    ///
    /// The file name is cut at its first `.` (`batch.scan.pdf` → `batch_`),
    /// or empty when the caller asked to drop the file name.
    pub fn output_prefix(&self, drop_filename: bool) -> String {
        if drop_filename {
            return String::new();
        }
        let name = self.file_name();
        let stem = name.split('.').next().unwrap_or_default();
        format!("{stem}_")
    }
}

/// Validate `source` and resolve the output directory.
///
/// `output_dir` defaults to the folder containing the source. The directory
/// is created when missing.
pub fn resolve_input(source: &Path, output_dir: Option<&Path>) -> Result<ResolvedInput, SplitError> {
    let path = source.to_path_buf();

    if !path.exists() {
        return Err(SplitError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(SplitError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(SplitError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(SplitError::FileNotFound { path });
        }
    }

    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    std::fs::create_dir_all(&output_dir).map_err(|e| SplitError::OutputDirUnavailable {
        path: output_dir.clone(),
        source: e,
    })?;

    debug!(
        "Resolved source {} → output folder {}",
        path.display(),
        output_dir.display()
    );
    Ok(ResolvedInput { path, output_dir })
}

/// Check that `path` starts with the PDF magic bytes.
pub fn has_pdf_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == b"%PDF")
        .unwrap_or(false)
}
