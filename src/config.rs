//! Configuration types for a split run.
//!
//! Every job parameter lives in [`SplitConfig`], built via its
//! [`SplitConfigBuilder`]. The front end that queues jobs fills one config per
//! source file and hands it to [`crate::split`]; nothing is read from global
//! state.

use crate::error::SplitError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default separator token.
pub const DEFAULT_SEPARATOR: &str = "NEXT";

/// Default rewrite tool executable.
pub const DEFAULT_REWRITE_COMMAND: &str = "gs";

/// Configuration for a single split run.
///
/// Built via [`SplitConfig::builder()`] or using [`SplitConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfsplit::{DetectionMode, SplitConfig, SplitPolicy};
///
/// let config = SplitConfig::builder()
///     .separator("NEXT")
///     .mode(DetectionMode::Qr)
///     .policy(SplitPolicy::Sticker)
///     .workers(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// Token a barcode payload (left of `|`) or page text must carry. Default: `NEXT`.
    pub separator: String,

    /// How separator pages are detected. Default: [`DetectionMode::Qr`].
    pub mode: DetectionMode,

    /// What happens to separator pages. Default: [`SplitPolicy::Drop`].
    pub policy: SplitPolicy,

    /// Omit the source file name from output file names. Default: false.
    pub drop_filename: bool,

    /// Number of concurrent page-scan workers. `0` means
    /// `max(1, available_parallelism - 1)`. Default: 0.
    pub workers: usize,

    /// Scan the original file directly instead of a Ghostscript-rewritten
    /// copy. Default: false.
    pub skip_rewrite: bool,

    /// Fraction of each embedded image, measured from its top-left corner,
    /// that is handed to the barcode decoder. Range: (0, 1]. Default: 1.0.
    ///
    /// Separator sheets usually carry the code in a fixed corner; decoding a
    /// quarter of a 300-DPI scan is several times faster than the full page.
    pub area_factor: f32,

    /// Write a `.txt` sidecar with the extracted text next to every output. Default: false.
    pub extract_text: bool,

    /// Where outputs are written. `None` means the source file's folder.
    pub output_dir: Option<PathBuf>,

    /// Executable used to rewrite the scanning copy. Default: `gs`.
    pub rewrite_command: String,

    /// Pass `-q` to the rewrite tool. Default: true.
    pub quiet_rewrite: bool,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            mode: DetectionMode::default(),
            policy: SplitPolicy::default(),
            drop_filename: false,
            workers: 0,
            skip_rewrite: false,
            area_factor: 1.0,
            extract_text: false,
            output_dir: None,
            rewrite_command: DEFAULT_REWRITE_COMMAND.to_string(),
            quiet_rewrite: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("separator", &self.separator)
            .field("mode", &self.mode)
            .field("policy", &self.policy)
            .field("drop_filename", &self.drop_filename)
            .field("workers", &self.workers)
            .field("skip_rewrite", &self.skip_rewrite)
            .field("area_factor", &self.area_factor)
            .field("extract_text", &self.extract_text)
            .field("output_dir", &self.output_dir)
            .field("rewrite_command", &self.rewrite_command)
            .field("quiet_rewrite", &self.quiet_rewrite)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SplitProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }

    /// Worker count actually used by the scan coordinator.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }

    /// Whether the Ghostscript rewrite runs for this job.
    ///
    /// Keyword detection reads the text layer, which the rewrite would strip,
    /// so it always scans the original.
    pub fn needs_rewrite(&self) -> bool {
        !self.skip_rewrite && self.mode.is_image_based()
    }
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn separator(mut self, token: impl Into<String>) -> Self {
        self.config.separator = token.into();
        self
    }

    pub fn mode(mut self, mode: DetectionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn policy(mut self, policy: SplitPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn drop_filename(mut self, v: bool) -> Self {
        self.config.drop_filename = v;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn skip_rewrite(mut self, v: bool) -> Self {
        self.config.skip_rewrite = v;
        self
    }

    pub fn area_factor(mut self, factor: f32) -> Self {
        self.config.area_factor = factor;
        self
    }

    pub fn extract_text(mut self, v: bool) -> Self {
        self.config.extract_text = v;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn rewrite_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.rewrite_command = cmd.into();
        self
    }

    pub fn quiet_rewrite(mut self, v: bool) -> Self {
        self.config.quiet_rewrite = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, SplitError> {
        let c = &self.config;
        if c.separator.is_empty() {
            return Err(SplitError::InvalidConfig(
                "Separator token must not be empty".into(),
            ));
        }
        if c.mode.is_image_based() && c.separator.contains('|') {
            return Err(SplitError::InvalidConfig(format!(
                "Separator '{}' must not contain '|': it delimits the custom postfix",
                c.separator
            )));
        }
        if !(c.area_factor > 0.0 && c.area_factor <= 1.0) {
            return Err(SplitError::InvalidConfig(format!(
                "Area factor must be in (0, 1], got {}",
                c.area_factor
            )));
        }
        if c.rewrite_command.trim().is_empty() {
            return Err(SplitError::InvalidConfig(
                "Rewrite command must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How separator pages are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// QR codes in embedded page images. (default)
    #[default]
    Qr,
    /// Any barcode symbology rxing can read (QR, Code 128, EAN, Data Matrix, …).
    Barcode,
    /// Substring match on the page's extractable text.
    Keyword,
}

impl DetectionMode {
    /// QR and barcode modes look at raster images; keyword mode at text.
    pub fn is_image_based(self) -> bool {
        matches!(self, DetectionMode::Qr | DetectionMode::Barcode)
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectionMode::Qr => "QR",
            DetectionMode::Barcode => "BARCODE",
            DetectionMode::Keyword => "KEYWORD",
        })
    }
}

/// What happens to pages that carry a separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitPolicy {
    /// Separator sheets are discarded; segments are the pages between them. (default)
    #[default]
    Drop,
    /// Separator pages are kept and start a new segment ("sticker mode").
    Sticker,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let c = SplitConfig::default();
        assert_eq!(c.separator, "NEXT");
        assert_eq!(c.mode, DetectionMode::Qr);
        assert_eq!(c.policy, SplitPolicy::Drop);
        assert_eq!(c.area_factor, 1.0);
        assert_eq!(c.workers, 0);
        assert!(!c.extract_text);
        assert!(c.output_dir.is_none());
    }

    #[test]
    fn effective_workers_is_at_least_one() {
        let c = SplitConfig::default();
        assert!(c.effective_workers() >= 1);

        let c = SplitConfig::builder().workers(7).build().unwrap();
        assert_eq!(c.effective_workers(), 7);
    }

    #[test]
    fn keyword_mode_never_rewrites() {
        let c = SplitConfig::builder()
            .mode(DetectionMode::Keyword)
            .build()
            .unwrap();
        assert!(!c.needs_rewrite());

        let c = SplitConfig::builder().mode(DetectionMode::Barcode).build().unwrap();
        assert!(c.needs_rewrite());

        let c = SplitConfig::builder().skip_rewrite(true).build().unwrap();
        assert!(!c.needs_rewrite());
    }

    #[test]
    fn rejects_out_of_range_area_factor() {
        for bad in [0.0_f32, -0.5, 1.01, f32::NAN] {
            let err = SplitConfig::builder().area_factor(bad).build();
            assert!(err.is_err(), "area factor {bad} should be rejected");
        }
        assert!(SplitConfig::builder().area_factor(0.25).build().is_ok());
    }

    #[test]
    fn rejects_empty_or_piped_separator() {
        assert!(SplitConfig::builder().separator("").build().is_err());
        assert!(SplitConfig::builder().separator("NEXT|X").build().is_err());
        // Keyword mode matches raw text, where '|' is an ordinary character.
        assert!(SplitConfig::builder()
            .mode(DetectionMode::Keyword)
            .separator("A|B")
            .build()
            .is_ok());
    }

    #[test]
    fn mode_display_is_upper_case() {
        assert_eq!(DetectionMode::Qr.to_string(), "QR");
        assert_eq!(DetectionMode::Barcode.to_string(), "BARCODE");
        assert_eq!(DetectionMode::Keyword.to_string(), "KEYWORD");
    }
}
