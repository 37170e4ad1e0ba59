//! # pdfsplit
//!
//! Split scanned PDF batches into separate documents at separator pages.
//!
//! A separator page carries a QR code or barcode whose payload starts with a
//! token (default `NEXT`), or, in keyword mode, the token in its text layer.
//! A code payload may add a file name postfix after a `|`: `NEXT|Cover`
//! writes the following segment to `<source>_Cover.pdf`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      validate source, create output folder
//!  ├─ 2. Normalize  Ghostscript rewrite of a scanning copy (image modes)
//!  ├─ 3. Scan       per-page detection, concurrent (spawn_blocking)
//!  ├─ 4. Assemble   marker map → page ranges + file names
//!  └─ 5. Write      segments cut from the original, or pass-through copy
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfsplit::{split, DetectionMode, SplitConfig, SplitPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SplitConfig::builder()
//!         .mode(DetectionMode::Qr)
//!         .policy(SplitPolicy::Sticker)
//!         .extract_text(true)
//!         .build()?;
//!     let output = split("scans/batch.pdf", &config).await?;
//!     for path in &output.files {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Split policies
//!
//! | Policy | Separator page | Segment |
//! |--------|----------------|---------|
//! | [`SplitPolicy::Drop`] | discarded | pages between two separators |
//! | [`SplitPolicy::Sticker`] | kept | starts at a separator, runs to the next one |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfsplit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfsplit = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod split;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DetectionMode, SplitConfig, SplitConfigBuilder, SplitPolicy};
pub use error::{PageError, SegmentError, SplitError};
pub use output::{MarkerMap, SegmentResult, SplitOutput, SplitStats};
pub use pipeline::assemble::{plan_segments, SegmentPlan};
pub use pipeline::detect::parse_payload;
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use split::{split, split_sync};
