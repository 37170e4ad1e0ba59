//! Pipeline stages for splitting a scanned PDF at separator pages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalize ──▶ scan ──▶ assemble ──▶ write
//! (checks)   (gs copy)    (detect)  (plan)      (pdfium save)
//! ```
//!
//! 1. [`input`]: validate the source and prepare the output folder
//! 2. [`normalize`]: rewrite a scanning copy through Ghostscript (image modes only)
//! 3. [`scan`]: run the [`detect::Detector`] on every page, concurrently for image modes
//! 4. [`assemble`]: turn the marker map into page ranges and file names
//! 5. [`write`]: cut the ranges out of the original, or copy it through unchanged
//!
//! [`document`] holds the pdfium helpers shared by the stages.

pub mod assemble;
pub mod detect;
pub mod document;
pub mod input;
pub mod normalize;
pub mod scan;
pub mod write;
