//! Page separator detection: decide whether a page marks a split point.
//!
//! One [`Detector`] serves all three [`DetectionMode`]s. QR and barcode modes
//! decode the raster images embedded in the page with `rxing`; keyword mode
//! looks for the token in the page's text layer.
//!
//! ## Payload format
//!
//! A separator code carries the token, optionally followed by `|` and a
//! custom postfix for the output file name. With token `NEXT`:
//!
//! - `NEXT` is a marker without postfix
//! - `NEXT|Cover` is a marker with postfix `Cover`
//! - `NEXT|` is a marker without postfix
//! - `NEXTPAGE` and `INVOICE|NEXT` are ignored

use crate::config::{DetectionMode, SplitConfig};
use crate::error::PageError;
use image::DynamicImage;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use rxing::{BarcodeFormat, DecodeHintType, DecodeHintValue, DecodingHintDictionary};
use tracing::{debug, info, warn};

/// Decides, page by page, whether a page is a separator.
#[derive(Debug, Clone)]
pub struct Detector {
    mode: DetectionMode,
    token: String,
    area_factor: f32,
}

impl Detector {
    pub fn new(mode: DetectionMode, token: impl Into<String>, area_factor: f32) -> Self {
        Self {
            mode,
            token: token.into(),
            area_factor: area_factor.clamp(f32::MIN_POSITIVE, 1.0),
        }
    }

    pub fn from_config(config: &SplitConfig) -> Self {
        Self::new(config.mode, config.separator.clone(), config.area_factor)
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    /// Inspect one page. Returns the marker value when the page is a separator.
    ///
    /// `page_num` is 1-indexed and only used for logging. Failures on a single
    /// image are logged and skipped; they never fail the page.
    pub fn detect(&self, page_num: usize, page: &PdfPage<'_>) -> Option<String> {
        match self.mode {
            DetectionMode::Qr | DetectionMode::Barcode => self.detect_in_images(page_num, page),
            DetectionMode::Keyword => match page.text() {
                Ok(text) => self.detect_in_text(&text.all()),
                Err(e) => {
                    warn!("Page {}: text extraction failed: {:?}", page_num, e);
                    None
                }
            },
        }
    }

    fn detect_in_images(&self, page_num: usize, page: &PdfPage<'_>) -> Option<String> {
        let objects = page.objects();
        let images = objects
            .iter()
            .filter_map(|object| object.as_image_object().map(|img| img.get_raw_image()));

        for (i, raw) in images.enumerate() {
            let image_num = i + 1;
            let image = match raw {
                Ok(image) => image,
                Err(e) => {
                    let err = PageError::ImageExtractFailed {
                        page: page_num,
                        image: image_num,
                        detail: format!("{:?}", e),
                    };
                    debug!("{}", err);
                    continue;
                }
            };

            debug!(
                "Page {}: decoding image {} ({}x{})",
                page_num,
                image_num,
                image.width(),
                image.height()
            );

            let Some(payload) = decode_image(&image, self.mode, self.area_factor) else {
                continue;
            };

            info!(
                "Code containing \"{}\" found on page {}",
                payload, page_num
            );
            match parse_payload(&payload, &self.token) {
                Some(value) => return Some(sanitize_postfix(&value)),
                None => info!(
                    "Ignored: \"{}\" on page {} does not start with separator \"{}\"",
                    payload, page_num, self.token
                ),
            }
        }
        None
    }

    /// Keyword check on already extracted text.
    pub fn detect_in_text(&self, text: &str) -> Option<String> {
        text.contains(self.token.as_str()).then(String::new)
    }
}

/// Decode the first barcode found in the top-left `area_factor` of `image`.
///
/// QR mode restricts the decoder to QR codes; barcode mode lets rxing try
/// every symbology it supports. Returns `None` when nothing decodes.
pub fn decode_image(image: &DynamicImage, mode: DetectionMode, area_factor: f32) -> Option<String> {
    let (width, height) = crop_size(image.width(), image.height(), area_factor);
    if width == 0 || height == 0 {
        return None;
    }

    let luma = if width == image.width() && height == image.height() {
        image.to_luma8()
    } else {
        image.crop_imm(0, 0, width, height).to_luma8()
    };

    let format = match mode {
        DetectionMode::Qr => Some(BarcodeFormat::QR_CODE),
        _ => None,
    };

    // `helpers::detect_in_luma` forwards width and height swapped, which
    // breaks every non-square buffer. The `_with_hints` variant takes them
    // in order.
    let (w, h) = luma.dimensions();
    let mut hints = DecodingHintDictionary::new();
    hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
    match rxing::helpers::detect_in_luma_with_hints(luma.into_raw(), w, h, format, &mut hints) {
        Ok(result) => Some(result.getText().to_string()),
        Err(e) => {
            debug!("No code decoded: {}", e);
            None
        }
    }
}

/// Size of the top-left crop for `factor` ∈ (0, 1].
fn crop_size(width: u32, height: u32, factor: f32) -> (u32, u32) {
    if factor >= 1.0 {
        return (width, height);
    }
    let scale = |v: u32| ((v as f32 * factor).round() as u32).clamp(1.min(v), v);
    (scale(width), scale(height))
}

/// Split a payload once on `|` and match its left part against `token`.
///
/// Returns the custom postfix (possibly empty) on a match, `None` otherwise.
pub fn parse_payload(payload: &str, token: &str) -> Option<String> {
    match payload.split_once('|') {
        Some((left, right)) if left == token => Some(right.to_string()),
        Some(_) => None,
        None if payload == token => Some(String::new()),
        None => None,
    }
}

static RE_UNSAFE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).unwrap());

/// Make a custom postfix safe to use inside a file name.
pub fn sanitize_postfix(postfix: &str) -> String {
    let cleaned = RE_UNSAFE_FILENAME.replace_all(postfix.trim(), "_");
    match cleaned.as_ref() {
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use rxing::Writer;

    /// Render `contents` as a black-on-white QR code `size` pixels wide,
    /// placed at the top-left of a white `width` x `height` canvas.
    fn qr_image(contents: &str, size: u32, width: u32, height: u32) -> DynamicImage {
        let matrix = rxing::MultiFormatWriter::default()
            .encode(contents, &BarcodeFormat::QR_CODE, size as i32, size as i32)
            .expect("encode QR");
        let mut img = GrayImage::from_pixel(width, height, Luma([255u8]));
        for y in 0..matrix.getHeight().min(height) {
            for x in 0..matrix.getWidth().min(width) {
                if matrix.get(x, y) {
                    img.put_pixel(x, y, Luma([0u8]));
                }
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn payload_bare_token() {
        assert_eq!(parse_payload("NEXT", "NEXT"), Some(String::new()));
    }

    #[test]
    fn payload_with_postfix() {
        assert_eq!(parse_payload("NEXT|Cover", "NEXT"), Some("Cover".into()));
        assert_eq!(parse_payload("NEXT|", "NEXT"), Some(String::new()));
        // Only the first '|' splits.
        assert_eq!(parse_payload("NEXT|a|b", "NEXT"), Some("a|b".into()));
    }

    #[test]
    fn payload_mismatch_is_ignored() {
        assert_eq!(parse_payload("NEXTPAGE", "NEXT"), None);
        assert_eq!(parse_payload("next", "NEXT"), None);
        assert_eq!(parse_payload("INVOICE|NEXT", "NEXT"), None);
        assert_eq!(parse_payload("", "NEXT"), None);
    }

    #[test]
    fn sanitize_replaces_path_characters() {
        assert_eq!(sanitize_postfix("Cover"), "Cover");
        assert_eq!(sanitize_postfix(" Letter Miller "), "Letter Miller");
        assert_eq!(sanitize_postfix("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_postfix("a|b"), "a_b");
        assert_eq!(sanitize_postfix(".."), "__");
        assert_eq!(sanitize_postfix(""), "");
    }

    #[test]
    fn crop_size_scales_from_top_left() {
        assert_eq!(crop_size(1000, 800, 1.0), (1000, 800));
        assert_eq!(crop_size(1000, 800, 0.5), (500, 400));
        assert_eq!(crop_size(1000, 800, 0.25), (250, 200));
        assert_eq!(crop_size(3, 3, 0.01), (1, 1));
        assert_eq!(crop_size(0, 0, 0.5), (0, 0));
    }

    #[test]
    fn keyword_is_substring_match() {
        let d = Detector::new(DetectionMode::Keyword, "SEPARATOR", 1.0);
        assert_eq!(
            d.detect_in_text("--- SEPARATOR SHEET ---"),
            Some(String::new())
        );
        assert_eq!(d.detect_in_text("separator"), None);
        assert_eq!(d.detect_in_text(""), None);
    }

    #[test]
    fn decodes_qr_code() {
        let img = qr_image("NEXT|Cover", 200, 200, 200);
        assert_eq!(
            decode_image(&img, DetectionMode::Qr, 1.0).as_deref(),
            Some("NEXT|Cover")
        );
        assert_eq!(
            decode_image(&img, DetectionMode::Barcode, 1.0).as_deref(),
            Some("NEXT|Cover")
        );
    }

    #[test]
    fn area_factor_limits_search_to_top_left() {
        // Code occupies the top-left quarter of an 800 px canvas.
        let img = qr_image("NEXT", 200, 800, 800);
        assert_eq!(
            decode_image(&img, DetectionMode::Qr, 0.5).as_deref(),
            Some("NEXT")
        );

        // Same code moved to the bottom-right corner is outside the crop.
        let mut shifted = GrayImage::from_pixel(800, 800, Luma([255u8]));
        image::imageops::overlay(&mut shifted, &img.crop_imm(0, 0, 200, 200).to_luma8(), 600, 600);
        let shifted = DynamicImage::ImageLuma8(shifted);
        assert_eq!(decode_image(&shifted, DetectionMode::Qr, 0.5), None);
        assert_eq!(
            decode_image(&shifted, DetectionMode::Qr, 1.0).as_deref(),
            Some("NEXT")
        );
    }

    #[test]
    fn decodes_on_non_square_canvases() {
        // Portrait, landscape and an A4 scan at 100 dpi.
        for (w, h) in [(400, 600), (600, 400), (827, 1169)] {
            let img = qr_image("NEXT", 300, w, h);
            for mode in [DetectionMode::Qr, DetectionMode::Barcode] {
                assert_eq!(
                    decode_image(&img, mode, 1.0).as_deref(),
                    Some("NEXT"),
                    "{w}x{h} in {mode} mode"
                );
            }
        }
    }

    #[test]
    fn area_factor_on_page_shaped_scan() {
        // A4 at 150 dpi with the sticker in the top-left corner.
        let img = qr_image("NEXT|Cover", 300, 1240, 1754);
        for factor in [0.25, 0.5, 0.75] {
            assert_eq!(
                decode_image(&img, DetectionMode::Qr, factor).as_deref(),
                Some("NEXT|Cover"),
                "area factor {factor}"
            );
        }

        let mut bottom = GrayImage::from_pixel(1240, 1754, Luma([255u8]));
        image::imageops::overlay(&mut bottom, &img.crop_imm(0, 0, 300, 300).to_luma8(), 900, 1400);
        let bottom = DynamicImage::ImageLuma8(bottom);
        assert_eq!(decode_image(&bottom, DetectionMode::Qr, 0.5), None);
        assert_eq!(
            decode_image(&bottom, DetectionMode::Barcode, 1.0).as_deref(),
            Some("NEXT|Cover")
        );
    }

    #[test]
    fn blank_image_decodes_nothing() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([255u8])));
        assert_eq!(decode_image(&img, DetectionMode::Barcode, 1.0), None);
    }
}
