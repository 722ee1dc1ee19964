//! Stock-compliance JPEG re-encoding.
//!
//! Stock platforms require previews above a megapixel floor and reject
//! transparency. The re-encoder upscales to a configured long-side target
//! (never downscales), composites onto an opaque white background, and
//! encodes at maximum quality.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use std::io::Cursor;

use super::{Artifact, ExportError};

/// MIME type of re-encoded JPEG artifacts.
pub const JPEG_MIME: &str = "image/jpeg";

/// Default long-side target in pixels. 5000px on the long side comfortably
/// clears the 15 MP floor stock reviewers apply to raster previews.
pub const DEFAULT_TARGET_DIM: u32 = 5000;

const JPEG_QUALITY: u8 = 100;

/// Re-encode an image blob as a stock-compliant JPEG named `<file_stem>.jpg`.
///
/// The long side of the output is `max(target_dim, long side of the source)`:
/// sources already at or above the target are left at their native size.
/// Resampling uses Lanczos3, and alpha is composited over white before
/// encoding.
///
/// # Errors
///
/// [`ExportError::Decode`] if the source cannot be decoded,
/// [`ExportError::Encode`] if the JPEG encoder fails.
pub fn reencode_stock_jpeg(
    bytes: &[u8],
    target_dim: u32,
    file_stem: &str,
) -> Result<Artifact, ExportError> {
    let decoded = image::load_from_memory(bytes).map_err(ExportError::Decode)?;
    let mut rgba = decoded.to_rgba8();

    let (width, height) = rgba.dimensions();
    let scale = f64::from(target_dim) / f64::from(width.max(height));
    if scale > 1.0 {
        let new_width = (f64::from(width) * scale).floor() as u32;
        let new_height = (f64::from(height) * scale).floor() as u32;
        rgba = image::imageops::resize(&rgba, new_width, new_height, FilterType::Lanczos3);
    }

    let rgb = composite_over_white(&rgba);

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ExportError::Encode(e.to_string()))?;

    let bytes = buffer.into_inner();
    if bytes.is_empty() {
        return Err(ExportError::Encode("encoder returned no bytes".to_string()));
    }

    Ok(Artifact::new(format!("{file_stem}.jpg"), JPEG_MIME, bytes))
}

/// Flatten RGBA onto an opaque white background.
fn composite_over_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (out, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let alpha = u16::from(src[3]);
        for channel in 0..3 {
            let value = u16::from(src[channel]);
            out[channel] = ((value * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }
    rgb
}
