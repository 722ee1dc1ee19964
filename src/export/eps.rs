//! Raster-to-EPS encoding.
//!
//! Converts a decoded raster into an Encapsulated PostScript document that
//! reproduces the image at 1:1 pixel scale via a single `colorimage`
//! invocation over a hexadecimal RGB stream. Print pipelines for stock-asset
//! uploads accept this in place of true vector output.

use image::RgbaImage;

use super::{Artifact, ExportError};

/// MIME type of encoded EPS documents.
pub const EPS_MIME: &str = "application/postscript";

const EPS_TITLE: &str = "SpectraGAN Vector";
const EPS_CREATOR: &str = "SpectraGAN AI Agent";

/// Flush threshold for hex body chunks.
///
/// Chunk boundaries carry no meaning to a PostScript interpreter (newlines in
/// the hex stream are whitespace); the threshold only bounds single-string
/// growth. A chunk is flushed after the first whole pixel that pushes it past
/// this length, so no 6-character pixel group is ever split.
const CHUNK_FLUSH_LEN: usize = 8000;

/// Precomputed byte -> lowercase hex pair table.
static HEX_TABLE: [[u8; 2]; 256] = build_hex_table();

const fn build_hex_table() -> [[u8; 2]; 256] {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut table = [[0u8; 2]; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = [DIGITS[i >> 4], DIGITS[i & 0x0f]];
        i += 1;
    }
    table
}

/// Encode an image blob as an EPS artifact named `<file_stem>.eps`.
///
/// The blob is decoded with the `image` crate; anything it cannot interpret
/// fails with [`ExportError::Decode`]. Everything past decoding is pure and
/// total.
pub fn encode_eps(bytes: &[u8], file_stem: &str) -> Result<Artifact, ExportError> {
    let decoded = image::load_from_memory(bytes).map_err(ExportError::Decode)?;
    let rgba = decoded.to_rgba8();
    let document = postscript_document(&rgba);

    Ok(Artifact::new(
        format!("{file_stem}.eps"),
        EPS_MIME,
        document.into_bytes(),
    ))
}

/// Build the full EPS document text for a pixel buffer.
///
/// The header declares the bounding box at the image's pixel dimensions and
/// an 8-bit `DeviceRGB` `colorimage` whose transform matrix
/// `[W 0 0 -H 0 H]` flips Y: PostScript's image origin is bottom-left while
/// the buffer is top-left row-major. The body is the image's pixels in
/// row-major order, alpha dropped, two lowercase hex digits per channel.
pub fn postscript_document(image: &RgbaImage) -> String {
    let (width, height) = image.dimensions();

    let mut document = String::new();
    document.push_str("%!PS-Adobe-3.0 EPSF-3.0\n");
    document.push_str(&format!("%%BoundingBox: 0 0 {width} {height}\n"));
    document.push_str(&format!("%%Title: {EPS_TITLE}\n"));
    document.push_str(&format!("%%Creator: {EPS_CREATOR}\n"));
    document.push_str("%%Pages: 1\n");
    document.push_str("%%EndComments\n");
    document.push_str("%%Page: 1 1\n");
    document.push_str("/DeviceRGB setcolorspace\n");
    document.push_str(&format!("{width} {height} scale\n"));
    document.push_str(&format!(
        "{width} {height} 8 [{width} 0 0 -{height} 0 {height}]\n"
    ));
    document.push_str(&format!(
        "{{currentfile 3 {width} mul string readhexstring pop}} false 3 colorimage\n"
    ));

    for chunk in hex_chunks(image.as_raw()) {
        document.push_str(&chunk);
        document.push('\n');
    }
    document.push_str("%%EOF");
    document
}

/// Convert an RGBA buffer into hex body chunks.
///
/// Each pixel contributes exactly six hex characters (RRGGBB, alpha dropped).
/// A chunk is flushed once its length exceeds [`CHUNK_FLUSH_LEN`]; the
/// remainder, if any, becomes the final chunk.
fn hex_chunks(rgba: &[u8]) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::with_capacity(CHUNK_FLUSH_LEN + 6);

    for pixel in rgba.chunks_exact(4) {
        for &byte in &pixel[..3] {
            let pair = &HEX_TABLE[byte as usize];
            current.push(pair[0] as char);
            current.push(pair[1] as char);
        }
        if current.len() > CHUNK_FLUSH_LEN {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn image_strategy() -> impl Strategy<Value = RgbaImage> {
        ((1u32..=64, 1u32..=64), any::<u8>()).prop_map(|((w, h), seed)| {
            let pixels: Vec<u8> = (0..(w * h * 4) as usize)
                .map(|i| (i as u8).wrapping_mul(37).wrapping_add(seed))
                .collect();
            RgbaImage::from_raw(w, h, pixels).unwrap()
        })
    }

    proptest! {
        /// Concatenating all chunks reproduces the direct per-pixel hex stream.
        #[test]
        fn prop_chunks_concat_to_direct_conversion(image in image_strategy()) {
            let expected: String = image
                .as_raw()
                .chunks_exact(4)
                .flat_map(|p| p[..3].iter())
                .map(|b| format!("{b:02x}"))
                .collect();

            let joined: String = hex_chunks(image.as_raw()).concat();
            prop_assert_eq!(joined, expected);
        }

        /// No chunk boundary falls mid-pixel, and non-final chunks exceed the
        /// flush threshold.
        #[test]
        fn prop_chunk_boundaries_align_to_pixels(image in image_strategy()) {
            let chunks = hex_chunks(image.as_raw());
            let total: usize = chunks.iter().map(String::len).sum();
            let (w, h) = image.dimensions();

            prop_assert_eq!(total, (6 * w * h) as usize);
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.len() % 6, 0);
                if i + 1 < chunks.len() {
                    prop_assert!(chunk.len() > CHUNK_FLUSH_LEN);
                }
            }
        }

        /// The bounding box always matches the pixel dimensions.
        #[test]
        fn prop_bounding_box_matches_dimensions(image in image_strategy()) {
            let (w, h) = image.dimensions();
            let document = postscript_document(&image);
            let expected_bbox = format!("%%BoundingBox: 0 0 {w} {h}", w = w, h = h);
            prop_assert!(document.contains(&expected_bbox));
        }
    }
}
