//! SVG wrapper artifact.
//!
//! Wraps a raster in an `<image>` element at its pixel dimensions. This is a
//! web-deliverable container, not a traced vector; the raster travels inside
//! as a `data:` URI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{Artifact, ExportError};

/// MIME type of SVG wrapper artifacts.
pub const SVG_MIME: &str = "image/svg+xml";

/// Wrap an image blob in an SVG document named `<file_stem>.svg`.
///
/// Dimensions and the embedded MIME type are taken from the decoded blob;
/// undecodable input fails with [`ExportError::Decode`].
pub fn wrap_svg(bytes: &[u8], file_stem: &str) -> Result<Artifact, ExportError> {
    let format = image::guess_format(bytes).map_err(ExportError::Decode)?;
    let decoded = image::load_from_memory(bytes).map_err(ExportError::Decode)?;
    let (width, height) = (decoded.width(), decoded.height());

    let data_uri = format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    );
    let svg = format!(
        r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
  <desc>SpectraGAN AI Vector</desc>
  <image href="{data_uri}" height="{height}" width="{width}" />
</svg>"#
    );

    Ok(Artifact::new(
        format!("{file_stem}.svg"),
        SVG_MIME,
        svg.into_bytes(),
    ))
}
