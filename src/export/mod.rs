//! Downloadable artifact encoders.
//!
//! Everything a user can download comes out of this module as an [`Artifact`]:
//! EPS and stock-compliant JPEG re-encodings of a raster, an SVG wrapper, and
//! ZIP archives of the virtual file map.

mod archive;
mod eps;
mod jpeg;
mod svg;

pub use archive::{pack, unpack};
pub use eps::{encode_eps, postscript_document, EPS_MIME};
pub use jpeg::{reencode_stock_jpeg, DEFAULT_TARGET_DIM, JPEG_MIME};
pub use svg::{wrap_svg, SVG_MIME};

use thiserror::Error;

/// MIME type of packed project archives.
pub const ZIP_MIME: &str = "application/zip";

/// Errors from the artifact encoders.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The source bytes could not be decoded into a pixel buffer.
    #[error("could not decode source image: {0}")]
    Decode(image::ImageError),

    /// The output encoder produced no usable result.
    #[error("image encoder produced no output: {0}")]
    Encode(String),

    /// A `data:` URI entry did not have the `data:<mime>;base64,<payload>` shape.
    #[error("malformed data URI in '{0}'")]
    MalformedDataUri(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A downloadable output: named bytes with a MIME type.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, mime: &'static str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime,
            bytes,
        }
    }
}
