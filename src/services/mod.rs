//! Clients for the external generative services.
//!
//! Four HTTP endpoints sit behind the agents: image generation, metadata,
//! upscaling, and code generation. Each client owns its base URL and
//! timeouts, can be pointed at a mock server for testing, and maps
//! non-success responses into [`ServiceError`].

mod codegen;
mod image_gen;
mod metadata;
mod upscale;

pub use codegen::{
    file_context, history_context, ChatMessage, CodegenClient, CodegenResponse, Role,
    CODEGEN_API_BASE_URL, ZIP_CONTEXT_MIME,
};
pub use image_gen::{
    Candidate, ImageGenClient, DEFAULT_IMAGE_MODEL, DEFAULT_SUBJECT, IMAGE_API_BASE_URL,
};
pub use metadata::{ImageMetadata, MetadataClient, METADATA_API_BASE_URL};
pub use upscale::{UpscaleClient, UPSCALE_API_BASE_URL, UPSCALE_MODE};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The environment variable holding the API key for the keyed endpoints
/// (image generation and code generation).
pub const API_KEY_ENV: &str = "SPECTRA_API_KEY";

/// Errors from the service clients.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    /// The call succeeded but returned no usable candidate. Treated as a
    /// content-policy rejection rather than a transport failure.
    #[error("generation returned no usable candidate")]
    EmptyResult,
}

/// An uploaded file forwarded to a service: reference images for generation,
/// screenshots or project context for the code builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}
