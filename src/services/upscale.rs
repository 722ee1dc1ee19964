//! UpscaleClient - raster upscaling via multipart upload.

use std::time::Duration;

use reqwest::multipart::{Form, Part};

use super::ServiceError;

/// Default base URL for the upscaling API.
pub const UPSCALE_API_BASE_URL: &str = "https://akwbw-uptheimage.hf.space";

/// Upscale mode sent with every request.
pub const UPSCALE_MODE: &str = "x2";

const UPLOAD_FILE_NAME: &str = "input.png";

/// Default timeout for upscale requests (120 seconds). Upscaling a large
/// candidate routinely takes tens of seconds.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the upscaling endpoint.
pub struct UpscaleClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl UpscaleClient {
    pub fn new() -> Result<Self, ServiceError> {
        Self::with_base_url(UPSCALE_API_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL, e.g. a mock server.
    pub fn with_base_url(base_url: String) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upscale raw image bytes, returning the upscaled image bytes.
    ///
    /// The request is a multipart form with the image as a file part and the
    /// fixed mode string. Any non-success status is fatal for the call.
    pub async fn upscale(&self, image: Vec<u8>, mime_type: &str) -> Result<Vec<u8>, ServiceError> {
        let part = Part::bytes(image)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(mime_type)?;
        let form = Form::new().part("image", part).text("mode", UPSCALE_MODE);

        let url = format!("{}/upscale", self.base_url);
        let response = self.http_client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("Upscale failed with status {status}: {body}");
            return Err(ServiceError::Api { status, body });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
