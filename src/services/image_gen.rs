//! ImageGenClient - handles communication with the generative image API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Attachment, ServiceError, API_KEY_ENV};

/// Default base URL for the generative image API.
pub const IMAGE_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model for image generation.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Fallback subject used when the user supplies neither a prompt nor a
/// reference image.
pub const DEFAULT_SUBJECT: &str = "Geometric minimalist wolf logo, vector style, white background";

/// Default timeout for generation requests (120 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One generated image awaiting user selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Deterministic identifier derived from the image payload.
    pub id: String,
    /// Base64-encoded image bytes.
    pub data: String,
    pub mime_type: String,
    /// The prompt that produced this candidate.
    pub prompt: String,
}

/// Derive a candidate id from its payload: `img_` + the first 16 digest
/// bytes, hex-encoded. Identical payloads always get identical ids.
fn candidate_id(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let digest = hasher.finalize();
    format!("img_{}", hex::encode(&digest[..16]))
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Contents,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Contents {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none", default)]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Contents,
}

/// Client for the generative image endpoint.
pub struct ImageGenClient {
    api_key: String,
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl ImageGenClient {
    /// Create a new ImageGenClient by reading the API key from environment.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::MissingApiKey` if the `SPECTRA_API_KEY`
    /// environment variable is not set.
    pub fn new() -> Result<Self, ServiceError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| ServiceError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new ImageGenClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, ServiceError> {
        Self::with_base_url(api_key, IMAGE_API_BASE_URL.to_string())
    }

    /// Create a new ImageGenClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ServiceError> {
        if api_key.is_empty() {
            return Err(ServiceError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url,
            model: DEFAULT_IMAGE_MODEL.to_string(),
            http_client,
        })
    }

    /// Override the generation model.
    pub fn set_model(&mut self, model: String) {
        self.model = model;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request image candidates for a prompt, optionally steered by a
    /// reference image.
    ///
    /// An empty candidate list is a valid, non-error outcome: the upstream
    /// model filtered every sample. Callers decide how to surface that.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Api` for non-success statuses and
    /// `ServiceError::Http` for transport failures.
    pub async fn generate_candidates(
        &self,
        prompt: &str,
        reference: Option<&Attachment>,
    ) -> Result<Vec<Candidate>, ServiceError> {
        let subject = effective_subject(prompt, reference.is_some());
        let full_prompt = build_prompt(&subject, reference.is_some());

        let mut parts = Vec::new();
        if let Some(image) = reference {
            // Strip a data-URI prefix if the caller passed one through.
            let data = image
                .data
                .split_once(',')
                .map(|(_, payload)| payload)
                .unwrap_or(&image.data);
            parts.push(Part {
                inline_data: Some(InlineData {
                    mime_type: image.mime_type.clone(),
                    data: data.to_string(),
                }),
                text: None,
            });
        }
        parts.push(Part {
            inline_data: None,
            text: Some(full_prompt),
        });

        let url = format!("{}/{}", self.base_url, self.model);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&GenerateRequest {
                contents: Contents { parts },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::warn!("Image generation failed with status {status}: {body}");
            return Err(ServiceError::Api { status, body });
        }

        let parsed: GenerateResponse = response.json().await?;
        let candidates = parsed
            .candidates
            .into_iter()
            .flat_map(|candidate| candidate.content.parts)
            .filter_map(|part| part.inline_data)
            .map(|inline| Candidate {
                id: candidate_id(&inline.data),
                data: inline.data,
                mime_type: inline.mime_type,
                prompt: subject.clone(),
            })
            .take(1)
            .collect();

        Ok(candidates)
    }
}

/// Pick the subject line sent to the model.
///
/// Empty input with no reference image falls back to the fixed default
/// subject; empty input alongside a reference image defers to the image.
pub fn effective_subject(prompt: &str, has_reference: bool) -> String {
    let trimmed = prompt.trim();
    if trimmed.is_empty() && !has_reference {
        DEFAULT_SUBJECT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Expand a subject into the full generation prompt, choosing between the
/// redraw-as-vector template and the creative-generation template.
pub fn build_prompt(subject: &str, has_reference: bool) -> String {
    if has_reference {
        let subject = if subject.is_empty() {
            "The object in the image"
        } else {
            subject
        };
        format!(
            "TASK: REDRAW THIS IMAGE AS A CLEAN VECTOR.\n\
             Subject: {subject}.\n\n\
             STRICT VISUAL RULES:\n\
             - CONVERT to high-end Vector Graphics (SVG style).\n\
             - NO photorealism. NO blurred edges. NO jpg artifacts.\n\
             - CLEAN LINES: Use bold, confident strokes.\n\
             - FLAT COLORS: Limit color palette to professional vector swatches.\n\
             - STYLE: Minimalist, Flat Design, Iconography.\n\
             - BACKGROUND: Pure White (#FFFFFF)."
        )
    } else {
        format!(
            "GENERATE A BEST-SELLING STOCK VECTOR ILLUSTRATION.\n\
             SUBJECT: {subject}\n\n\
             STYLE GUIDE (STRICT):\n\
             1. TYPE: Digital Vector Art / Screen Print / Decal.\n\
             2. QUALITY: Masterpiece, 4k, Ultra-Detailed.\n\
             3. LINEWORK: Clean, sharp, unpixelated lines. Perfect geometry.\n\
             4. AESTHETIC: Trending on professional design marketplaces.\n\
             5. COMPOSITION: Isolated subject on WHITE background, centered.\n\n\
             NEGATIVE PROMPT (AVOID):\n\
             - No gradients, no shading, no 3D render, no blur.\n\
             - No text, no watermarks, no signatures.\n\
             - No messy sketches, no unfinished lines."
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_api_key_creates_client() {
        let client = ImageGenClient::with_api_key("test-key".to_string()).unwrap();
        assert_eq!(client.base_url(), IMAGE_API_BASE_URL);
        assert_eq!(client.model(), DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_empty_api_key_returns_error() {
        let result = ImageGenClient::with_api_key(String::new());
        assert!(matches!(result, Err(ServiceError::MissingApiKey)));
    }

    #[test]
    fn test_effective_subject_defaults_when_empty_and_no_reference() {
        assert_eq!(effective_subject("  ", false), DEFAULT_SUBJECT);
        assert_eq!(effective_subject("", false), DEFAULT_SUBJECT);
    }

    #[test]
    fn test_effective_subject_defers_to_reference_image() {
        assert_eq!(effective_subject("", true), "");
        assert_eq!(effective_subject("a red fox", true), "a red fox");
    }

    #[test]
    fn test_build_prompt_picks_redraw_template_for_references() {
        let prompt = build_prompt("", true);
        assert!(prompt.starts_with("TASK: REDRAW THIS IMAGE AS A CLEAN VECTOR."));
        assert!(prompt.contains("Subject: The object in the image."));

        let prompt = build_prompt("a lighthouse", false);
        assert!(prompt.contains("SUBJECT: a lighthouse"));
        assert!(prompt.contains("NEGATIVE PROMPT"));
    }

    #[test]
    fn test_candidate_id_is_deterministic() {
        let a = candidate_id("AAAA");
        let b = candidate_id("AAAA");
        let c = candidate_id("BBBB");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("img_"));
        assert_eq!(a.len(), "img_".len() + 32);
    }
}
