//! MetadataClient - SEO title/keyword generation for a candidate image.
//!
//! The metadata endpoint speaks an OpenAI-style chat format and is asked to
//! answer in bare JSON. Models being models, the content regularly comes back
//! fenced or malformed; those cases collapse into a deterministic fallback
//! set instead of an error. Transport and status failures still propagate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ServiceError;

/// Default base URL for the metadata API.
pub const METADATA_API_BASE_URL: &str = "https://text.pollinations.ai";

const METADATA_MODEL: &str = "openai";
const MAX_TOKENS: u32 = 1000;

/// Default timeout for metadata requests (60 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const INSTRUCTION: &str = "Analyze this vector illustration for a stock photography site.\n\
    1. Title: Create 5 catchy, SEO-optimized titles (e.g., \"Minimalist Geometric Wolf Logo - Vector Isolated\").\n\
    2. Keywords: List 45+ comma-separated keywords sorted by relevance. Include style keywords like \"vector\", \"flat\", \"illustration\", \"isolated\".\n\n\
    IMPORTANT: Return ONLY valid JSON in the following format, with no markdown code fences:\n\
    {\n  \"titles\": [\"Title 1\", \"Title 2\", ...],\n  \"keywords\": [\"keyword1\", \"keyword2\", ...]\n}";

const FALLBACK_TITLES: &[&str] = &[
    "Vector Illustration - High Quality Stock Image",
    "Isolated Vector Art Object",
    "Digital Illustration Design Element",
    "Professional Graphic Asset",
    "Creative Vector Icon",
];

const FALLBACK_KEYWORDS: &[&str] = &[
    "vector", "illustration", "graphic", "design", "art", "isolated", "white background", "stock",
    "commercial", "icon", "symbol", "modern", "flat", "clean", "shape", "creative", "element",
    "digital", "print", "web", "svg", "eps", "artwork", "drawing", "sketch", "lineart",
    "silhouette", "black", "white", "style", "concept", "abstract", "geometric", "nature",
    "technology", "business", "decoration", "pattern", "badge", "label", "logo", "sign",
    "template", "poster", "card",
];

/// SEO metadata for a generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub titles: Vec<String>,
    pub keywords: Vec<String>,
}

impl ImageMetadata {
    /// The deterministic fallback used when the endpoint's content cannot be
    /// interpreted.
    pub fn fallback() -> Self {
        Self {
            titles: FALLBACK_TITLES.iter().map(|s| s.to_string()).collect(),
            keywords: FALLBACK_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: &'static str,
    messages: Vec<ChatRequestMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequestMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Default, Deserialize)]
struct Choice {
    #[serde(default)]
    message: ChoiceMessage,
}

#[derive(Default, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ParsedMetadata {
    #[serde(default)]
    titles: Option<Vec<String>>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

/// Client for the metadata endpoint.
pub struct MetadataClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl MetadataClient {
    pub fn new() -> Result<Self, ServiceError> {
        Self::with_base_url(METADATA_API_BASE_URL.to_string())
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

    /// Fetch titles and keywords for a base64 image.
    ///
    /// # Errors
    ///
    /// `ServiceError::Api` on non-success statuses, `ServiceError::Http` on
    /// transport failures. Unparseable 200 responses do NOT error; they
    /// resolve to [`ImageMetadata::fallback`].
    pub async fn fetch(&self, data: &str, mime_type: &str) -> Result<ImageMetadata, ServiceError> {
        let image_url = format!("data:{mime_type};base64,{data}");
        let request = ChatRequest {
            model: METADATA_MODEL,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: INSTRUCTION.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/openai", self.base_url);
        let response = self.http_client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::Api { status, body });
        }

        let body = response.text().await?;
        Ok(interpret_content(&body))
    }
}

/// Interpret a 200 response body, falling back deterministically on garbage.
fn interpret_content(body: &str) -> ImageMetadata {
    let envelope: ChatResponse = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::warn!("Metadata response envelope unparseable, using fallback: {e}");
            return ImageMetadata::fallback();
        }
    };

    let content = envelope
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .unwrap_or_default();

    let cleaned = content.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    match serde_json::from_str::<ParsedMetadata>(cleaned) {
        Ok(parsed) => ImageMetadata {
            titles: parsed
                .titles
                .unwrap_or_else(|| vec!["Vector Illustration".to_string()]),
            keywords: parsed
                .keywords
                .unwrap_or_else(|| vec!["vector".to_string(), "illustration".to_string()]),
        },
        Err(e) => {
            log::warn!("Metadata content unparseable, using fallback: {e}");
            ImageMetadata::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(content: &str) -> String {
        serde_json::json!({
            "choices": [{ "message": { "content": content } }]
        })
        .to_string()
    }

    #[test]
    fn test_fallback_shape() {
        let fallback = ImageMetadata::fallback();
        assert_eq!(fallback.titles.len(), 5);
        assert_eq!(fallback.keywords.len(), 45);
    }

    #[test]
    fn test_interpret_plain_json_content() {
        let body = envelope(r#"{"titles": ["T1"], "keywords": ["k1", "k2"]}"#);
        let metadata = interpret_content(&body);
        assert_eq!(metadata.titles, vec!["T1"]);
        assert_eq!(metadata.keywords, vec!["k1", "k2"]);
    }

    #[test]
    fn test_interpret_strips_markdown_fences() {
        let body = envelope("```json\n{\"titles\": [\"Fenced\"], \"keywords\": [\"k\"]}\n```");
        let metadata = interpret_content(&body);
        assert_eq!(metadata.titles, vec!["Fenced"]);
    }

    #[test]
    fn test_interpret_garbage_content_falls_back() {
        let body = envelope("I'm sorry, I cannot help with that.");
        assert_eq!(interpret_content(&body), ImageMetadata::fallback());
    }

    #[test]
    fn test_interpret_garbage_envelope_falls_back() {
        assert_eq!(interpret_content("<html>502</html>"), ImageMetadata::fallback());
    }

    #[test]
    fn test_interpret_missing_fields_get_small_defaults() {
        let body = envelope(r#"{"titles": ["Only titles"]}"#);
        let metadata = interpret_content(&body);
        assert_eq!(metadata.titles, vec!["Only titles"]);
        assert_eq!(metadata.keywords, vec!["vector", "illustration"]);
    }

    #[test]
    fn test_interpret_empty_choices_falls_back() {
        let body = r#"{"choices": []}"#;
        assert_eq!(interpret_content(body), ImageMetadata::fallback());
    }
}
