//! CodegenClient - project code generation for the builder agent.
//!
//! The endpoint receives the system instruction, the serialized current file
//! set (text files only), the chat history, and an optional attachment, and
//! answers with build steps, changed files, a preview snapshot, and a
//! summary. Missing response fields are defaulted, never rejected.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{Attachment, ServiceError, API_KEY_ENV};
use crate::vfs::{FileMap, VirtualFile};

/// Default base URL for the code-generation API.
pub const CODEGEN_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model for code generation.
const DEFAULT_CODEGEN_MODEL: &str = "gemini-3-pro-preview";

/// MIME tag marking an attachment as serialized ZIP project context rather
/// than a visual or plain text upload.
pub const ZIP_CONTEXT_MIME: &str = "application/zip-project-context";

/// Default timeout for codegen requests (180 seconds). Whole-project
/// responses are large and slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SYSTEM_INSTRUCTION: &str = "\
You are GenBuilder Ultra, an advanced AI app builder.

CORE IDENTITY
- You are not a chatbot. You are an engine that builds software.
- You never show raw code in the chat. You show progress and file lists.
- You maintain project memory: remember design choices and user preferences.

PREVIEW STRATEGY
1. New project: generate 'preview.html' as a self-contained bundle with no
   imports or exports; copy component code into it.
2. Editing an imported website (index.html present): do NOT generate
   'preview.html'. Edit 'index.html', 'style.css' or 'script.js' directly;
   the preview engine bundles them automatically.

EDITING RULES
- Incremental: only generate files that change.
- Consistency: keep the same theme and layout unless asked to change.

RESPONSE FORMAT
Output JSON with: buildSteps (list of progress strings), files (array of
{name, content, language}), previewSnapshot (visual description of the
preview), summary (short message asking for the next step).";

/// Chat participant roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    fn as_upper(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
            Role::System => "SYSTEM",
        }
    }
}

/// One entry in the builder conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Progress lines reported for this turn (assistant messages only).
    #[serde(default)]
    pub build_steps: Vec<String>,
    /// User-visible source files changed in this turn.
    #[serde(default)]
    pub file_changes: Vec<String>,
    #[serde(default)]
    pub preview_snapshot: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            build_steps: Vec::new(),
            file_changes: Vec::new(),
            preview_snapshot: None,
            is_error: false,
        }
    }
}

#[derive(Serialize)]
struct CodegenRequest {
    #[serde(rename = "systemInstruction")]
    system_instruction: &'static str,
    contents: Contents,
}

#[derive(Serialize)]
struct Contents {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl RequestPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            inline_data: None,
            text: Some(text.into()),
        }
    }
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

/// Structured response from the code-generation endpoint.
#[derive(Debug, Deserialize)]
pub struct CodegenResponse {
    #[serde(rename = "buildSteps", default = "default_build_steps")]
    pub build_steps: Vec<String>,
    #[serde(default)]
    pub files: Vec<VirtualFile>,
    #[serde(rename = "previewSnapshot", default = "default_preview_snapshot")]
    pub preview_snapshot: String,
    #[serde(default)]
    pub summary: String,
}

fn default_build_steps() -> Vec<String> {
    vec!["Processing...".to_string()]
}

fn default_preview_snapshot() -> String {
    "Preview updated.".to_string()
}

/// Client for the code-generation endpoint.
pub struct CodegenClient {
    api_key: String,
    base_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl CodegenClient {
    /// Create a new CodegenClient by reading the API key from environment.
    pub fn new() -> Result<Self, ServiceError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| ServiceError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    pub fn with_api_key(api_key: String) -> Result<Self, ServiceError> {
        Self::with_base_url(api_key, CODEGEN_API_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL, e.g. a mock server.
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
            model: DEFAULT_CODEGEN_MODEL.to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one build turn: prompt plus the current project and history.
    ///
    /// # Errors
    ///
    /// `ServiceError::Api` for non-success statuses, `ServiceError::Http`
    /// for transport failures or an unparseable response body.
    pub async fn generate_project(
        &self,
        prompt: &str,
        files: &FileMap,
        history: &[ChatMessage],
        attachment: Option<&Attachment>,
    ) -> Result<CodegenResponse, ServiceError> {
        let mut parts = Vec::new();
        if let Some(attachment) = attachment {
            parts.extend(attachment_parts(attachment));
        }

        let context = if files.is_empty() {
            "Empty Project".to_string()
        } else {
            file_context(files)
        };
        parts.push(RequestPart::text(format!(
            "Current File System Context (Virtual):\n{context}\n\n\
             Chat History:\n{}\n\n\
             User Request: {prompt}",
            history_context(history)
        )));

        let url = format!("{}/{}", self.base_url, self.model);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&CodegenRequest {
                system_instruction: SYSTEM_INSTRUCTION,
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
            log::warn!("Code generation failed with status {status}: {body}");
            return Err(ServiceError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

/// Serialize the text files of the map as fenced context blocks.
///
/// Binary (`data:`) entries are skipped: they bloat the request and the model
/// cannot edit them anyway.
pub fn file_context(files: &FileMap) -> String {
    files
        .values()
        .filter(|file| !file.is_binary())
        .map(|file| {
            format!(
                "File: {}\n```{}\n{}\n```",
                file.name, file.language, file.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Serialize the conversation as `ROLE: content` lines.
pub fn history_context(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|message| format!("{}: {}", message.role.as_upper(), message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn an attachment into request parts.
///
/// Visual files (images, PDF) go inline for the model to look at. ZIP
/// project context and text files are base64-decoded and inlined as text;
/// undecodable payloads degrade to a notice line.
fn attachment_parts(attachment: &Attachment) -> Vec<RequestPart> {
    let is_visual = attachment.mime_type.starts_with("image/")
        || attachment.mime_type == "application/pdf";

    if is_visual {
        return vec![
            RequestPart {
                inline_data: Some(InlineData {
                    mime_type: attachment.mime_type.clone(),
                    data: attachment.data.clone(),
                }),
                text: None,
            },
            RequestPart::text(format!(
                "[User uploaded a visual file: {}]. Please analyze the design/layout \
                 in this image/document and replicate it.",
                attachment.name
            )),
        ];
    }

    match decode_text(&attachment.data) {
        Some(text) if attachment.mime_type == ZIP_CONTEXT_MIME => {
            vec![RequestPart::text(format!(
                "[User uploaded a project ZIP: {}]\nThis is the content of the files \
                 in the zip. Use this to understand the current project structure and \
                 files.\n\n{text}\n\nIMPORTANT: Use this code as the base for any changes.",
                attachment.name
            ))]
        }
        Some(text) => vec![RequestPart::text(format!(
            "[User uploaded a code/text file: {}]\nFile Content:\n```\n{text}\n```\n\
             Please use this code or content as context for the build.",
            attachment.name
        ))],
        None => {
            log::warn!("Could not decode attachment '{}'", attachment.name);
            vec![RequestPart::text(format!(
                "[User uploaded a file: {}] (Content could not be decoded, possibly binary).",
                attachment.name
            ))]
        }
    }
}

fn decode_text(data: &str) -> Option<String> {
    let bytes = STANDARD.decode(data).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
