//! GenBuilder agent: conversational project builder over a virtual file map.

use super::{AgentError, BuilderState, Status};
use crate::bundler;
use crate::config::Config;
use crate::export::{self, Artifact};
use crate::services::{Attachment, ChatMessage, CodegenClient, ServiceError};
use crate::vfs::{self, ROOT_DOCUMENT, SELF_CONTAINED_PREVIEW};

/// Orchestrator for the app-builder pipeline.
pub struct BuilderAgent {
    codegen: CodegenClient,
    state: BuilderState,
}

impl BuilderAgent {
    pub fn new(codegen: CodegenClient) -> Self {
        Self {
            codegen,
            state: BuilderState::default(),
        }
    }

    /// Build an agent from configuration, reading the API key from env.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let api_key = std::env::var(crate::services::API_KEY_ENV)
            .map_err(|_| ServiceError::MissingApiKey)?;
        Ok(Self::new(CodegenClient::with_base_url(
            api_key,
            config.services.codegen_base_url.clone(),
        )?))
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    /// Run one build turn: send the prompt (and optional attachment) to the
    /// code generator and merge the returned files into the project.
    ///
    /// Returns the names of the changed user-visible files. On failure a
    /// system error message is appended to the conversation and the agent
    /// resolves to `error`.
    pub async fn send(
        &mut self,
        prompt: &str,
        attachment: Option<Attachment>,
    ) -> Result<Vec<String>, AgentError> {
        if !self.state.status.can_start_generation() {
            return Err(AgentError::InvalidTransition(self.state.status));
        }

        let mut user_message = ChatMessage::user(prompt);
        if let Some(attachment) = &attachment {
            user_message
                .content
                .push_str(&format!(" [attached: {}]", attachment.name));
        }
        let mut next = self.state.clone();
        next.status = Status::Generating;
        next.messages.push(user_message);
        self.state = next;

        // History excludes the message we just appended: the prompt travels
        // in its own request field.
        let history = &self.state.messages[..self.state.messages.len() - 1];
        let result = self
            .codegen
            .generate_project(prompt, &self.state.files, history, attachment.as_ref())
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                log::error!("Build turn failed: {e}");
                let mut next = self.state.clone();
                next.status = Status::Error;
                let mut message =
                    ChatMessage::system("System Error: Failed to generate build. Please try again.");
                message.is_error = true;
                next.messages.push(message);
                self.state = next;
                return Err(e.into());
            }
        };

        let mut next = self.state.clone();
        let changed = vfs::merge_generated(&mut next.files, response.files);

        let summary = if response.summary.is_empty() {
            "Project updated.".to_string()
        } else {
            response.summary
        };
        let mut message = ChatMessage::assistant(summary);
        message.build_steps = response.build_steps;
        message.file_changes = changed.clone();
        message.preview_snapshot = Some(response.preview_snapshot);
        next.messages.push(message);
        next.status = Status::Review;
        self.state = next;

        Ok(changed)
    }

    /// Assemble the preview document for the current project, if any entry
    /// is renderable.
    pub fn preview(&self) -> Option<String> {
        bundler::assemble_preview(&self.state.files)
    }

    /// Pack the current project as a ZIP artifact.
    pub fn export_zip(&self) -> Result<Artifact, AgentError> {
        Ok(export::pack(&self.state.files, "genbuilder-project")?)
    }

    /// Replace the project with the contents of a ZIP archive.
    ///
    /// Appends a system message reporting whether a renderable root document
    /// was found.
    pub fn import_zip(&mut self, archive_name: &str, bytes: &[u8]) -> Result<(), AgentError> {
        let files = export::unpack(bytes)?;

        let has_root = files
            .keys()
            .any(|name| name.ends_with(SELF_CONTAINED_PREVIEW) || name.ends_with(ROOT_DOCUMENT));
        let notice = if has_root {
            "Preview should be visible."
        } else {
            "No index.html found - preview might be empty."
        };

        let mut next = self.state.clone();
        next.files = files;
        next.messages.push(ChatMessage::system(format!(
            "Project imported: {archive_name}. {notice}"
        )));
        self.state = next;
        Ok(())
    }
}
