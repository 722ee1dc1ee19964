//! SpectraGAN vector agent: generate candidates, upscale a selection,
//! produce downloadable artifacts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{AgentError, Status, VectorState};
use crate::config::Config;
use crate::export::{self, Artifact};
use crate::services::{
    Attachment, ImageGenClient, MetadataClient, ServiceError, UpscaleClient,
};

/// Orchestrator for the vector-art pipeline.
///
/// Holds the three service clients and the current [`VectorState`]. Every
/// user-initiated operation catches its own failures: they are logged,
/// appended to the activity log, and resolved into the `error` status. There
/// is no automatic retry; recovery is an explicit regeneration.
pub struct VectorAgent {
    image_gen: ImageGenClient,
    upscale: UpscaleClient,
    metadata: MetadataClient,
    jpg_target_dim: u32,
    state: VectorState,
}

impl VectorAgent {
    pub fn new(
        image_gen: ImageGenClient,
        upscale: UpscaleClient,
        metadata: MetadataClient,
        jpg_target_dim: u32,
    ) -> Self {
        Self {
            image_gen,
            upscale,
            metadata,
            jpg_target_dim,
            state: VectorState::default(),
        }
    }

    /// Build an agent from configuration, reading the API key from env.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let api_key = std::env::var(crate::services::API_KEY_ENV)
            .map_err(|_| ServiceError::MissingApiKey)?;
        let mut image_gen =
            ImageGenClient::with_base_url(api_key, config.services.image_base_url.clone())?;
        image_gen.set_model(config.services.image_model.clone());
        Ok(Self::new(
            image_gen,
            UpscaleClient::with_base_url(config.services.upscale_base_url.clone())?,
            MetadataClient::with_base_url(config.services.metadata_base_url.clone())?,
            config.export.jpg_target_dim,
        ))
    }

    /// Current state snapshot.
    pub fn state(&self) -> &VectorState {
        &self.state
    }

    /// Start (or restart) a generation run.
    ///
    /// Resets the whole state to `generating`, calls the image service, and
    /// lands in `review` with candidates or in `error`.
    pub async fn generate(
        &mut self,
        prompt: &str,
        reference: Option<Attachment>,
    ) -> Result<(), AgentError> {
        if !self.state.status.can_start_generation() {
            return Err(AgentError::InvalidTransition(self.state.status));
        }

        let mut logs = vec![
            "INITIALIZING SPECTRA-GAN ENGINE...".to_string(),
            "Loading generative image model...".to_string(),
        ];
        match &reference {
            Some(attachment) => {
                logs.push(format!("MODE: VECTOR TRACING (source: {})", attachment.name))
            }
            None => logs.push("MODE: CREATIVE GENERATION".to_string()),
        }
        if prompt.trim().is_empty() && reference.is_none() {
            logs.push("Input empty. Using random high-demand concept...".to_string());
        } else if !prompt.trim().is_empty() {
            logs.push(format!("Analyzing prompt: \"{}\"", prompt.trim()));
            logs.push("Optimizing for stock quality...".to_string());
        }

        self.state = VectorState {
            status: Status::Generating,
            logs,
            ..VectorState::default()
        };

        let candidates = match self
            .image_gen
            .generate_candidates(prompt, reference.as_ref())
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => return Err(self.fail_generation(e.into())),
        };

        if candidates.is_empty() {
            // A successful call with nothing usable in it reads as a safety
            // filter rejection.
            return Err(self.fail_generation(ServiceError::EmptyResult.into()));
        }

        let mut logs = self.state.logs.clone();
        logs.push("Rendering complete.".to_string());
        logs.push(format!("Generated {} premium variant.", candidates.len()));
        logs.push("Waiting for user selection...".to_string());
        self.state = VectorState {
            status: Status::Review,
            logs,
            candidates,
            ..VectorState::default()
        };
        Ok(())
    }

    /// Select a candidate for finalization.
    ///
    /// Runs the upscale and metadata calls concurrently with all-or-nothing
    /// semantics: if either fails, the run resolves to `error` and the other
    /// branch's result is discarded.
    pub async fn select(&mut self, candidate_id: &str) -> Result<(), AgentError> {
        if self.state.status != Status::Review {
            return Err(AgentError::InvalidTransition(self.state.status));
        }
        let candidate = match self
            .state
            .candidates
            .iter()
            .find(|candidate| candidate.id == candidate_id)
        {
            Some(candidate) => candidate.clone(),
            None => return Err(AgentError::UnknownCandidate(candidate_id.to_string())),
        };

        let mut logs = self.state.logs.clone();
        logs.push(format!("User selected variant {}", candidate.id));
        logs.push("Initiating 2x smart upscale protocol...".to_string());
        logs.push("Generating SEO metadata...".to_string());
        self.state = VectorState {
            status: Status::Upscaling,
            logs,
            candidates: self.state.candidates.clone(),
            selected: Some(candidate.clone()),
            ..VectorState::default()
        };

        let image_bytes = match STANDARD.decode(&candidate.data) {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail_post_processing(AgentError::Payload(e.to_string()))),
        };

        let joined = tokio::try_join!(
            self.upscale.upscale(image_bytes, &candidate.mime_type),
            self.metadata.fetch(&candidate.data, &candidate.mime_type),
        );
        let (upscaled, metadata) = match joined {
            Ok(results) => results,
            Err(e) => return Err(self.fail_post_processing(e.into())),
        };

        let mut logs = self.state.logs.clone();
        logs.push("Upscale successful.".to_string());
        logs.push("SEO metadata generated.".to_string());
        logs.push("Ready for download.".to_string());
        logs.push("Task complete.".to_string());
        self.state = VectorState {
            status: Status::Complete,
            logs,
            candidates: self.state.candidates.clone(),
            selected: Some(candidate),
            upscaled: Some(upscaled),
            metadata: Some(metadata),
        };
        Ok(())
    }

    /// SVG artifact of the finished asset.
    pub fn download_svg(&mut self) -> Result<Artifact, AgentError> {
        let (bytes, stem) = self.finished_asset()?;
        let artifact = export::wrap_svg(&bytes, &stem)?;
        self.push_log("SVG downloaded.");
        Ok(artifact)
    }

    /// EPS artifact of the finished asset.
    pub fn download_eps(&mut self) -> Result<Artifact, AgentError> {
        let (bytes, stem) = self.finished_asset()?;
        self.push_log("Generating EPS...");
        let artifact = export::encode_eps(&bytes, &stem)?;
        self.push_log("EPS downloaded.");
        Ok(artifact)
    }

    /// Stock-compliant JPG artifact of the finished asset.
    pub fn download_jpg(&mut self) -> Result<Artifact, AgentError> {
        let (bytes, stem) = self.finished_asset()?;
        self.push_log(format!(
            "Enhancing JPG ({}px long side) for stock...",
            self.jpg_target_dim
        ));
        let artifact = export::reencode_stock_jpeg(&bytes, self.jpg_target_dim, &stem)?;
        self.push_log("High-res JPG downloaded.");
        Ok(artifact)
    }

    fn finished_asset(&self) -> Result<(Vec<u8>, String), AgentError> {
        match (&self.state.upscaled, &self.state.selected) {
            (Some(bytes), Some(candidate)) if self.state.status == Status::Complete => {
                Ok((bytes.clone(), format!("spectragan-{}", candidate.id)))
            }
            _ => Err(AgentError::NotReady),
        }
    }

    /// Append a log entry by replacing the state with an extended copy.
    fn push_log(&mut self, message: impl Into<String>) {
        let mut next = self.state.clone();
        next.logs.push(message.into());
        self.state = next;
    }

    fn fail_generation(&mut self, error: AgentError) -> AgentError {
        log::error!("Generation failed: {error}");
        let mut logs = self.state.logs.clone();
        logs.push(format!("CRITICAL ERROR: {error}"));
        logs.push("Process terminated.".to_string());
        self.state = VectorState {
            status: Status::Error,
            logs,
            ..VectorState::default()
        };
        error
    }

    fn fail_post_processing(&mut self, error: AgentError) -> AgentError {
        log::error!("Post-processing failed: {error}");
        let mut next = self.state.clone();
        next.status = Status::Error;
        next.logs.push("Error during post-processing.".to_string());
        self.state = next;
        error
    }
}
