//! Agent orchestrators.
//!
//! Two UI-facing agents sequence the external services: the vector agent
//! (generate -> review -> upscale + metadata -> artifacts) and the builder
//! agent (chat -> code generation -> file map -> preview/ZIP). Both run the
//! same status state machine and keep their state as a single value that is
//! replaced wholesale on every transition.

mod builder;
mod state;
mod vector;

pub use builder::BuilderAgent;
pub use state::{BuilderState, Status, VectorState};
pub use vector::VectorAgent;

use thiserror::Error;

use crate::export::ExportError;
use crate::services::ServiceError;

/// Errors surfaced by agent operations.
///
/// Every user-initiated operation also records its failure in the activity
/// log and resolves the agent into the `error` state; the returned error is
/// for programmatic callers.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    #[error("no candidate with id '{0}'")]
    UnknownCandidate(String),

    #[error("candidate payload is not valid base64: {0}")]
    Payload(String),

    #[error("operation not allowed while '{0}'")]
    InvalidTransition(Status),

    #[error("no finished asset to download yet")]
    NotReady,
}
