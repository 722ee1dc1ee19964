//! Agent status state machine and state snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::services::{Candidate, ChatMessage, ImageMetadata};
use crate::vfs::FileMap;

/// UI-facing status of an agent.
///
/// Transitions: `idle -> generating -> {review | error}`,
/// `review -> upscaling -> {complete | error}`. `review`, `complete` and
/// `error` can all return to `generating` via explicit regeneration. All
/// transitions are driven by the settlement of service calls; none are
/// time-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Generating,
    Review,
    Upscaling,
    Complete,
    Error,
}

impl Status {
    /// Whether a user-triggered (re)generation may start from this status.
    pub fn can_start_generation(self) -> bool {
        matches!(
            self,
            Status::Idle | Status::Review | Status::Complete | Status::Error
        )
    }

    /// Whether this status ends a pipeline run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Complete | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Generating => "generating",
            Status::Review => "review",
            Status::Upscaling => "upscaling",
            Status::Complete => "complete",
            Status::Error => "error",
        };
        f.write_str(name)
    }
}

/// Full state of the vector agent.
///
/// Replaced wholesale on every transition; never field-mutated in place.
#[derive(Debug, Clone, Default)]
pub struct VectorState {
    pub status: Status,
    /// Human-readable activity log shown alongside the pipeline.
    pub logs: Vec<String>,
    pub candidates: Vec<Candidate>,
    pub selected: Option<Candidate>,
    /// Raw bytes of the upscaled selection.
    pub upscaled: Option<Vec<u8>>,
    pub metadata: Option<ImageMetadata>,
}

/// Full state of the builder agent.
#[derive(Debug, Clone, Default)]
pub struct BuilderState {
    pub status: Status,
    pub files: FileMap,
    pub messages: Vec<ChatMessage>,
}
