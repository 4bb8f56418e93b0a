use crate::error::{ClientError, StoreError};

/// Image location returned by the relay: an `http(s)` URL or a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
}

/// Point-in-time copy of the controller state, for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub prompt: String,
    pub image_url: Option<String>,
    pub phase: Phase,
    pub credits: i64,
}

impl ControllerSnapshot {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Generating
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.prompt.trim().is_empty() && self.credits > 0
    }
}

/// What a submit attempt did.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The relay returned an image and one credit was spent.
    Generated(GenerationResult),
    /// The image came back and a credit was spent in memory, but the new
    /// count could not be written. A reload would restore the credit.
    GeneratedUnsaved {
        result: GenerationResult,
        error: StoreError,
    },
    /// No credits left; the navigator was sent to `destination`.
    Redirected { destination: String },
    /// Prompt was empty or whitespace.
    IgnoredBlankPrompt,
    /// Another generation is already in flight.
    Busy,
    /// The round trip failed or was abandoned; credits are unchanged.
    Failed(ClientError),
}

impl SubmitOutcome {
    pub fn image_url(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Generated(result)
            | SubmitOutcome::GeneratedUnsaved { result, .. } => Some(&result.image_url),
            _ => None,
        }
    }
}
