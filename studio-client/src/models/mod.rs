pub mod submission;

pub use submission::{ControllerSnapshot, GenerationResult, Phase, SubmitOutcome};
