pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod services;
pub mod shell;

pub use controller::{ControllerOptions, SubmissionController};
pub use models::{ControllerSnapshot, GenerationResult, Phase, SubmitOutcome};
