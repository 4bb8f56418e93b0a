pub mod metrics;
pub mod providers;
pub mod relay;

pub use relay::{first_image_url, GenerationRelay, GenerationResult};
