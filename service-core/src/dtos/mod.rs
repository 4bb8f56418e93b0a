//! Wire types shared between the relay service and its clients.

pub mod imagegen;

pub use imagegen::{ErrorBody, GenerateImageRequest, GenerateImageResponse};
