//! Image generation service integration
//!
//! Submits a prompt to the image-synthesis service, waits for the generated
//! image and saves its bytes locally.

pub mod client;
pub mod mime;
pub mod mock;

pub use client::ImageClient;
pub use mock::MockImageGenerationClient;

use crate::models::GenerationParams;
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Generate an image for `prompt` and write it to `output_path`.
    ///
    /// Returns the absolute path of the written file.
    async fn generate_image(
        &self,
        prompt: &str,
        params: &GenerationParams,
        output_path: &Path,
    ) -> Result<PathBuf>;
}
