//! Image service double for pipeline tests.

use super::ImageGenerationService;
use crate::models::GenerationParams;
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Image service double that writes canned bytes to the requested path.
#[derive(Clone)]
pub struct MockImageGenerationClient {
    image_bytes: Arc<Mutex<Vec<u8>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            // PNG signature
            image_bytes: Arc::new(Mutex::new(vec![
                0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A,
            ])),
            prompts: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_image_response(self, bytes: Vec<u8>) -> Self {
        *self.image_bytes.lock().unwrap() = bytes;
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(
        &self,
        prompt: &str,
        _params: &GenerationParams,
        output_path: &Path,
    ) -> Result<PathBuf> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if *self.should_fail.lock().unwrap() {
            return Err(Error::generation("Mock service rejected request"));
        }

        let bytes = self.image_bytes.lock().unwrap().clone();
        std::fs::write(output_path, bytes)?;
        Ok(std::path::absolute(output_path)?)
    }
}
