//! In-memory embedding model with fixed vectors per text.

use super::EmbeddingService;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Embedding service returning canned vectors keyed by input text.
///
/// Texts without a canned vector embed to `[0.0, 0.0]`, which the ranker
/// treats as unscorable.
#[derive(Clone)]
pub struct MockEmbeddingClient {
    vectors: Arc<Mutex<HashMap<String, Vec<f32>>>>,
    call_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        Self {
            vectors: Arc::new(Mutex::new(HashMap::new())),
            call_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_embedding(self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for MockEmbeddingClient {
    async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        *self.call_count.lock().unwrap() += 1;

        if *self.should_fail.lock().unwrap() {
            return Err(Error::Extraction("Mock model failed to load".to_string()));
        }

        let vectors = self.vectors.lock().unwrap();
        Ok(texts
            .iter()
            .map(|text| vectors.get(*text).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
            .collect())
    }
}
