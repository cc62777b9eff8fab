//! Text embedding models used for keyword relevance
//!
//! The keyword extractor only needs one capability from a model: turn a batch
//! of texts into vectors of equal dimension. Backends are selected by config.

pub mod hashing;
pub mod mock;
pub mod openai;

pub use hashing::HashingEmbedder;
pub use mock::MockEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use crate::models::{Config, EmbeddingProvider};
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed `texts`, returning one vector per input in the same order.
    async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Build the configured embedding backend.
pub fn build_embedder(config: &Config) -> Result<Box<dyn EmbeddingService>> {
    match config.embedding_provider {
        EmbeddingProvider::Hashing => {
            info!("Embedding provider: local hashing model");
            Ok(Box::new(HashingEmbedder::default()))
        }
        EmbeddingProvider::OpenAi => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                Error::Extraction(
                    "OpenAI embedding model selected but OPENAI_API_KEY is not set".to_string(),
                )
            })?;
            info!(
                "Embedding provider: OpenAI (model: {})",
                config.embedding_model
            );
            Ok(Box::new(OpenAiEmbeddingClient::new(
                api_key,
                config.embedding_model.clone(),
                config.http_timeout,
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_without_key_fails_to_load() {
        let config = Config {
            embedding_provider: EmbeddingProvider::OpenAi,
            openai_api_key: None,
            ..Config::default()
        };

        let err = build_embedder(&config).err().unwrap();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[tokio::test]
    async fn test_default_provider_embeds_offline() {
        let embedder = build_embedder(&Config::default()).unwrap();
        let vectors = embedder.embed_texts(&["earthquake"]).await.unwrap();
        assert_eq!(vectors.len(), 1);
    }
}
