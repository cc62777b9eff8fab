//! OpenAI embedding client implementation.
//!
//! Uses `/v1/embeddings` to batch-embed the document and its candidate
//! phrases in one request.

use super::EmbeddingService;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const EMBEDDINGS_PATH: &str = "/v1/embeddings";

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
    encoding_format: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI implementation of [`EmbeddingService`].
pub struct OpenAiEmbeddingClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiEmbeddingClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Extraction(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn post(&self, request: &EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        let url = format!("{}{}", self.base_url, EMBEDDINGS_PATH);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to OpenAI: {}", e);
                Error::Extraction(format!("Embedding request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI API error (status {}): {}", status, error_text);
            return Err(Error::Extraction(format!(
                "OpenAI API error (status {}): {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to read OpenAI response: {}", e)))?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse OpenAI response: {}\nBody: {}", e, body);
            Error::Extraction(format!("Failed to parse OpenAI response: {}", e))
        })
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingClient {
    async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingsRequest {
            model: self.model.clone(),
            input: texts.iter().map(|text| (*text).to_string()).collect(),
            encoding_format: "float".to_string(),
        };

        let mut indexed = self.post(&request).await?.data;
        indexed.sort_by_key(|item| item.index);

        if indexed.len() != texts.len() {
            return Err(Error::Extraction(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                indexed.len()
            )));
        }

        if indexed
            .iter()
            .enumerate()
            .any(|(expected_idx, item)| item.index != expected_idx)
        {
            return Err(Error::Extraction(
                "Embedding indices were non-contiguous or out of range".to_string(),
            ));
        }

        Ok(indexed.into_iter().map(|item| item.embedding).collect())
    }
}
