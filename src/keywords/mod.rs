//! Keyword extraction
//!
//! Ranks unigram and bigram candidates from the input text by the cosine
//! similarity of their embeddings to the embedding of the whole text.

pub mod candidates;

pub use candidates::{candidate_phrases, tokenize, StopWords};

use crate::embedding::EmbeddingService;
use crate::models::ScoredKeyword;
use crate::{semantic, Error, Result};
use tracing::{debug, warn};

pub struct KeywordExtractor {
    embedder: Box<dyn EmbeddingService>,
    stop_words: StopWords,
}

impl KeywordExtractor {
    pub fn new(embedder: Box<dyn EmbeddingService>) -> Self {
        Self {
            embedder,
            stop_words: StopWords::english(),
        }
    }

    /// Top `top_n` phrases, most relevant first.
    pub async fn extract(&self, text: &str, top_n: usize) -> Result<Vec<String>> {
        Ok(self
            .extract_scored(text, top_n)
            .await?
            .into_iter()
            .map(|keyword| keyword.phrase)
            .collect())
    }

    pub async fn extract_scored(&self, text: &str, top_n: usize) -> Result<Vec<ScoredKeyword>> {
        if top_n == 0 {
            return Err(Error::Extraction("top_n must be at least 1".to_string()));
        }
        if text.trim().is_empty() {
            return Err(Error::Extraction("input text is empty".to_string()));
        }

        let candidates = candidate_phrases(text, &self.stop_words);
        if candidates.is_empty() {
            warn!("No candidate phrases left after stop-word filtering");
            return Ok(Vec::new());
        }
        debug!("Scoring {} candidate phrases", candidates.len());

        let inputs: Vec<&str> = std::iter::once(text)
            .chain(candidates.iter().map(String::as_str))
            .collect();
        let embeddings = self
            .embedder
            .embed_texts(&inputs)
            .await
            .map_err(|e| match e {
                Error::Extraction(_) => e,
                other => Error::Extraction(format!("embedding model failed: {}", other)),
            })?;

        let Some((document, phrase_embeddings)) = embeddings.split_first() else {
            return Err(Error::Extraction(
                "embedding model returned no vectors".to_string(),
            ));
        };

        let mut ranked = semantic::rank_by_similarity(document, &candidates, phrase_embeddings)?;
        ranked.truncate(top_n);
        Ok(ranked)
    }
}
