//! Semantic similarity helpers used to rank candidate phrases.

use crate::models::ScoredKeyword;
use crate::{Error, Result};

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `None` when vectors have different lengths, are empty, contain
/// non-finite values, or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (dot, norm_a_sq, norm_b_sq) =
        a.iter()
            .zip(b.iter())
            .fold((0.0f64, 0.0f64, 0.0f64), |(dot, na_sq, nb_sq), (x, y)| {
                let x = *x as f64;
                let y = *y as f64;
                (dot + (x * y), na_sq + (x * x), nb_sq + (y * y))
            });

    if !dot.is_finite() || !norm_a_sq.is_finite() || !norm_b_sq.is_finite() {
        return None;
    }

    if norm_a_sq == 0.0 || norm_b_sq == 0.0 {
        return None;
    }

    Some((dot / (norm_a_sq.sqrt() * norm_b_sq.sqrt())) as f32)
}

/// Score every phrase against `query` and sort from most to least similar.
///
/// Phrases whose similarity cannot be computed are dropped. Equal scores keep
/// their input order.
pub fn rank_by_similarity(
    query: &[f32],
    phrases: &[String],
    embeddings: &[impl AsRef<[f32]>],
) -> Result<Vec<ScoredKeyword>> {
    if phrases.len() != embeddings.len() {
        return Err(Error::Extraction(format!(
            "phrases/embeddings length mismatch: phrases={}, embeddings={}",
            phrases.len(),
            embeddings.len()
        )));
    }

    let mut ranked: Vec<ScoredKeyword> = phrases
        .iter()
        .zip(embeddings)
        .filter_map(|(phrase, embedding)| {
            cosine_similarity(query, embedding.as_ref()).map(|score| ScoredKeyword {
                phrase: phrase.clone(),
                score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(ranked)
}
