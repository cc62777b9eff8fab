//! Candidate phrase generation: tokenising, stop-word filtering, n-grams.

use crate::templates;
use std::collections::HashSet;

/// Minimum token length in characters.
const MIN_TOKEN_CHARS: usize = 2;

pub struct StopWords {
    words: HashSet<&'static str>,
}

impl StopWords {
    /// The bundled English list.
    pub fn english() -> Self {
        Self::from_list(templates::STOP_WORDS)
    }

    /// Parse a newline-separated list; blank lines and `#` comments are ignored.
    pub fn from_list(list: &'static str) -> Self {
        let words = list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Lowercased alphanumeric tokens of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// Unique unigrams and bigrams in first-occurrence order.
///
/// Stop words are dropped before bigrams are formed, so a bigram may join two
/// words that were separated by a stop word in the original text.
pub fn candidate_phrases(text: &str, stop_words: &StopWords) -> Vec<String> {
    let tokens: Vec<String> = tokenize(text)
        .into_iter()
        .filter(|token| !stop_words.contains(token))
        .collect();

    let mut seen = HashSet::new();
    let mut phrases = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if seen.insert(token.clone()) {
            phrases.push(token.clone());
        }
        if let Some(next) = tokens.get(i + 1) {
            let bigram = format!("{} {}", token, next);
            if seen.insert(bigram.clone()) {
                phrases.push(bigram);
            }
        }
    }
    phrases
}
