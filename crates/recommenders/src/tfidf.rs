//! TF-IDF vectorization of book descriptions.
//!
//! Turns free-text descriptions into dense feature vectors:
//! lowercase + alphanumeric tokenization, stop-word removal, smoothed
//! inverse document frequency. The vocabulary is sorted so that feature
//! positions are deterministic for a given corpus.

use crate::similarity::{SimilarityMatrix, cosine_similarity_matrix};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Common English words carrying no topical signal
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "he",
    "her", "his", "in", "is", "it", "its", "of", "on", "or", "she", "that", "the", "their",
    "they", "this", "to", "was", "were", "which", "who", "will", "with",
];

/// TF-IDF vectorizer over a fixed corpus.
///
/// `fit` builds the vocabulary and the feature matrix in one pass; there is
/// no transform-on-new-documents path because book similarity is always
/// recomputed from the full current catalog.
#[derive(Debug, Default)]
pub struct TfidfVectorizer {
    vocab: HashMap<String, usize>,
    matrix: Vec<Vec<f32>>,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the vocabulary from `documents` and return the feature matrix,
    /// row-aligned with the input order. Empty documents produce all-zero
    /// rows; an entirely empty corpus produces an empty vocabulary, which
    /// downstream similarity treats as "no book resembles any other".
    pub fn fit(&mut self, documents: &[String]) -> &[Vec<f32>] {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();

        // Sorted vocabulary for deterministic feature positions
        let mut terms: Vec<String> = tokenized
            .iter()
            .flatten()
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        terms.sort();
        self.vocab = terms
            .into_iter()
            .enumerate()
            .map(|(i, term)| (term, i))
            .collect();

        debug!(
            documents = documents.len(),
            vocabulary = self.vocab.len(),
            "Fitted TF-IDF vectorizer"
        );

        // Document frequency per term
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Smoothed idf keeps every weight strictly positive
        let n_docs = documents.len();
        let idf: HashMap<&str, f32> = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let idf = ((n_docs + 1) as f32 / (df + 1) as f32).ln() + 1.0;
                (term, idf)
            })
            .collect();

        self.matrix = tokenized
            .iter()
            .map(|tokens| {
                let mut row = vec![0.0; self.vocab.len()];
                let mut tf: HashMap<&str, u32> = HashMap::new();
                for token in tokens {
                    *tf.entry(token.as_str()).or_insert(0) += 1;
                }
                for (term, count) in tf {
                    if let Some(&pos) = self.vocab.get(term) {
                        row[pos] = count as f32 * idf[term];
                    }
                }
                row
            })
            .collect();

        &self.matrix
    }

    /// Cosine similarity over the fitted feature matrix.
    ///
    /// Symmetric, diagonal 1.0, bounded in [0, 1] since weights are
    /// non-negative. With an empty vocabulary every row is zero and the
    /// result degrades to the identity matrix.
    pub fn similarity_matrix(&self) -> SimilarityMatrix {
        cosine_similarity_matrix(&self.matrix)
    }

    /// Number of distinct terms the corpus produced
    pub fn vocabulary_size(&self) -> usize {
        self.vocab.len()
    }
}

/// Lowercase, keep alphanumeric tokens, drop stop words
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}
