//! Content-based recommendation over book description similarity.
//!
//! Built once per model rebuild from the current catalog: descriptions are
//! vectorized with TF-IDF and a book-book cosine similarity matrix is kept.
//! Recommendations anchor on "seed" books (liked, or matching the user's
//! preferred categories) and rank unrated books by mean seed similarity.

use crate::similarity::SimilarityMatrix;
use crate::tfidf::TfidfVectorizer;
use catalog::{Book, BookId, Category, User};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Rating at or above which a book counts as "liked"
pub const LIKED_THRESHOLD: f32 = 4.0;

/// Seed cap when falling back to preference-category books
const MAX_CATEGORY_SEEDS: usize = 5;

/// Content-based recommender with a precomputed book-book similarity matrix
pub struct ContentBasedRecommender {
    book_ids: Vec<BookId>,
    categories: Vec<Category>,
    book_pos: HashMap<BookId, usize>,
    similarity: SimilarityMatrix,
}

impl ContentBasedRecommender {
    /// Build the model from the current book collection.
    ///
    /// An all-empty description corpus is not an error: the similarity
    /// matrix degrades to the identity and `recommend` simply produces
    /// scores of zero.
    pub fn new(books: &[Book]) -> Self {
        let documents: Vec<String> = books.iter().map(|b| b.description.clone()).collect();

        let mut vectorizer = TfidfVectorizer::new();
        vectorizer.fit(&documents);
        let similarity = vectorizer.similarity_matrix();

        debug!(
            books = books.len(),
            vocabulary = vectorizer.vocabulary_size(),
            "Built content-based model"
        );

        Self {
            book_ids: books.iter().map(|b| b.id.clone()).collect(),
            categories: books.iter().map(|b| b.category.clone()).collect(),
            book_pos: books
                .iter()
                .enumerate()
                .map(|(pos, b)| (b.id.clone(), pos))
                .collect(),
            similarity,
        }
    }

    /// Recommend up to `n` unrated books for `user`.
    ///
    /// Seeds are the user's liked books (rating >= 4.0); if none exist,
    /// up to a handful of books from the user's preferred categories; if
    /// there are still no seeds, the result is empty (fail closed).
    /// Candidates are scored by the arithmetic mean of their similarity to
    /// every seed and ranked (score desc, catalog position asc).
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub fn recommend(&self, user: &User, n: usize) -> Vec<BookId> {
        let seeds = self.seed_positions(user);
        if seeds.is_empty() {
            debug!("No seed books for user, content stage yields nothing");
            return Vec::new();
        }

        // A zero mean similarity carries no signal, so those candidates are
        // excluded rather than ranked at the bottom; later cascade stages
        // handle them with better criteria.
        let mut candidates: Vec<(usize, f32)> = (0..self.book_ids.len())
            .filter(|&pos| !user.has_rated(&self.book_ids[pos]))
            .map(|pos| {
                let total: f32 = seeds.iter().map(|&seed| self.similarity[seed][pos]).sum();
                (pos, total / seeds.len() as f32)
            })
            .filter(|&(_, score)| score > 0.0)
            .collect();

        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        candidates.truncate(n);

        candidates
            .into_iter()
            .map(|(pos, _)| self.book_ids[pos].clone())
            .collect()
    }

    /// The book-book similarity matrix, for diagnostics and tests
    pub fn similarity_matrix(&self) -> &SimilarityMatrix {
        &self.similarity
    }

    fn seed_positions(&self, user: &User) -> Vec<usize> {
        let mut seeds: Vec<usize> = user
            .ratings
            .iter()
            .filter(|&(_, &rating)| rating >= LIKED_THRESHOLD)
            .filter_map(|(book_id, _)| self.book_pos.get(book_id).copied())
            .collect();
        seeds.sort_unstable();

        if seeds.is_empty() && !user.preferences.is_empty() {
            for (pos, category) in self.categories.iter().enumerate() {
                if user.preferences.contains(category) {
                    seeds.push(pos);
                    if seeds.len() >= MAX_CATEGORY_SEEDS {
                        break;
                    }
                }
            }
        }
        seeds
    }
}
