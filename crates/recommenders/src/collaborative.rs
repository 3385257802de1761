//! User-based collaborative filtering.
//!
//! A dense user x book rating matrix is built from every rating known to
//! the user objects, and a user-user cosine similarity matrix is derived
//! from its rows. Predictions for an unrated book are similarity-weighted
//! averages of neighbor ratings.
//!
//! The reverse indices (row -> user id, column -> book id) are computed
//! once per build; recommendation calls never reconstruct them.

use crate::similarity::{SimilarityMatrix, cosine, cosine_similarity_matrix};
use catalog::{Book, BookId, User, UserId};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// User-based collaborative filtering model
pub struct CollaborativeFilteringModel {
    user_ids: Vec<UserId>,
    book_ids: Vec<BookId>,
    user_pos: HashMap<UserId, usize>,
    book_pos: HashMap<BookId, usize>,

    /// Dense user x book matrix; 0.0 marks "unrated" (valid ratings start at 1.0)
    ratings: Vec<Vec<f32>>,
    user_similarity: SimilarityMatrix,
}

impl CollaborativeFilteringModel {
    /// Build the model from the current user and book collections.
    ///
    /// Ratings referencing books unknown to the catalog are skipped. With
    /// zero ratings anywhere the similarity matrix is the identity (each
    /// user similar only to self), so recommendation naturally yields no
    /// candidates instead of failing.
    pub fn new(users: &[User], books: &[Book]) -> Self {
        let user_ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let book_ids: Vec<BookId> = books.iter().map(|b| b.id.clone()).collect();
        let user_pos: HashMap<UserId, usize> =
            user_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let book_pos: HashMap<BookId, usize> = book_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut ratings = vec![vec![0.0; book_ids.len()]; user_ids.len()];
        let mut observed = 0usize;
        for (row, user) in users.iter().enumerate() {
            for (book_id, &value) in &user.ratings {
                if let Some(&col) = book_pos.get(book_id) {
                    ratings[row][col] = value;
                    observed += 1;
                }
            }
        }

        let user_similarity = cosine_similarity_matrix(&ratings);
        debug!(
            users = user_ids.len(),
            books = book_ids.len(),
            observed,
            "Built collaborative filtering model"
        );

        Self {
            user_ids,
            book_ids,
            user_pos,
            book_pos,
            ratings,
            user_similarity,
        }
    }

    /// Recommend up to `n` unrated books for `user` using its `k_neighbors`
    /// most similar other users.
    ///
    /// Fails closed (empty result) when the user is unknown to the model.
    /// Neighbors with similarity <= 0 carry no signal and are dropped; a
    /// candidate book scored by zero contributing neighbors is excluded
    /// rather than scored as zero. Ordering is deterministic: neighbors by
    /// (similarity desc, row asc), candidates by (score desc, column asc).
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub fn recommend(&self, user: &User, n: usize, k_neighbors: usize) -> Vec<BookId> {
        let Some(&target) = self.user_pos.get(&user.id) else {
            debug!("User unknown to collaborative model");
            return Vec::new();
        };

        let similarities = &self.user_similarity[target];
        let mut neighbors: Vec<usize> = (0..self.user_ids.len()).filter(|&i| i != target).collect();
        neighbors.sort_by(|&a, &b| {
            similarities[b]
                .partial_cmp(&similarities[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        neighbors.truncate(k_neighbors);
        neighbors.retain(|&i| similarities[i] > 0.0);

        if neighbors.is_empty() {
            debug!("No positively similar neighbors, collaborative stage yields nothing");
            return Vec::new();
        }

        let mut candidates: Vec<(usize, f32)> = Vec::new();
        for col in 0..self.book_ids.len() {
            if self.ratings[target][col] > 0.0 {
                continue;
            }
            let mut weighted_sum = 0.0;
            let mut similarity_sum = 0.0;
            for &neighbor in &neighbors {
                let rating = self.ratings[neighbor][col];
                if rating > 0.0 {
                    weighted_sum += similarities[neighbor] * rating;
                    similarity_sum += similarities[neighbor];
                }
            }
            if similarity_sum > 0.0 {
                candidates.push((col, weighted_sum / similarity_sum));
            }
        }

        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        candidates.truncate(n);

        candidates
            .into_iter()
            .map(|(col, _)| self.book_ids[col].clone())
            .collect()
    }

    /// Reflect one rating change without a full rebuild.
    ///
    /// Sets the matrix cell and recomputes only the similarity row/column of
    /// the affected user; the outcome matches a fresh build from the same
    /// entity state. Returns false when the user or book is unknown to the
    /// built matrices, signalling the caller to schedule a rebuild.
    pub fn update_rating(&mut self, user_id: UserId, book_id: &str, value: f32) -> bool {
        let (Some(&row), Some(&col)) = (self.user_pos.get(&user_id), self.book_pos.get(book_id))
        else {
            debug!(user_id, book_id, "Rating update outside model, marking stale");
            return false;
        };

        self.ratings[row][col] = value;
        for other in 0..self.user_ids.len() {
            let sim = if other == row {
                1.0
            } else {
                cosine(&self.ratings[row], &self.ratings[other])
            };
            self.user_similarity[row][other] = sim;
            self.user_similarity[other][row] = sim;
        }
        true
    }

    /// The user-user similarity matrix, for diagnostics and tests
    pub fn similarity_matrix(&self) -> &SimilarityMatrix {
        &self.user_similarity
    }
}
