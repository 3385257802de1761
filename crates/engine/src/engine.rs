//! # Recommendation Engine
//!
//! The orchestrator that owns all entities, indices and both recommender
//! models, and implements the hybrid cascade:
//! 1. Collaborative filtering (needs enough rating history)
//! 2. Content similarity
//! 3. Preferred categories ranked by aggregate rating
//! 4. Global top-rated
//! 5. Random fill from whatever unrated books remain
//!
//! Every stage appends only books the user has not rated and no earlier
//! stage already selected; the cascade stops as soon as `n` books are
//! collected and never fabricates entries.

use std::collections::HashSet;

use catalog::{Book, BookId, Catalog, CatalogError, Category, RatingEvent, Result, User};
use rand::rng;
use rand::seq::SliceRandom;
use recommenders::{CollaborativeFilteringModel, ContentBasedRecommender, SimilarityMatrix};
use tracing::{debug, info, instrument, warn};

/// Fewest ratings a user needs before collaborative filtering is attempted
pub const MIN_RATINGS_FOR_CF: usize = 3;

/// Neighborhood size used by the collaborative stage
pub const DEFAULT_K_NEIGHBORS: usize = 10;

/// Default number of recommendations per request
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 10;

/// Outcome of a bulk rating load: per-event failures are collected,
/// never aborting the rest of the batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub applied: usize,
    pub errors: Vec<CatalogError>,
}

/// Owns the catalog and both recommender models.
///
/// All operations are synchronous and run to completion; `&mut self` on
/// every writer gives a concurrent host the coarse exclusive-access
/// discipline the engine requires for free.
pub struct RecommendationEngine {
    catalog: Catalog,
    cf: Option<CollaborativeFilteringModel>,
    content: Option<ContentBasedRecommender>,
    /// Set when entity state has drifted from the built models; the next
    /// rebuild or recommendation call reconciles it
    models_stale: bool,
}

impl RecommendationEngine {
    /// Create an empty engine; models are built lazily once entities arrive
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            cf: None,
            content: None,
            models_stale: true,
        }
    }

    /// Build an engine from entity collections prepared by a collaborator
    pub fn from_entities(books: Vec<Book>, users: Vec<User>) -> Self {
        let mut engine = Self::new();
        engine.catalog = Catalog::from_entities(books, users);
        engine.rebuild_models();
        engine
    }

    /// Add a book to the catalog and all indices.
    ///
    /// Duplicate ids are rejected; a successful add marks the models stale.
    pub fn add_book(&mut self, book: Book) -> Result<()> {
        let id = book.id.clone();
        self.catalog.insert_book(book)?;
        self.models_stale = true;
        info!("Added book '{}' to the catalog", id);
        Ok(())
    }

    /// Register a user; idempotent on username collision.
    ///
    /// Returns true if the user was actually added.
    pub fn add_user(&mut self, user: User) -> bool {
        let username = user.username.clone();
        let added = self.catalog.insert_user(user);
        if added {
            self.models_stale = true;
            info!("Registered user '{}'", username);
        }
        added
    }

    /// Apply one rating event to the user, the book, and the collaborative
    /// model, as a single logical operation.
    ///
    /// Validation happens before any mutation, so a rejected value changes
    /// nothing. If the built model cannot absorb the update (the user or
    /// book arrived after the last rebuild) the engine marks itself stale
    /// and reconciles on the next rebuild or recommendation call.
    pub fn rate(&mut self, username: &str, book_id: &str, value: f32) -> Result<()> {
        let user_id = self
            .catalog
            .get_user(username)
            .map(|u| u.id)
            .ok_or_else(|| CatalogError::UnknownUser {
                username: username.to_string(),
            })?;
        self.catalog.apply_rating(username, book_id, value)?;

        let absorbed = self
            .cf
            .as_mut()
            .is_some_and(|cf| cf.update_rating(user_id, book_id, value));
        if !absorbed {
            self.models_stale = true;
        }

        info!("User '{}' rated '{}' with {:.1}", username, book_id, value);
        Ok(())
    }

    /// Apply a batch of rating events.
    ///
    /// Per-event validation failures are logged and collected in the
    /// report; they never abort the rest of the batch.
    pub fn apply_rating_events(&mut self, events: &[RatingEvent]) -> LoadReport {
        let mut report = LoadReport::default();
        for event in events {
            let outcome = event
                .parsed_value()
                .and_then(|value| self.rate(&event.username, &event.book_id, value));
            match outcome {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!(
                        "Skipping rating event ({} -> {}): {}",
                        event.username, event.book_id, err
                    );
                    report.errors.push(err);
                }
            }
        }
        info!(
            "Applied {} rating events, {} rejected",
            report.applied,
            report.errors.len()
        );
        report
    }

    /// Recompute both recommender models from current entity state.
    ///
    /// Callable at any time and idempotent: the same state always yields
    /// the same models.
    #[instrument(skip(self))]
    pub fn rebuild_models(&mut self) {
        let (users, books, ratings) = self.catalog.counts();
        debug!(users, books, ratings, "Rebuilding recommendation models");

        self.cf = Some(CollaborativeFilteringModel::new(
            self.catalog.users(),
            self.catalog.books(),
        ));
        self.content = Some(ContentBasedRecommender::new(self.catalog.books()));
        self.models_stale = false;
    }

    /// Recommend books for `username` using the default result count.
    pub fn recommend(&mut self, username: &str) -> Vec<Book> {
        self.get_recommendations(username, DEFAULT_RECOMMENDATION_COUNT)
    }

    /// Recommend up to `n` books for `username` via the hybrid cascade.
    ///
    /// Unknown users fail closed with an empty result. May return fewer
    /// than `n` books when every source is exhausted; never fabricates
    /// entries. Reconciles stale models before recommending.
    #[instrument(skip(self))]
    pub fn get_recommendations(&mut self, username: &str, n: usize) -> Vec<Book> {
        if self.models_stale {
            self.rebuild_models();
        }

        let Some(user) = self.catalog.get_user(username) else {
            warn!("Recommendations requested for unknown user '{}'", username);
            return Vec::new();
        };

        let mut picked: Vec<BookId> = Vec::new();
        let mut seen: HashSet<BookId> = HashSet::new();

        // Stage 1: collaborative filtering, only with enough history.
        // Ask for 2n candidates to survive post-filtering.
        if user.ratings.len() >= MIN_RATINGS_FOR_CF
            && let Some(cf) = &self.cf
        {
            let ids = cf.recommend(user, 2 * n, DEFAULT_K_NEIGHBORS);
            append_candidates(&mut picked, &mut seen, user, ids, n);
            debug!("After collaborative stage: {} picked", picked.len());
        }

        // Stage 2: content similarity
        if picked.len() < n
            && let Some(content) = &self.content
        {
            let ids = content.recommend(user, 2 * n);
            append_candidates(&mut picked, &mut seen, user, ids, n);
            debug!("After content stage: {} picked", picked.len());
        }

        // Stage 3: books from the user's preferred categories, best first
        if picked.len() < n && !user.preferences.is_empty() {
            let mut shelf: Vec<&Book> = user
                .preferences
                .iter()
                .flat_map(|category| self.catalog.books_in_category(category))
                .filter_map(|id| self.catalog.get_book(id))
                .collect();
            sort_by_aggregate(&mut shelf);
            let ids: Vec<BookId> = shelf.into_iter().map(|b| b.id.clone()).collect();
            append_candidates(&mut picked, &mut seen, user, ids, n);
            debug!("After preference stage: {} picked", picked.len());
        }

        // Stage 4: global top-rated, with a wide 3n net
        if picked.len() < n {
            let ids: Vec<BookId> = self
                .top_rated(3 * n)
                .into_iter()
                .map(|b| b.id.clone())
                .collect();
            append_candidates(&mut picked, &mut seen, user, ids, n);
            debug!("After top-rated stage: {} picked", picked.len());
        }

        // Stage 5: shuffle whatever unrated books remain
        if picked.len() < n {
            let mut pool: Vec<BookId> = self
                .catalog
                .books()
                .iter()
                .filter(|b| !user.has_rated(&b.id) && !seen.contains(&b.id))
                .map(|b| b.id.clone())
                .collect();
            pool.shuffle(&mut rng());
            append_candidates(&mut picked, &mut seen, user, pool, n);
            debug!("After random fill: {} picked", picked.len());
        }

        picked
            .iter()
            .filter_map(|id| self.catalog.get_book(id))
            .cloned()
            .collect()
    }

    /// The `n` best books in the catalog by (average rating, rating count)
    pub fn top_rated(&self, n: usize) -> Vec<&Book> {
        let mut books: Vec<&Book> = self.catalog.books().iter().collect();
        sort_by_aggregate(&mut books);
        books.truncate(n);
        books
    }

    // Catalog lookups, all failing closed on unknown keys

    /// Get a book by id
    pub fn get_book(&self, id: &str) -> Option<&Book> {
        self.catalog.get_book(id)
    }

    /// Get a user by username
    pub fn get_user(&self, username: &str) -> Option<&User> {
        self.catalog.get_user(username)
    }

    /// All books in a category
    pub fn get_books_by_category(&self, category: &str) -> Vec<&Book> {
        self.catalog
            .books_in_category(category)
            .iter()
            .filter_map(|id| self.catalog.get_book(id))
            .collect()
    }

    /// Every category currently in the catalog
    pub fn get_all_categories(&self) -> Vec<&Category> {
        self.catalog.categories()
    }

    /// User-user similarity table, for diagnostics and tests
    pub fn user_similarity_matrix(&self) -> Option<&SimilarityMatrix> {
        self.cf.as_ref().map(|cf| cf.similarity_matrix())
    }

    /// Book-book similarity table, for diagnostics and tests
    pub fn book_similarity_matrix(&self) -> Option<&SimilarityMatrix> {
        self.content.as_ref().map(|c| c.similarity_matrix())
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Append candidate ids the user has not rated and no prior stage selected,
/// stopping once `n` books are collected
fn append_candidates(
    picked: &mut Vec<BookId>,
    seen: &mut HashSet<BookId>,
    user: &User,
    candidates: impl IntoIterator<Item = BookId>,
    n: usize,
) {
    for id in candidates {
        if picked.len() >= n {
            break;
        }
        if user.has_rated(&id) || !seen.insert(id.clone()) {
            continue;
        }
        picked.push(id);
    }
}

/// Rank by (average rating desc, rating count desc), ties broken by id
/// so the ordering is deterministic
fn sort_by_aggregate(books: &mut [&Book]) {
    books.sort_by(|a, b| {
        b.average_rating()
            .partial_cmp(&a.average_rating())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.rating_count().cmp(&a.rating_count()))
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_engine() -> RecommendationEngine {
        let books = vec![
            Book::with_rating_history("b1", "Galactic War", "A", "SciFi", "space empire war", 4.5, 20),
            Book::with_rating_history("b2", "Star Fleet", "B", "SciFi", "space fleet war", 4.0, 10),
            Book::with_rating_history("b3", "Pasta Nights", "C", "Cooking", "pasta recipes", 3.5, 30),
            Book::with_rating_history("b4", "Bread Basics", "D", "Cooking", "baking bread", 4.5, 5),
            Book::new("b5", "Quiet Garden", "E", "Poetry", "verses about gardens"),
        ];
        let users = vec![
            User::new(1, "alice", "pw"),
            User::new(2, "bob", "pw"),
            User::new(3, "carol", "pw"),
        ];
        RecommendationEngine::from_entities(books, users)
    }

    #[test]
    fn test_rate_updates_user_and_book() {
        let mut engine = create_test_engine();
        engine.rate("alice", "b5", 5.0).unwrap();

        assert_eq!(engine.get_user("alice").unwrap().get_rating("b5"), Some(5.0));
        assert_eq!(engine.get_book("b5").unwrap().average_rating(), 5.0);
    }

    #[test]
    fn test_rate_absorbed_incrementally_or_marks_stale() {
        let mut engine = create_test_engine();
        engine.rebuild_models();

        // Known user and book: the built model absorbs the update in place
        engine.rate("alice", "b2", 5.0).unwrap();
        assert!(!engine.models_stale);

        // A book the model has never seen forces a rebuild on next use
        engine
            .add_book(Book::new("b9", "Late Arrival", "F", "SciFi", "space saga"))
            .unwrap();
        engine.models_stale = false;
        engine.rate("alice", "b9", 4.0).unwrap();
        assert!(engine.models_stale);
    }

    #[test]
    fn test_recommend_uses_default_count() {
        let mut engine = create_test_engine();
        for i in 0..15 {
            engine
                .add_book(Book::new(format!("x{i}"), format!("Extra {i}"), "X", "Misc", "filler words"))
                .unwrap();
        }

        let recs = engine.recommend("alice");
        assert_eq!(recs.len(), DEFAULT_RECOMMENDATION_COUNT);
    }

    #[test]
    fn test_rate_unknown_entities() {
        let mut engine = create_test_engine();
        assert!(matches!(
            engine.rate("ghost", "b1", 4.0),
            Err(CatalogError::UnknownUser { .. })
        ));
        assert!(matches!(
            engine.rate("alice", "b99", 4.0),
            Err(CatalogError::UnknownBook { .. })
        ));
    }

    #[test]
    fn test_add_user_idempotent() {
        let mut engine = create_test_engine();
        assert!(!engine.add_user(User::new(9, "alice", "other")));
        assert!(engine.add_user(User::new(9, "dave", "pw")));
    }

    #[test]
    fn test_add_book_updates_indices() {
        let mut engine = create_test_engine();
        engine
            .add_book(Book::new("b6", "New SciFi", "F", "SciFi", "robots"))
            .unwrap();

        assert!(engine.get_book("b6").is_some());
        assert_eq!(engine.get_books_by_category("SciFi").len(), 3);
        assert!(engine.get_all_categories().contains(&&"SciFi".to_string()));
    }

    #[test]
    fn test_top_rated_ordering() {
        let engine = create_test_engine();
        let top = engine.top_rated(3);

        // b1 and b4 share a 4.5 average; b1's 20 ratings beat b4's 5
        assert_eq!(top[0].id, "b1");
        assert_eq!(top[1].id, "b4");
        assert_eq!(top[2].id, "b2");
    }

    #[test]
    fn test_rebuild_models_idempotent() {
        let mut engine = create_test_engine();
        engine.rate("alice", "b1", 5.0).unwrap();
        engine.rate("bob", "b1", 4.0).unwrap();

        engine.rebuild_models();
        let first_users = engine.user_similarity_matrix().unwrap().clone();
        let first_books = engine.book_similarity_matrix().unwrap().clone();

        engine.rebuild_models();
        assert_eq!(engine.user_similarity_matrix().unwrap(), &first_users);
        assert_eq!(engine.book_similarity_matrix().unwrap(), &first_books);
    }

    #[test]
    fn test_bulk_load_collects_errors_without_aborting() {
        let mut engine = create_test_engine();
        let events = vec![
            RatingEvent::new("alice", "b1", "5.0"),
            RatingEvent::new("alice", "b2", "not-a-number"),
            RatingEvent::new("ghost", "b1", "4.0"),
            RatingEvent::new("bob", "b3", "9.0"),
            RatingEvent::new("bob", "b2", "4.0"),
        ];

        let report = engine.apply_rating_events(&events);
        assert_eq!(report.applied, 2);
        assert_eq!(report.errors.len(), 3);

        // The valid events landed despite the rejected ones
        assert_eq!(engine.get_user("alice").unwrap().get_rating("b1"), Some(5.0));
        assert_eq!(engine.get_user("bob").unwrap().get_rating("b2"), Some(4.0));
    }

    #[test]
    fn test_recommendations_unknown_user_fail_closed() {
        let mut engine = create_test_engine();
        assert!(engine.get_recommendations("ghost", 5).is_empty());
    }

    #[test]
    fn test_recommendations_capped_and_distinct() {
        let mut engine = create_test_engine();
        engine.rate("alice", "b1", 5.0).unwrap();

        let recs = engine.get_recommendations("alice", 3);
        assert!(recs.len() <= 3);

        let mut ids: Vec<&str> = recs.iter().map(|b| b.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), recs.len());
        assert!(!ids.contains(&"b1"));
    }
}
