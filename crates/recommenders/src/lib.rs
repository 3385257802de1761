//! # Recommenders Crate
//!
//! The two recommendation models the engine blends, plus their shared
//! numeric plumbing.
//!
//! ## Components
//!
//! ### Collaborative Filtering (user-based)
//! "Readers who rate like you also liked..." — user-user cosine similarity
//! over the rating matrix, similarity-weighted neighbor predictions.
//!
//! ### Content-Based
//! "More books like the ones you liked..." — TF-IDF over descriptions,
//! book-book cosine similarity, mean similarity to seed books.
//!
//! Both models are pure in-memory computation built from the catalog's
//! current entity state; both fail closed (empty results) on cold-start
//! conditions instead of erroring.
//!
//! ## Example Usage
//!
//! ```
//! use catalog::{Book, User};
//! use recommenders::{CollaborativeFilteringModel, ContentBasedRecommender};
//!
//! let books = vec![Book::new("b1", "Dune", "Herbert", "SciFi", "desert spice empire")];
//! let users = vec![User::new(1, "alice", "pw")];
//!
//! let cf = CollaborativeFilteringModel::new(&users, &books);
//! let content = ContentBasedRecommender::new(&books);
//!
//! // No ratings or seeds yet: both stages yield nothing, never an error
//! assert!(cf.recommend(&users[0], 5, 10).is_empty());
//! assert!(content.recommend(&users[0], 5).is_empty());
//! ```

// Public modules
pub mod collaborative;
pub mod content;
pub mod similarity;
pub mod tfidf;

// Re-export commonly used types
pub use collaborative::CollaborativeFilteringModel;
pub use content::{ContentBasedRecommender, LIKED_THRESHOLD};
pub use similarity::SimilarityMatrix;
pub use tfidf::TfidfVectorizer;
