//! # Catalog Crate
//!
//! In-memory entity model and index layer for the book recommendation core.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Book, User, RatingEvent)
//! - **index**: The Catalog store with id/username/category indices
//! - **error**: Error types for entity validation and indexing
//!
//! Persistence is deliberately absent: a collaborator translates whatever
//! storage format it uses into these entities and hands them to the engine.
//!
//! ## Example Usage
//!
//! ```
//! use catalog::{Book, Catalog, User};
//!
//! let mut catalog = Catalog::new();
//! catalog.insert_book(Book::new("b1", "Dune", "Frank Herbert", "SciFi", "Sand")).unwrap();
//! catalog.insert_user(User::new(1, "alice", "pw-hash"));
//!
//! assert_eq!(catalog.get_book("b1").unwrap().title, "Dune");
//! assert_eq!(catalog.books_in_category("SciFi").len(), 1);
//! ```

// Public modules
pub mod error;
pub mod index;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CatalogError, Result};
pub use index::Catalog;
pub use types::{Book, BookId, Category, MAX_RATING, MIN_RATING, RatingEvent, User, UserId};
