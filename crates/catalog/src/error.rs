//! Error types for the catalog crate.

use crate::types::BookId;
use thiserror::Error;

/// Errors raised by entity mutation and catalog indexing
///
/// Lookup misses are deliberately NOT errors: query methods return
/// `Option`/empty slices so that recommendation paths can fail closed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// A rating value falls outside the declared [1.0, 5.0] domain
    #[error("Rating {value} is outside the valid range (1.0-5.0)")]
    RatingOutOfRange { value: f32 },

    /// A rating payload could not be interpreted as a number
    ///
    /// Only reachable from bulk event ingestion, where values arrive
    /// as untyped text from a collaborator.
    #[error("Rating '{raw}' is not a valid number")]
    InvalidRating { raw: String },

    /// Rating targets a user the engine has never seen
    #[error("Unknown user '{username}'")]
    UnknownUser { username: String },

    /// Rating or lookup targets a book the engine has never seen
    #[error("Unknown book '{id}'")]
    UnknownBook { id: BookId },

    /// `add_book` was called with an id already in the catalog
    #[error("Book '{id}' is already in the catalog")]
    DuplicateBook { id: BookId },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
