//! Core domain types for the book catalog.
//!
//! This module defines the entities the recommendation engine operates on:
//! - Type aliases for domain clarity (UserId, BookId, Category)
//! - `Book` with its running rating aggregate
//! - `User` with preferences, read history and per-book ratings
//! - `RatingEvent`, the unit of bulk rating ingestion

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a book (stable, immutable)
pub type BookId = String;

/// Single category tag attached to a book (e.g. "Fiction")
pub type Category = String;

/// Lowest rating a reader can give
pub const MIN_RATING: f32 = 1.0;

/// Highest rating a reader can give
pub const MAX_RATING: f32 = 5.0;

// =============================================================================
// Book
// =============================================================================

/// Represents a book in the catalog.
///
/// The rating aggregate is kept as a running (sum, count) pair so that
/// `add_rating` is O(1) and never re-scans history. The average is derived
/// on demand and rounded to two decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub category: Category,
    /// Free-text description used by the content-based recommender
    pub description: String,
    rating_sum: f32,
    rating_count: u32,
}

impl Book {
    /// Create a book with no rating history
    pub fn new(
        id: impl Into<BookId>,
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<Category>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            category: category.into(),
            description: description.into(),
            rating_sum: 0.0,
            rating_count: 0,
        }
    }

    /// Create a book carrying a pre-existing aggregate (e.g. from a
    /// collaborator that loaded `(average, count)` from storage).
    pub fn with_rating_history(
        id: impl Into<BookId>,
        title: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<Category>,
        description: impl Into<String>,
        average: f32,
        count: u32,
    ) -> Self {
        let mut book = Self::new(id, title, author, category, description);
        book.rating_sum = average * count as f32;
        book.rating_count = count;
        book
    }

    /// Average of all ratings ever applied, rounded to two decimals.
    /// 0.0 for a book nobody has rated yet.
    pub fn average_rating(&self) -> f32 {
        if self.rating_count == 0 {
            return 0.0;
        }
        round2(self.rating_sum / self.rating_count as f32)
    }

    /// How many ratings this book has received
    pub fn rating_count(&self) -> u32 {
        self.rating_count
    }

    /// Apply one rating to the running aggregate.
    ///
    /// Values outside [1.0, 5.0] are rejected and leave the aggregate
    /// untouched; the caller decides whether to log or surface the error.
    pub fn add_rating(&mut self, value: f32) -> Result<()> {
        validate_rating(value)?;
        self.rating_sum += value;
        self.rating_count += 1;
        Ok(())
    }

    /// Swap a previously applied rating for a new one.
    ///
    /// Retracts `old` from the running sum and applies `new` without
    /// changing the count, so a reader who re-rates is never counted twice.
    /// The caller guarantees `old` was actually applied before.
    pub fn replace_rating(&mut self, old: f32, new: f32) -> Result<()> {
        validate_rating(new)?;
        self.rating_sum += new - old;
        Ok(())
    }
}

/// Check a rating against the declared [1.0, 5.0] domain
pub(crate) fn validate_rating(value: f32) -> Result<()> {
    if !value.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(CatalogError::RatingOutOfRange { value });
    }
    Ok(())
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// User
// =============================================================================

/// Represents a registered reader.
///
/// Invariant: every book id present in `ratings` is also in `read_books`
/// (rating a book marks it as read).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique within the system; the engine indexes users by it
    pub username: String,
    /// Opaque credential, never interpreted by the core
    pub password_hash: String,
    /// Preferred categories in insertion order, duplicate-free
    pub preferences: Vec<Category>,
    /// Ids of every book the user has read
    pub read_books: HashSet<BookId>,
    /// The user's rating per book; re-rating overwrites
    pub ratings: HashMap<BookId, f32>,
}

impl User {
    /// Create a user with empty history
    pub fn new(id: UserId, username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            password_hash: password_hash.into(),
            preferences: Vec::new(),
            read_books: HashSet::new(),
            ratings: HashMap::new(),
        }
    }

    /// Add a preferred category; duplicates are ignored
    pub fn add_preference(&mut self, category: impl Into<Category>) {
        let category = category.into();
        if !self.preferences.contains(&category) {
            self.preferences.push(category);
        }
    }

    /// Mark a book as read
    pub fn add_read_book(&mut self, book_id: impl Into<BookId>) {
        self.read_books.insert(book_id.into());
    }

    /// Set (or overwrite) the user's rating for a book, and mark it read.
    ///
    /// Returns the previous rating if the user had already rated this book,
    /// so the caller can retract the old value from the book aggregate.
    pub fn add_rating(&mut self, book_id: impl Into<BookId>, value: f32) -> Option<f32> {
        let book_id = book_id.into();
        self.read_books.insert(book_id.clone());
        self.ratings.insert(book_id, value)
    }

    /// The user's rating for a book, if any
    pub fn get_rating(&self, book_id: &str) -> Option<f32> {
        self.ratings.get(book_id).copied()
    }

    /// True once the user has rated a book
    pub fn has_rated(&self, book_id: &str) -> bool {
        self.ratings.contains_key(book_id)
    }
}

// =============================================================================
// Rating Event
// =============================================================================

/// One `(user, book, score)` triple handed to the engine by a collaborator.
///
/// The score arrives as raw text because storage formats are not this
/// core's concern; `parsed_value` surfaces unparseable payloads as a
/// `CatalogError::InvalidRating` instead of silently dropping them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingEvent {
    pub username: String,
    pub book_id: BookId,
    pub value: String,
}

impl RatingEvent {
    pub fn new(
        username: impl Into<String>,
        book_id: impl Into<BookId>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            book_id: book_id.into(),
            value: value.into(),
        }
    }

    /// Interpret the raw score as a number
    pub fn parsed_value(&self) -> Result<f32> {
        self.value
            .trim()
            .parse::<f32>()
            .map_err(|_| CatalogError::InvalidRating {
                raw: self.value.clone(),
            })
    }
}
