//! Catalog: the in-memory store and index layer for books and users.
//!
//! The engine owns exactly one `Catalog`. All lookups go through the
//! indices below; the backing vectors keep insertion order, which the
//! recommenders rely on for deterministic matrix positions.

use crate::error::{CatalogError, Result};
use crate::types::{Book, BookId, Category, User};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Primary store plus secondary indices.
///
/// Invariant: every book/user ever inserted is reachable through all
/// relevant indices; the indices and the backing vectors never diverge.
#[derive(Debug, Default)]
pub struct Catalog {
    books: Vec<Book>,
    users: Vec<User>,

    /// Book id -> position in `books`
    book_pos: HashMap<BookId, usize>,
    /// Username -> position in `users`
    user_pos: HashMap<String, usize>,
    /// Books grouped by category, categories in sorted order
    category_index: BTreeMap<Category, Vec<BookId>>,
}

impl Catalog {
    /// Creates a new, empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from entity collections prepared by a collaborator
    pub fn from_entities(books: Vec<Book>, users: Vec<User>) -> Self {
        let mut catalog = Self::new();
        for book in books {
            // Duplicate ids in a bulk load are skipped, not fatal
            if let Err(err) = catalog.insert_book(book) {
                debug!("Skipping book during bulk load: {}", err);
            }
        }
        for user in users {
            catalog.insert_user(user);
        }
        catalog
    }

    /// Insert a book and update every index.
    ///
    /// Rejects a duplicate id so the aggregate of the existing entry is
    /// never silently discarded.
    pub fn insert_book(&mut self, book: Book) -> Result<()> {
        if self.book_pos.contains_key(&book.id) {
            return Err(CatalogError::DuplicateBook { id: book.id });
        }
        self.book_pos.insert(book.id.clone(), self.books.len());
        self.category_index
            .entry(book.category.clone())
            .or_default()
            .push(book.id.clone());
        self.books.push(book);
        Ok(())
    }

    /// Insert a user; idempotent on username collision.
    ///
    /// Returns true if the user was actually added.
    pub fn insert_user(&mut self, user: User) -> bool {
        if self.user_pos.contains_key(&user.username) {
            debug!("User '{}' already registered, skipping", user.username);
            return false;
        }
        self.user_pos.insert(user.username.clone(), self.users.len());
        self.users.push(user);
        true
    }

    // Getters return references and fail closed on unknown keys.

    /// Get a book by id
    pub fn get_book(&self, id: &str) -> Option<&Book> {
        self.book_pos.get(id).map(|&pos| &self.books[pos])
    }

    pub(crate) fn get_book_mut(&mut self, id: &str) -> Option<&mut Book> {
        let pos = *self.book_pos.get(id)?;
        Some(&mut self.books[pos])
    }

    /// Get a user by username
    pub fn get_user(&self, username: &str) -> Option<&User> {
        self.user_pos.get(username).map(|&pos| &self.users[pos])
    }

    pub(crate) fn get_user_mut(&mut self, username: &str) -> Option<&mut User> {
        let pos = *self.user_pos.get(username)?;
        Some(&mut self.users[pos])
    }

    /// Apply one rating to both sides of the relationship: the user's
    /// rating map (and read set) and the book's running aggregate.
    ///
    /// The value is validated before either entity is touched, so a
    /// rejected rating mutates nothing. Re-rating overwrites: the previous
    /// value is retracted from the book aggregate instead of double-counted.
    /// Returns the previous rating, if any.
    pub fn apply_rating(&mut self, username: &str, book_id: &str, value: f32) -> Result<Option<f32>> {
        crate::types::validate_rating(value)?;
        if !self.book_pos.contains_key(book_id) {
            return Err(CatalogError::UnknownBook {
                id: book_id.to_string(),
            });
        }
        let user = self
            .get_user_mut(username)
            .ok_or_else(|| CatalogError::UnknownUser {
                username: username.to_string(),
            })?;
        let previous = user.add_rating(book_id, value);

        if let Some(book) = self.get_book_mut(book_id) {
            match previous {
                Some(old) => book.replace_rating(old, value)?,
                None => book.add_rating(value)?,
            }
        }
        Ok(previous)
    }

    /// All books in insertion order
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// All users in insertion order
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Ids of every book in a category; empty slice for an unknown category
    pub fn books_in_category(&self, category: &str) -> &[BookId] {
        self.category_index
            .get(category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Every category currently present, in sorted order
    pub fn categories(&self) -> Vec<&Category> {
        self.category_index.keys().collect()
    }

    /// Get counts for debugging/validation
    pub fn counts(&self) -> (usize, usize, usize) {
        let total_ratings = self.users.iter().map(|u| u.ratings.len()).sum();
        (self.users.len(), self.books.len(), total_ratings)
    }
}
