//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::Author;
use super::genre::Genre;

/// Book model from database
///
/// `available_copies` is owned by the availability ledger: it moves only
/// through loan transitions and total-copies adjustments, never directly.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub publisher: Option<String>,
    pub year: i32,
    pub pages: i32,
    pub language: Option<String>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl Book {
    /// Number of copies currently out on loan
    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }
}

/// Book with its authors and genres for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub isbn: String,
    pub publisher: Option<String>,
    pub year: i32,
    pub pages: i32,
    pub language: Option<String>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub authors: Vec<Author>,
    pub genres: Vec<Genre>,
}

impl BookDetails {
    pub fn from_parts(book: Book, authors: Vec<Author>, genres: Vec<Genre>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            isbn: book.isbn,
            publisher: book.publisher,
            year: book.year,
            pages: book.pages,
            language: book.language,
            description: book.description,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            authors,
            genres,
        }
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "ISBN must not be empty"))]
    pub isbn: String,
    pub publisher: Option<String>,
    pub year: i32,
    #[validate(range(min = 0, message = "Pages must not be negative"))]
    pub pages: i32,
    pub language: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Total copies must not be negative"))]
    pub total_copies: i32,
    /// Authors to associate; unknown ids are skipped
    #[serde(default)]
    pub author_ids: Vec<i32>,
    /// Genres to associate; unknown ids are skipped
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Update book request
///
/// Changing `total_copies` preserves the copies currently on loan:
/// `available_copies` is recomputed, never supplied by the caller.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "ISBN must not be empty"))]
    pub isbn: String,
    pub publisher: Option<String>,
    pub year: i32,
    #[validate(range(min = 0, message = "Pages must not be negative"))]
    pub pages: i32,
    pub language: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Total copies must not be negative"))]
    pub total_copies: i32,
    #[serde(default)]
    pub author_ids: Vec<i32>,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
}

/// Query parameters for listing books
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive substring search over title, ISBN, publisher and
    /// author names
    pub search: Option<String>,
}
