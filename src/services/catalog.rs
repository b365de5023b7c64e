//! Catalog management service: books, authors and genres

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{BookDetails, CreateBook, UpdateBook},
        genre::{CreateGenre, Genre, UpdateGenre},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // Books

    /// List books with their authors and genres, optionally filtered by a
    /// search term
    pub async fn list_books(&self, search: Option<&str>) -> AppResult<Vec<BookDetails>> {
        self.repository.books.list(search).await
    }

    /// Get book details by ID
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    /// Create a new book; its available copies start equal to total copies
    pub async fn create_book(&self, book: CreateBook) -> AppResult<BookDetails> {
        book.validate()?;

        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Conflict(
                "Book with this ISBN already exists".to_string(),
            ));
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!("Book {} created: {}", created.id, created.title);
        Ok(created)
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<BookDetails> {
        book.validate()?;

        if self.repository.books.isbn_exists(&book.isbn, Some(id)).await? {
            return Err(AppError::Conflict(
                "Book with this ISBN already exists".to_string(),
            ));
        }

        self.repository.books.update(id, &book).await
    }

    /// Delete a book; fails while copies are out on loan
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    // Authors

    pub async fn list_authors(&self, search: Option<&str>) -> AppResult<Vec<Author>> {
        self.repository.authors.list(search).await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        author.validate()?;

        if self
            .repository
            .authors
            .name_exists(&author.full_name, None)
            .await?
        {
            return Err(AppError::Conflict(
                "Author with this name already exists".to_string(),
            ));
        }

        self.repository.authors.create(&author).await
    }

    pub async fn update_author(&self, id: i32, author: UpdateAuthor) -> AppResult<Author> {
        author.validate()?;

        if self
            .repository
            .authors
            .name_exists(&author.full_name, Some(id))
            .await?
        {
            return Err(AppError::Conflict(
                "Author with this name already exists".to_string(),
            ));
        }

        self.repository.authors.update(id, &author).await
    }

    /// Delete an author; fails while the author still has books
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await
    }

    /// Books by a given author
    pub async fn get_books_by_author(&self, author_id: i32) -> AppResult<Vec<BookDetails>> {
        // Verify author exists
        self.repository.authors.get_by_id(author_id).await?;
        self.repository.books.by_author(author_id).await
    }

    // Genres

    pub async fn list_genres(&self, search: Option<&str>) -> AppResult<Vec<Genre>> {
        self.repository.genres.list(search).await
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.repository.genres.get_by_id(id).await
    }

    pub async fn create_genre(&self, genre: CreateGenre) -> AppResult<Genre> {
        genre.validate()?;

        if self.repository.genres.name_exists(&genre.name, None).await? {
            return Err(AppError::Conflict(
                "Genre with this name already exists".to_string(),
            ));
        }

        self.repository.genres.create(&genre).await
    }

    pub async fn update_genre(&self, id: i32, genre: UpdateGenre) -> AppResult<Genre> {
        genre.validate()?;

        if self
            .repository
            .genres
            .name_exists(&genre.name, Some(id))
            .await?
        {
            return Err(AppError::Conflict(
                "Genre with this name already exists".to_string(),
            ));
        }

        self.repository.genres.update(id, &genre).await
    }

    /// Delete a genre; fails while the genre still has books
    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.repository.genres.delete(id).await
    }

    /// Books in a given genre
    pub async fn get_books_by_genre(&self, genre_id: i32) -> AppResult<Vec<BookDetails>> {
        // Verify genre exists
        self.repository.genres.get_by_id(genre_id).await?;
        self.repository.books.by_genre(genre_id).await
    }
}
