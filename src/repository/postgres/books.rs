//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{Book, BookDetails, CreateBook, UpdateBook},
        genre::Genre,
    },
    repository::BookStore,
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn authors_for(&self, book_id: i32) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT a.id, a.full_name, a.biography
            FROM authors a
            JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = $1
            ORDER BY a.full_name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }

    async fn genres_for(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            r#"
            SELECT g.id, g.name, g.description
            FROM genres g
            JOIN book_genres bg ON bg.genre_id = g.id
            WHERE bg.book_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn with_associations(&self, books: Vec<Book>) -> AppResult<Vec<BookDetails>> {
        let mut result = Vec::with_capacity(books.len());
        for book in books {
            let authors = self.authors_for(book.id).await?;
            let genres = self.genres_for(book.id).await?;
            result.push(BookDetails::from_parts(book, authors, genres));
        }
        Ok(result)
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.get_by_id(id).await?;
        let authors = self.authors_for(id).await?;
        let genres = self.genres_for(id).await?;
        Ok(BookDetails::from_parts(book, authors, genres))
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<BookDetails>> {
        let books = match search {
            Some(term) if !term.trim().is_empty() => {
                let pattern = format!("%{}%", term.trim());
                sqlx::query_as::<_, Book>(
                    r#"
                    SELECT DISTINCT b.*
                    FROM books b
                    LEFT JOIN book_authors ba ON ba.book_id = b.id
                    LEFT JOIN authors a ON a.id = ba.author_id
                    WHERE b.title ILIKE $1
                       OR b.isbn ILIKE $1
                       OR b.publisher ILIKE $1
                       OR a.full_name ILIKE $1
                    ORDER BY b.title
                    "#,
                )
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY title")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        self.with_associations(books).await
    }

    async fn create(&self, book: &CreateBook) -> AppResult<BookDetails> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, isbn, publisher, year, pages, language,
                               description, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.year)
        .bind(book.pages)
        .bind(&book.language)
        .bind(&book.description)
        .bind(book.total_copies)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("Book with this ISBN already exists".to_string())
            } else {
                e.into()
            }
        })?;

        // Unknown author/genre ids are skipped rather than rejected
        sqlx::query(
            "INSERT INTO book_authors (book_id, author_id) \
             SELECT $1, id FROM authors WHERE id = ANY($2)",
        )
        .bind(created.id)
        .bind(&book.author_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO book_genres (book_id, genre_id) \
             SELECT $1, id FROM genres WHERE id = ANY($2)",
        )
        .bind(created.id)
        .bind(&book.genre_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_details(created.id).await
    }

    async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<BookDetails> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        // Copies already out on loan stay out; the ledger counter is derived
        // from the new total rather than taken from the caller
        let on_loan = existing.copies_on_loan();
        if book.total_copies < on_loan {
            return Err(AppError::Conflict(format!(
                "Cannot reduce total copies below the {} currently on loan",
                on_loan
            )));
        }

        sqlx::query(
            r#"
            UPDATE books
            SET title = $1, isbn = $2, publisher = $3, year = $4, pages = $5,
                language = $6, description = $7, total_copies = $8,
                available_copies = $9
            WHERE id = $10
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.year)
        .bind(book.pages)
        .bind(&book.language)
        .bind(&book.description)
        .bind(book.total_copies)
        .bind(book.total_copies - on_loan)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("Book with this ISBN already exists".to_string())
            } else {
                e.into()
            }
        })?;

        // Reconcile associations: drop the ones no longer listed, add new ones
        sqlx::query("DELETE FROM book_authors WHERE book_id = $1 AND author_id != ALL($2)")
            .bind(id)
            .bind(&book.author_ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO book_authors (book_id, author_id) \
             SELECT $1, id FROM authors WHERE id = ANY($2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&book.author_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM book_genres WHERE book_id = $1 AND genre_id != ALL($2)")
            .bind(id)
            .bind(&book.genre_ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO book_genres (book_id, genre_id) \
             SELECT $1, id FROM genres WHERE id = ANY($2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(&book.genre_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_details(id).await
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if book.available_copies != book.total_copies {
            return Err(AppError::Conflict(
                "Cannot delete a book while copies are out on loan".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    async fn is_available(&self, id: i32) -> AppResult<bool> {
        sqlx::query_scalar("SELECT available_copies > 0 FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn available_copies(&self, id: i32) -> AppResult<i32> {
        sqlx::query_scalar("SELECT available_copies FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn by_author(&self, author_id: i32) -> AppResult<Vec<BookDetails>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT b.*
            FROM books b
            JOIN book_authors ba ON ba.book_id = b.id
            WHERE ba.author_id = $1
            ORDER BY b.title
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_associations(books).await
    }

    async fn by_genre(&self, genre_id: i32) -> AppResult<Vec<BookDetails>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT b.*
            FROM books b
            JOIN book_genres bg ON bg.book_id = b.id
            WHERE bg.genre_id = $1
            ORDER BY b.title
            "#,
        )
        .bind(genre_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_associations(books).await
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
