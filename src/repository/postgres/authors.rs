//! Authors repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::author::{Author, CreateAuthor, UpdateAuthor},
    repository::AuthorStore,
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorStore for AuthorsRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Author>> {
        let authors = match search {
            Some(term) if !term.trim().is_empty() => {
                let pattern = format!("%{}%", term.trim());
                sqlx::query_as::<_, Author>(
                    "SELECT * FROM authors \
                     WHERE full_name ILIKE $1 OR biography ILIKE $1 \
                     ORDER BY full_name",
                )
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, Author>("SELECT * FROM authors ORDER BY full_name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(authors)
    }

    async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            "INSERT INTO authors (full_name, biography) VALUES ($1, $2) RETURNING *",
        )
        .bind(&author.full_name)
        .bind(&author.biography)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("Author with this name already exists".to_string())
            } else {
                e.into()
            }
        })
    }

    async fn update(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            "UPDATE authors SET full_name = $1, biography = $2 WHERE id = $3 RETURNING *",
        )
        .bind(&author.full_name)
        .bind(&author.biography)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("Author with this name already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }

        let has_books: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_authors WHERE author_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_books {
            return Err(AppError::Conflict(
                "Cannot delete an author who still has books".to_string(),
            ));
        }

        sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn name_exists(&self, full_name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM authors WHERE full_name = $1 AND id != $2)",
            )
            .bind(full_name)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM authors WHERE full_name = $1)")
                .bind(full_name)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }
}
