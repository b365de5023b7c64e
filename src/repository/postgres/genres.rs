//! Genres repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::genre::{CreateGenre, Genre, UpdateGenre},
    repository::GenreStore,
};

#[derive(Clone)]
pub struct GenresRepository {
    pool: Pool<Postgres>,
}

impl GenresRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenreStore for GenresRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>("SELECT * FROM genres WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Genre>> {
        let genres = match search {
            Some(term) if !term.trim().is_empty() => {
                let pattern = format!("%{}%", term.trim());
                sqlx::query_as::<_, Genre>(
                    "SELECT * FROM genres \
                     WHERE name ILIKE $1 OR description ILIKE $1 \
                     ORDER BY name",
                )
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
            _ => {
                sqlx::query_as::<_, Genre>("SELECT * FROM genres ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(genres)
    }

    async fn create(&self, genre: &CreateGenre) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>(
            "INSERT INTO genres (name, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(&genre.name)
        .bind(&genre.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("Genre with this name already exists".to_string())
            } else {
                e.into()
            }
        })
    }

    async fn update(&self, id: i32, genre: &UpdateGenre) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>(
            "UPDATE genres SET name = $1, description = $2 WHERE id = $3 RETURNING *",
        )
        .bind(&genre.name)
        .bind(&genre.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("Genre with this name already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?
        .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM genres WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }

        let has_books: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_genres WHERE genre_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_books {
            return Err(AppError::Conflict(
                "Cannot delete a genre that still has books".to_string(),
            ));
        }

        sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM genres WHERE name = $1 AND id != $2)")
                .bind(name)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM genres WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }
}
