//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Role, User},
    repository::UserStore,
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        role: Role::from(row.get::<String, _>("role").as_str()),
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        Ok(row_to_user(&row))
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY full_name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_user).collect())
    }

    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let role = user.role.unwrap_or_default();
        let row = sqlx::query(
            r#"
            INSERT INTO users (email, full_name, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("User with this email already exists".to_string())
            } else {
                e.into()
            }
        })?;
        Ok(row_to_user(&row))
    }

    async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        let row = sqlx::query("UPDATE users SET role = $1 WHERE id = $2 RETURNING *")
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        Ok(row_to_user(&row))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
