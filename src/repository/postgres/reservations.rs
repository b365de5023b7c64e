//! Reservations repository for database operations

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::reservation::{Reservation, ReservationDetails},
    repository::ReservationStore,
};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

const DETAILS_SELECT: &str = r#"
    SELECT r.*, b.title AS book_title, COALESCE(u.full_name, '') AS user_name
    FROM reservations r
    JOIN books b ON b.id = r.book_id
    LEFT JOIN users u ON u.id = r.user_id
"#;

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_details(row: &PgRow) -> ReservationDetails {
    let reservation = Reservation {
        id: row.get("id"),
        book_id: row.get("book_id"),
        user_id: row.get("user_id"),
        reservation_date: row.get("reservation_date"),
        expiry_date: row.get("expiry_date"),
        is_active: row.get("is_active"),
    };
    ReservationDetails::from_reservation(
        &reservation,
        row.get("book_title"),
        row.get("user_name"),
    )
}

#[async_trait]
impl ReservationStore for ReservationsRepository {
    async fn create(&self, book_id: i32, user_id: i32, reserve_days: i64) -> AppResult<Reservation> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Lock the book row so the availability check is stable for the
        // duration of the transaction; the ledger itself is not moved
        let available: bool = sqlx::query_scalar(
            "SELECT available_copies > 0 FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(book_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if !available {
            return Err(AppError::Unavailable(format!(
                "No available copies of book {}",
                book_id
            )));
        }

        let already_reserved: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reservations \
             WHERE user_id = $1 AND book_id = $2 AND is_active)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_reserved {
            return Err(AppError::Conflict(
                "User already has an active reservation for this book".to_string(),
            ));
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (book_id, user_id, reservation_date, expiry_date, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(now)
        .bind(now + Duration::days(reserve_days))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict(
                    "User already has an active reservation for this book".to_string(),
                )
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(reservation)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    async fn cancel(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET is_active = FALSE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    async fn active(&self, user_id: Option<i32>) -> AppResult<Vec<ReservationDetails>> {
        let rows = match user_id {
            Some(id) => {
                let sql = format!(
                    "{} WHERE r.is_active AND r.user_id = $1 ORDER BY r.expiry_date",
                    DETAILS_SELECT
                );
                sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?
            }
            None => {
                let sql = format!("{} WHERE r.is_active ORDER BY r.expiry_date", DETAILS_SELECT);
                sqlx::query(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(rows.iter().map(row_to_details).collect())
    }

    async fn for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        let sql = format!(
            "{} WHERE r.user_id = $1 ORDER BY r.reservation_date DESC",
            DETAILS_SELECT
        );
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_details).collect())
    }

    async fn has_active(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reservations \
             WHERE user_id = $1 AND book_id = $2 AND is_active)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_active(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE is_active")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
