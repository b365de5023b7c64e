//! Loans repository for database operations
//!
//! Every mutating operation runs as one transaction with the ledger so a
//! failed precondition never leaves a partial write behind.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails},
    repository::LoanStore,
};

use super::ledger;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

const DETAILS_SELECT: &str = r#"
    SELECT l.*, b.title AS book_title, COALESCE(u.full_name, '') AS user_name
    FROM loans l
    JOIN books b ON b.id = l.book_id
    LEFT JOIN users u ON u.id = l.user_id
"#;

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_details(&self, clause: &str, bind: Option<i32>) -> AppResult<Vec<LoanDetails>> {
        let sql = format!("{} {}", DETAILS_SELECT, clause);
        let query = sqlx::query(&sql);
        let rows = match bind {
            Some(id) => query.bind(id).fetch_all(&self.pool).await?,
            None => query.fetch_all(&self.pool).await?,
        };

        let now = Utc::now();
        Ok(rows.iter().map(|row| row_to_details(row, now)).collect())
    }
}

fn row_to_details(row: &PgRow, now: chrono::DateTime<Utc>) -> LoanDetails {
    let loan = Loan {
        id: row.get("id"),
        book_id: row.get("book_id"),
        user_id: row.get("user_id"),
        loan_date: row.get("loan_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        renewals: row.get("renewals"),
    };
    LoanDetails::from_loan(&loan, row.get("book_title"), row.get("user_name"), now)
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn create(&self, book_id: i32, user_id: i32, loan_days: i64) -> AppResult<Loan> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let already_borrowed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans \
             WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_borrowed {
            return Err(AppError::Conflict(
                "User already has this book on loan".to_string(),
            ));
        }

        ledger::decrement(&mut *tx, book_id).await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, user_id, loan_date, due_date, renewals)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(now)
        .bind(now + Duration::days(loan_days))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            // The partial unique index on open (book_id, user_id) closes the
            // race two same-user issuers could otherwise win together
            if crate::error::is_unique_violation(&e) {
                AppError::Conflict("User already has this book on loan".to_string())
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;
        Ok(loan)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn mark_returned(&self, id: i32) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Loan already returned".to_string()));
        }

        let now = Utc::now();
        Loan::check_dates(loan.loan_date, Some(now), now)?;

        let returned = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET return_date = $1 WHERE id = $2 RETURNING *",
        )
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        ledger::increment(&mut *tx, loan.book_id).await?;

        tx.commit().await?;
        Ok(returned)
    }

    async fn renew(&self, id: i32, additional_days: i64) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;

        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Cannot renew a returned loan".to_string()));
        }

        let renewed = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET due_date = $1, renewals = $2 WHERE id = $3 RETURNING *",
        )
        .bind(loan.due_date + Duration::days(additional_days))
        .bind(loan.renewals + 1)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(renewed)
    }

    async fn active(&self) -> AppResult<Vec<LoanDetails>> {
        self.fetch_details("WHERE l.return_date IS NULL ORDER BY l.due_date", None)
            .await
    }

    async fn overdue(&self) -> AppResult<Vec<LoanDetails>> {
        self.fetch_details(
            "WHERE l.return_date IS NULL AND l.due_date < NOW() ORDER BY l.due_date",
            None,
        )
        .await
    }

    async fn for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.fetch_details("WHERE l.user_id = $1 ORDER BY l.loan_date DESC", Some(user_id))
            .await
    }

    async fn current_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.fetch_details(
            "WHERE l.user_id = $1 AND l.return_date IS NULL ORDER BY l.due_date",
            Some(user_id),
        )
        .await
    }

    async fn has_open_loan(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans \
             WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_open_for_user(&self, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE user_id = $1 AND return_date IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE return_date IS NULL AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
