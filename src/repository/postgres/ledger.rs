//! Availability ledger: the sole mutator of a book's available-copy counter.
//!
//! Both operations are conditional single-row UPDATEs executed on the
//! caller's transaction, so concurrent check-then-write sequences serialize
//! on the book row and the `0 <= available_copies <= total_copies` invariant
//! holds without a separate read.

use sqlx::PgConnection;

use crate::error::{AppError, AppResult};

/// Take one copy out of circulation. Fails with `Unavailable` when no copy
/// is left, `NotFound` when the book does not exist.
pub async fn decrement(conn: &mut PgConnection, book_id: i32) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE books SET available_copies = available_copies - 1 \
         WHERE id = $1 AND available_copies > 0",
    )
    .bind(book_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&mut *conn)
            .await?;
        if exists {
            return Err(AppError::Unavailable(format!(
                "No available copies of book {}",
                book_id
            )));
        }
        return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
    }

    Ok(())
}

/// Put one copy back into circulation. Exceeding `total_copies` is
/// unreachable from correct callers and reported as an invariant violation.
pub async fn increment(conn: &mut PgConnection, book_id: i32) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE books SET available_copies = available_copies + 1 \
         WHERE id = $1 AND available_copies < total_copies",
    )
    .bind(book_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&mut *conn)
            .await?;
        if exists {
            return Err(AppError::InvariantViolation(format!(
                "Available copies of book {} would exceed total copies",
                book_id
            )));
        }
        return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
    }

    Ok(())
}
