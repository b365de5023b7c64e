//! Loan model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::AppError;

/// Violation of a loan's construction-time date invariants.
///
/// These are caller bugs rather than business outcomes: the operation that
/// produced such dates is rejected outright instead of being reported as a
/// normal precondition failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanDatesError {
    #[error("loan date cannot be in the future")]
    LoanDateInFuture,
    #[error("return date cannot be before loan date")]
    ReturnBeforeLoan,
}

impl From<LoanDatesError> for AppError {
    fn from(e: LoanDatesError) -> Self {
        AppError::InvariantViolation(e.to_string())
    }
}

/// Loan model from database
///
/// A loan is open while `return_date` is unset; once returned it is a
/// terminal historical record and is never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub renewals: i16,
}

impl Loan {
    /// Check the construction invariants on a loan's dates: the loan date
    /// must not be in the future, and the return date, when set, must be
    /// strictly after the loan date.
    pub fn check_dates(
        loan_date: DateTime<Utc>,
        return_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), LoanDatesError> {
        if loan_date > now {
            return Err(LoanDatesError::LoanDateInFuture);
        }
        if let Some(returned) = return_date {
            if returned <= loan_date {
                return Err(LoanDatesError::ReturnBeforeLoan);
            }
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// An open loan past its due date
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.return_date.is_none() && now > self.due_date
    }

    /// Whole days until the due date; negative once the loan is overdue
    pub fn days_until_due(&self, now: DateTime<Utc>) -> i64 {
        (self.due_date - now).num_days()
    }

    /// Whole days past the due date; negative while the loan is not yet due
    pub fn overdue_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.due_date).num_days()
    }
}

/// Loan with book and borrower context for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub book_title: String,
    pub user_name: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub renewals: i16,
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn from_loan(loan: &Loan, book_title: String, user_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: loan.id,
            book_id: loan.book_id,
            user_id: loan.user_id,
            book_title,
            user_name,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            renewals: loan.renewals,
            is_overdue: loan.is_overdue_at(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(now: DateTime<Utc>, due_in_days: i64, returned: bool) -> Loan {
        Loan {
            id: 1,
            book_id: 1,
            user_id: 1,
            loan_date: now - Duration::days(7),
            due_date: now + Duration::days(due_in_days),
            return_date: returned.then(|| now - Duration::days(1)),
            renewals: 0,
        }
    }

    #[test]
    fn future_loan_date_is_rejected() {
        let now = Utc::now();
        assert_eq!(
            Loan::check_dates(now + Duration::hours(1), None, now),
            Err(LoanDatesError::LoanDateInFuture)
        );
    }

    #[test]
    fn return_at_or_before_loan_date_is_rejected() {
        let now = Utc::now();
        let loaned = now - Duration::days(3);
        assert_eq!(
            Loan::check_dates(loaned, Some(loaned), now),
            Err(LoanDatesError::ReturnBeforeLoan)
        );
        assert_eq!(
            Loan::check_dates(loaned, Some(loaned - Duration::days(1)), now),
            Err(LoanDatesError::ReturnBeforeLoan)
        );
        assert!(Loan::check_dates(loaned, Some(loaned + Duration::hours(1)), now).is_ok());
    }

    #[test]
    fn overdue_only_while_open_and_past_due() {
        let now = Utc::now();
        assert!(loan(now, -2, false).is_overdue_at(now));
        assert!(!loan(now, 2, false).is_overdue_at(now));
        assert!(!loan(now, -2, true).is_overdue_at(now));
    }

    #[test]
    fn day_arithmetic_goes_negative_past_due() {
        let now = Utc::now();
        let l = loan(now, -3, false);
        assert_eq!(l.days_until_due(now), -3);
        assert_eq!(l.overdue_days(now), 3);
        assert_eq!(loan(now, 5, false).days_until_due(now), 5);
    }
}
