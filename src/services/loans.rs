//! Loan management service
//!
//! Orchestrates the loan state machine (open -> returned) against the
//! availability ledger. The friendly precondition checks here are repeated
//! atomically inside the store, so racing callers still serialize correctly.

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Issue a book to a user for `loan_days` days
    pub async fn issue_loan(&self, book_id: i32, user_id: i32, loan_days: i64) -> AppResult<Loan> {
        if loan_days <= 0 {
            return Err(AppError::InvalidArgument(
                "Loan period must be positive".to_string(),
            ));
        }

        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;

        if !self.repository.books.is_available(book_id).await? {
            return Err(AppError::Unavailable(format!(
                "No available copies of book {}",
                book_id
            )));
        }

        if self.repository.loans.has_open_loan(user_id, book_id).await? {
            return Err(AppError::Conflict(
                "User already has this book on loan".to_string(),
            ));
        }

        let loan = self.repository.loans.create(book_id, user_id, loan_days).await?;
        tracing::info!(
            "Loan {} issued: book {} to user {} until {}",
            loan.id, book_id, user_id, loan.due_date
        );
        Ok(loan)
    }

    /// Return a borrowed book.
    ///
    /// When `requesting_user_id` is given the loan must belong to that user;
    /// librarians returning on a borrower's behalf pass `None`.
    pub async fn return_loan(
        &self,
        loan_id: i32,
        requesting_user_id: Option<i32>,
    ) -> AppResult<Loan> {
        let loan = self.repository.loans.get_by_id(loan_id).await?;

        if let Some(user_id) = requesting_user_id {
            if loan.user_id != user_id {
                return Err(AppError::Forbidden(
                    "You can only return your own books".to_string(),
                ));
            }
        }

        let returned = self.repository.loans.mark_returned(loan_id).await?;
        tracing::info!("Loan {} returned: book {} back in circulation", loan_id, returned.book_id);
        Ok(returned)
    }

    /// Extend an open loan by `additional_days`
    pub async fn renew_loan(&self, loan_id: i32, additional_days: i64) -> AppResult<Loan> {
        if additional_days <= 0 {
            return Err(AppError::InvalidArgument(
                "Additional days must be positive".to_string(),
            ));
        }

        let loan = self.repository.loans.get_by_id(loan_id).await?;

        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Cannot renew a returned loan".to_string()));
        }

        if let Some(max_renewals) = self.config.max_renewals {
            if loan.renewals >= max_renewals {
                return Err(AppError::Conflict(format!(
                    "Maximum renewals reached ({}/{})",
                    loan.renewals, max_renewals
                )));
            }
        }

        self.repository.loans.renew(loan_id, additional_days).await
    }

    /// Get a loan by ID
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.repository.loans.get_by_id(loan_id).await
    }

    /// All open loans, soonest due first
    pub async fn get_active_loans(&self) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.active().await
    }

    /// Open loans past their due date
    pub async fn get_overdue_loans(&self) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.overdue().await
    }

    /// Full loan history for a user, most recent first
    pub async fn get_user_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.for_user(user_id).await
    }

    /// Open loans for a user, soonest due first
    pub async fn get_user_current_loans(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.loans.current_for_user(user_id).await
    }

    /// Whether the user currently has the book on loan
    pub async fn has_user_borrowed(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        self.repository.loans.has_open_loan(user_id, book_id).await
    }

    /// Whether at least one copy of the book can be loaned right now
    pub async fn is_book_available(&self, book_id: i32) -> AppResult<bool> {
        self.repository.books.is_available(book_id).await
    }

    /// Current lendable-copy count for a book
    pub async fn get_available_copies(&self, book_id: i32) -> AppResult<i32> {
        self.repository.books.available_copies(book_id).await
    }

    /// Count active loans
    pub async fn count_active(&self) -> AppResult<i64> {
        self.repository.loans.count_active().await
    }

    /// Count overdue loans
    pub async fn count_overdue(&self) -> AppResult<i64> {
        self.repository.loans.count_overdue().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::{MockLoanStore, MockUserStore};

    fn service(repository: Repository, max_renewals: Option<i16>) -> LoansService {
        LoansService::new(repository, LoansConfig { max_renewals })
    }

    #[tokio::test]
    async fn non_positive_loan_period_is_rejected_before_any_lookup() {
        let mut repository = Repository::in_memory();
        // Stores that panic on use prove the argument check short-circuits
        repository.users = Arc::new(MockUserStore::new());
        repository.loans = Arc::new(MockLoanStore::new());

        let svc = service(repository, None);
        for days in [0, -3] {
            let err = svc.issue_loan(1, 1, days).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn missing_user_short_circuits_before_ledger_work() {
        let mut repository = Repository::in_memory();

        let mut users = MockUserStore::new();
        users
            .expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("User with id {} not found", id))));
        repository.users = Arc::new(users);
        // No expectations: any loan-store call fails the test
        repository.loans = Arc::new(MockLoanStore::new());

        let svc = service(repository, None);
        let err = svc.issue_loan(1, 42, 14).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn renewal_cap_is_enforced_when_configured() {
        use crate::models::{book::CreateBook, user::CreateUser};

        let repository = Repository::in_memory();
        let book = repository
            .books
            .create(&CreateBook {
                title: "Dune".to_string(),
                isbn: "978-0-441-17271-9".to_string(),
                publisher: None,
                year: 1965,
                pages: 412,
                language: None,
                description: None,
                total_copies: 1,
                author_ids: vec![],
                genre_ids: vec![],
            })
            .await
            .unwrap();
        let user = repository
            .users
            .create(&CreateUser {
                email: "paul@arrakis.example".to_string(),
                full_name: "Paul Atreides".to_string(),
                role: None,
            })
            .await
            .unwrap();

        let svc = service(repository, Some(1));
        let loan = svc.issue_loan(book.id, user.id, 14).await.unwrap();

        svc.renew_loan(loan.id, 7).await.unwrap();
        let err = svc.renew_loan(loan.id, 7).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn uncapped_renewals_keep_extending_the_due_date() {
        use crate::models::{book::CreateBook, user::CreateUser};

        let repository = Repository::in_memory();
        let book = repository
            .books
            .create(&CreateBook {
                title: "Hyperion".to_string(),
                isbn: "978-0-553-28368-8".to_string(),
                publisher: None,
                year: 1989,
                pages: 482,
                language: None,
                description: None,
                total_copies: 1,
                author_ids: vec![],
                genre_ids: vec![],
            })
            .await
            .unwrap();
        let user = repository
            .users
            .create(&CreateUser {
                email: "sol@hegemony.example".to_string(),
                full_name: "Sol Weintraub".to_string(),
                role: None,
            })
            .await
            .unwrap();

        let svc = service(repository, None);
        let loan = svc.issue_loan(book.id, user.id, 7).await.unwrap();
        let mut due = loan.due_date;

        for _ in 0..5 {
            let renewed = svc.renew_loan(loan.id, 7).await.unwrap();
            assert_eq!(renewed.due_date, due + chrono::Duration::days(7));
            due = renewed.due_date;
        }
    }
}
