//! Repository layer for database operations
//!
//! Each store is an async capability trait so the services stay polymorphic
//! over the backing storage: the Postgres adapters serve production, the
//! in-memory adapter serves the test suite.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, CreateBook, UpdateBook},
        genre::{CreateGenre, Genre, UpdateGenre},
        loan::{Loan, LoanDetails},
        reservation::{Reservation, ReservationDetails},
        user::{CreateUser, Role, User},
    },
};

/// Book storage, including the availability-ledger queries.
///
/// The `available_copies` counter is mutated only by loan transitions and by
/// `update` when `total_copies` changes; it is never written directly.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Book>;
    async fn get_details(&self, id: i32) -> AppResult<BookDetails>;
    async fn list(&self, search: Option<&str>) -> AppResult<Vec<BookDetails>>;
    async fn create(&self, book: &CreateBook) -> AppResult<BookDetails>;
    async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<BookDetails>;
    /// Fails with `Conflict` while copies are out on loan
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool>;
    async fn is_available(&self, id: i32) -> AppResult<bool>;
    async fn available_copies(&self, id: i32) -> AppResult<i32>;
    async fn by_author(&self, author_id: i32) -> AppResult<Vec<BookDetails>>;
    async fn by_genre(&self, genre_id: i32) -> AppResult<Vec<BookDetails>>;
    async fn count(&self) -> AppResult<i64>;
}

#[async_trait]
pub trait AuthorStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Author>;
    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Author>>;
    async fn create(&self, author: &CreateAuthor) -> AppResult<Author>;
    async fn update(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author>;
    /// Fails with `Conflict` while the author still has books
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn name_exists(&self, full_name: &str, exclude_id: Option<i32>) -> AppResult<bool>;
}

#[async_trait]
pub trait GenreStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Genre>;
    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Genre>>;
    async fn create(&self, genre: &CreateGenre) -> AppResult<Genre>;
    async fn update(&self, id: i32, genre: &UpdateGenre) -> AppResult<Genre>;
    /// Fails with `Conflict` while the genre still has books
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool>;
}

/// User accounts and role membership (the identity-directory surface;
/// authentication itself lives outside this server)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<User>;
    async fn list(&self) -> AppResult<Vec<User>>;
    async fn create(&self, user: &CreateUser) -> AppResult<User>;
    async fn update_role(&self, id: i32, role: Role) -> AppResult<User>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn exists(&self, id: i32) -> AppResult<bool>;
    async fn email_exists(&self, email: &str) -> AppResult<bool>;
    async fn count(&self) -> AppResult<i64>;
}

/// Loan storage. The mutating operations are transactional: they re-check
/// their preconditions and move the availability ledger in the same atomic
/// step, so concurrent callers serialize per book.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Atomically checks for a duplicate open loan, decrements the ledger
    /// and creates the loan. Fails with `Conflict`, `Unavailable` or
    /// `NotFound`.
    async fn create(&self, book_id: i32, user_id: i32, loan_days: i64) -> AppResult<Loan>;
    async fn get_by_id(&self, id: i32) -> AppResult<Loan>;
    /// Atomically sets the return date and increments the ledger. Fails with
    /// `Conflict` when the loan was already returned; the ledger moves at
    /// most once per loan.
    async fn mark_returned(&self, id: i32) -> AppResult<Loan>;
    /// Extends the due date and bumps the renewal counter of an open loan
    async fn renew(&self, id: i32, additional_days: i64) -> AppResult<Loan>;
    async fn active(&self) -> AppResult<Vec<LoanDetails>>;
    async fn overdue(&self) -> AppResult<Vec<LoanDetails>>;
    async fn for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>>;
    async fn current_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>>;
    async fn has_open_loan(&self, user_id: i32, book_id: i32) -> AppResult<bool>;
    async fn count_open_for_user(&self, user_id: i32) -> AppResult<i64>;
    async fn count_active(&self) -> AppResult<i64>;
    async fn count_overdue(&self) -> AppResult<i64>;
}

/// Reservation storage. Creation checks availability at reservation time but
/// deliberately leaves the ledger untouched.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Fails with `Conflict` when the user already holds an active
    /// reservation for the book, `Unavailable` when no copies are available
    async fn create(&self, book_id: i32, user_id: i32, reserve_days: i64) -> AppResult<Reservation>;
    async fn get_by_id(&self, id: i32) -> AppResult<Reservation>;
    async fn cancel(&self, id: i32) -> AppResult<Reservation>;
    /// Active reservations, soonest expiry first, optionally for one user
    async fn active(&self, user_id: Option<i32>) -> AppResult<Vec<ReservationDetails>>;
    /// Full reservation history for a user, most recent first
    async fn for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>>;
    async fn has_active(&self, user_id: i32, book_id: i32) -> AppResult<bool>;
    async fn count_active(&self) -> AppResult<i64>;
}

/// Main repository struct holding one store per entity
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub authors: Arc<dyn AuthorStore>,
    pub genres: Arc<dyn GenreStore>,
    pub users: Arc<dyn UserStore>,
    pub loans: Arc<dyn LoanStore>,
    pub reservations: Arc<dyn ReservationStore>,
}

impl Repository {
    /// Create a repository backed by the given Postgres pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(postgres::books::BooksRepository::new(pool.clone())),
            authors: Arc::new(postgres::authors::AuthorsRepository::new(pool.clone())),
            genres: Arc::new(postgres::genres::GenresRepository::new(pool.clone())),
            users: Arc::new(postgres::users::UsersRepository::new(pool.clone())),
            loans: Arc::new(postgres::loans::LoansRepository::new(pool.clone())),
            reservations: Arc::new(postgres::reservations::ReservationsRepository::new(pool)),
        }
    }

    /// Create a repository over shared in-memory state
    pub fn in_memory() -> Self {
        memory::repository()
    }
}
