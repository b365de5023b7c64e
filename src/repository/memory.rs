//! In-memory adapters for the store traits
//!
//! All stores share one mutex-guarded state. Every composite operation runs
//! under a single lock acquisition, which gives check-then-write sequences
//! the same serialization the Postgres adapters get from transactions. Used
//! by the test suite.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, CreateBook, UpdateBook},
        genre::{CreateGenre, Genre, UpdateGenre},
        loan::{Loan, LoanDetails},
        reservation::{Reservation, ReservationDetails},
        user::{CreateUser, Role, User},
    },
    repository::{
        AuthorStore, BookStore, GenreStore, LoanStore, Repository, ReservationStore, UserStore,
    },
};

#[derive(Default)]
struct State {
    books: BTreeMap<i32, Book>,
    authors: BTreeMap<i32, Author>,
    genres: BTreeMap<i32, Genre>,
    users: BTreeMap<i32, User>,
    loans: BTreeMap<i32, Loan>,
    reservations: BTreeMap<i32, Reservation>,
    book_authors: Vec<(i32, i32)>,
    book_genres: Vec<(i32, i32)>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn book_details(&self, book: &Book) -> BookDetails {
        let mut authors: Vec<Author> = self
            .book_authors
            .iter()
            .filter(|(b, _)| *b == book.id)
            .filter_map(|(_, a)| self.authors.get(a))
            .cloned()
            .collect();
        authors.sort_by(|a, b| a.full_name.cmp(&b.full_name));

        let mut genres: Vec<Genre> = self
            .book_genres
            .iter()
            .filter(|(b, _)| *b == book.id)
            .filter_map(|(_, g)| self.genres.get(g))
            .cloned()
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));

        BookDetails::from_parts(book.clone(), authors, genres)
    }

    fn loan_details(&self, loan: &Loan, now: chrono::DateTime<Utc>) -> LoanDetails {
        let book_title = self
            .books
            .get(&loan.book_id)
            .map(|b| b.title.clone())
            .unwrap_or_default();
        let user_name = self
            .users
            .get(&loan.user_id)
            .map(|u| u.full_name.clone())
            .unwrap_or_default();
        LoanDetails::from_loan(loan, book_title, user_name, now)
    }

    fn reservation_details(&self, r: &Reservation) -> ReservationDetails {
        let book_title = self
            .books
            .get(&r.book_id)
            .map(|b| b.title.clone())
            .unwrap_or_default();
        let user_name = self
            .users
            .get(&r.user_id)
            .map(|u| u.full_name.clone())
            .unwrap_or_default();
        ReservationDetails::from_reservation(r, book_title, user_name)
    }

    // Ledger rules, mirroring the conditional UPDATEs of the Postgres path

    fn ledger_decrement(&mut self, book_id: i32) -> AppResult<()> {
        let book = self
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        if book.available_copies == 0 {
            return Err(AppError::Unavailable(format!(
                "No available copies of book {}",
                book_id
            )));
        }
        book.available_copies -= 1;
        Ok(())
    }

    fn ledger_increment(&mut self, book_id: i32) -> AppResult<()> {
        let book = self
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        if book.available_copies >= book.total_copies {
            return Err(AppError::InvariantViolation(format!(
                "Available copies of book {} would exceed total copies",
                book_id
            )));
        }
        book.available_copies += 1;
        Ok(())
    }
}

fn lock(state: &Mutex<State>) -> AppResult<MutexGuard<'_, State>> {
    state
        .lock()
        .map_err(|_| AppError::Internal("in-memory state lock poisoned".to_string()))
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Create a repository over fresh shared in-memory state
pub fn repository() -> Repository {
    let state = Arc::new(Mutex::new(State::default()));
    Repository {
        books: Arc::new(MemoryBooks(state.clone())),
        authors: Arc::new(MemoryAuthors(state.clone())),
        genres: Arc::new(MemoryGenres(state.clone())),
        users: Arc::new(MemoryUsers(state.clone())),
        loans: Arc::new(MemoryLoans(state.clone())),
        reservations: Arc::new(MemoryReservations(state)),
    }
}

pub struct MemoryBooks(Arc<Mutex<State>>);
pub struct MemoryAuthors(Arc<Mutex<State>>);
pub struct MemoryGenres(Arc<Mutex<State>>);
pub struct MemoryUsers(Arc<Mutex<State>>);
pub struct MemoryLoans(Arc<Mutex<State>>);
pub struct MemoryReservations(Arc<Mutex<State>>);

#[async_trait]
impl BookStore for MemoryBooks {
    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let state = lock(&self.0)?;
        state
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let state = lock(&self.0)?;
        let book = state
            .books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        Ok(state.book_details(book))
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<BookDetails>> {
        let state = lock(&self.0)?;
        let mut details: Vec<BookDetails> = state
            .books
            .values()
            .map(|b| state.book_details(b))
            .filter(|d| match search {
                Some(term) if !term.trim().is_empty() => {
                    let term = term.trim();
                    contains(&d.title, term)
                        || contains(&d.isbn, term)
                        || d.publisher.as_deref().map(|p| contains(p, term)).unwrap_or(false)
                        || d.authors.iter().any(|a| contains(&a.full_name, term))
                }
                _ => true,
            })
            .collect();
        details.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(details)
    }

    async fn create(&self, book: &CreateBook) -> AppResult<BookDetails> {
        let mut state = lock(&self.0)?;
        if state.books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::Conflict("Book with this ISBN already exists".to_string()));
        }

        let id = state.next_id();
        let created = Book {
            id,
            title: book.title.clone(),
            isbn: book.isbn.clone(),
            publisher: book.publisher.clone(),
            year: book.year,
            pages: book.pages,
            language: book.language.clone(),
            description: book.description.clone(),
            total_copies: book.total_copies,
            available_copies: book.total_copies,
        };
        state.books.insert(id, created);

        for author_id in &book.author_ids {
            if state.authors.contains_key(author_id) {
                state.book_authors.push((id, *author_id));
            }
        }
        for genre_id in &book.genre_ids {
            if state.genres.contains_key(genre_id) {
                state.book_genres.push((id, *genre_id));
            }
        }

        let book = &state.books[&id];
        Ok(state.book_details(book))
    }

    async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<BookDetails> {
        let mut state = lock(&self.0)?;
        if !state.books.contains_key(&id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        if state.books.values().any(|b| b.isbn == book.isbn && b.id != id) {
            return Err(AppError::Conflict("Book with this ISBN already exists".to_string()));
        }

        let on_loan = state.books[&id].copies_on_loan();
        if book.total_copies < on_loan {
            return Err(AppError::Conflict(format!(
                "Cannot reduce total copies below the {} currently on loan",
                on_loan
            )));
        }

        let existing = state.books.get_mut(&id).ok_or_else(|| {
            AppError::NotFound(format!("Book with id {} not found", id))
        })?;
        existing.title = book.title.clone();
        existing.isbn = book.isbn.clone();
        existing.publisher = book.publisher.clone();
        existing.year = book.year;
        existing.pages = book.pages;
        existing.language = book.language.clone();
        existing.description = book.description.clone();
        existing.total_copies = book.total_copies;
        existing.available_copies = book.total_copies - on_loan;

        state.book_authors.retain(|(b, a)| *b != id || book.author_ids.contains(a));
        for author_id in &book.author_ids {
            if state.authors.contains_key(author_id)
                && !state.book_authors.contains(&(id, *author_id))
            {
                state.book_authors.push((id, *author_id));
            }
        }
        state.book_genres.retain(|(b, g)| *b != id || book.genre_ids.contains(g));
        for genre_id in &book.genre_ids {
            if state.genres.contains_key(genre_id)
                && !state.book_genres.contains(&(id, *genre_id))
            {
                state.book_genres.push((id, *genre_id));
            }
        }

        let book = &state.books[&id];
        Ok(state.book_details(book))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = lock(&self.0)?;
        let book = state
            .books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        if book.available_copies != book.total_copies {
            return Err(AppError::Conflict(
                "Cannot delete a book while copies are out on loan".to_string(),
            ));
        }
        state.books.remove(&id);
        state.book_authors.retain(|(b, _)| *b != id);
        state.book_genres.retain(|(b, _)| *b != id);
        Ok(())
    }

    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let state = lock(&self.0)?;
        Ok(state
            .books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude_id))
    }

    async fn is_available(&self, id: i32) -> AppResult<bool> {
        Ok(self.available_copies(id).await? > 0)
    }

    async fn available_copies(&self, id: i32) -> AppResult<i32> {
        let state = lock(&self.0)?;
        state
            .books
            .get(&id)
            .map(|b| b.available_copies)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn by_author(&self, author_id: i32) -> AppResult<Vec<BookDetails>> {
        let state = lock(&self.0)?;
        let mut details: Vec<BookDetails> = state
            .book_authors
            .iter()
            .filter(|(_, a)| *a == author_id)
            .filter_map(|(b, _)| state.books.get(b))
            .map(|b| state.book_details(b))
            .collect();
        details.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(details)
    }

    async fn by_genre(&self, genre_id: i32) -> AppResult<Vec<BookDetails>> {
        let state = lock(&self.0)?;
        let mut details: Vec<BookDetails> = state
            .book_genres
            .iter()
            .filter(|(_, g)| *g == genre_id)
            .filter_map(|(b, _)| state.books.get(b))
            .map(|b| state.book_details(b))
            .collect();
        details.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(details)
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(lock(&self.0)?.books.len() as i64)
    }
}

#[async_trait]
impl AuthorStore for MemoryAuthors {
    async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        let state = lock(&self.0)?;
        state
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Author>> {
        let state = lock(&self.0)?;
        let mut authors: Vec<Author> = state
            .authors
            .values()
            .filter(|a| match search {
                Some(term) if !term.trim().is_empty() => {
                    let term = term.trim();
                    contains(&a.full_name, term)
                        || a.biography.as_deref().map(|b| contains(b, term)).unwrap_or(false)
                }
                _ => true,
            })
            .cloned()
            .collect();
        authors.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(authors)
    }

    async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let mut state = lock(&self.0)?;
        if state.authors.values().any(|a| a.full_name == author.full_name) {
            return Err(AppError::Conflict("Author with this name already exists".to_string()));
        }
        let id = state.next_id();
        let created = Author {
            id,
            full_name: author.full_name.clone(),
            biography: author.biography.clone(),
        };
        state.authors.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, author: &UpdateAuthor) -> AppResult<Author> {
        let mut state = lock(&self.0)?;
        if state
            .authors
            .values()
            .any(|a| a.full_name == author.full_name && a.id != id)
        {
            return Err(AppError::Conflict("Author with this name already exists".to_string()));
        }
        let existing = state
            .authors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))?;
        existing.full_name = author.full_name.clone();
        existing.biography = author.biography.clone();
        Ok(existing.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = lock(&self.0)?;
        if !state.authors.contains_key(&id) {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        if state.book_authors.iter().any(|(_, a)| *a == id) {
            return Err(AppError::Conflict(
                "Cannot delete an author who still has books".to_string(),
            ));
        }
        state.authors.remove(&id);
        Ok(())
    }

    async fn name_exists(&self, full_name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let state = lock(&self.0)?;
        Ok(state
            .authors
            .values()
            .any(|a| a.full_name == full_name && Some(a.id) != exclude_id))
    }
}

#[async_trait]
impl GenreStore for MemoryGenres {
    async fn get_by_id(&self, id: i32) -> AppResult<Genre> {
        let state = lock(&self.0)?;
        state
            .genres
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn list(&self, search: Option<&str>) -> AppResult<Vec<Genre>> {
        let state = lock(&self.0)?;
        let mut genres: Vec<Genre> = state
            .genres
            .values()
            .filter(|g| match search {
                Some(term) if !term.trim().is_empty() => {
                    let term = term.trim();
                    contains(&g.name, term)
                        || g.description.as_deref().map(|d| contains(d, term)).unwrap_or(false)
                }
                _ => true,
            })
            .cloned()
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn create(&self, genre: &CreateGenre) -> AppResult<Genre> {
        let mut state = lock(&self.0)?;
        if state.genres.values().any(|g| g.name == genre.name) {
            return Err(AppError::Conflict("Genre with this name already exists".to_string()));
        }
        let id = state.next_id();
        let created = Genre {
            id,
            name: genre.name.clone(),
            description: genre.description.clone(),
        };
        state.genres.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, genre: &UpdateGenre) -> AppResult<Genre> {
        let mut state = lock(&self.0)?;
        if state.genres.values().any(|g| g.name == genre.name && g.id != id) {
            return Err(AppError::Conflict("Genre with this name already exists".to_string()));
        }
        let existing = state
            .genres
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))?;
        existing.name = genre.name.clone();
        existing.description = genre.description.clone();
        Ok(existing.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = lock(&self.0)?;
        if !state.genres.contains_key(&id) {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        if state.book_genres.iter().any(|(_, g)| *g == id) {
            return Err(AppError::Conflict(
                "Cannot delete a genre that still has books".to_string(),
            ));
        }
        state.genres.remove(&id);
        Ok(())
    }

    async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let state = lock(&self.0)?;
        Ok(state
            .genres
            .values()
            .any(|g| g.name == name && Some(g.id) != exclude_id))
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let state = lock(&self.0)?;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let state = lock(&self.0)?;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let mut state = lock(&self.0)?;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("User with this email already exists".to_string()));
        }
        let id = state.next_id();
        let created = User {
            id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.unwrap_or_default(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }

    async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        let mut state = lock(&self.0)?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = lock(&self.0)?;
        state
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn exists(&self, id: i32) -> AppResult<bool> {
        Ok(lock(&self.0)?.users.contains_key(&id))
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let state = lock(&self.0)?;
        Ok(state.users.values().any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(lock(&self.0)?.users.len() as i64)
    }
}

#[async_trait]
impl LoanStore for MemoryLoans {
    async fn create(&self, book_id: i32, user_id: i32, loan_days: i64) -> AppResult<Loan> {
        let mut state = lock(&self.0)?;

        let already_borrowed = state
            .loans
            .values()
            .any(|l| l.user_id == user_id && l.book_id == book_id && l.is_open());
        if already_borrowed {
            return Err(AppError::Conflict("User already has this book on loan".to_string()));
        }

        state.ledger_decrement(book_id)?;

        let now = Utc::now();
        let id = state.next_id();
        let loan = Loan {
            id,
            book_id,
            user_id,
            loan_date: now,
            due_date: now + Duration::days(loan_days),
            return_date: None,
            renewals: 0,
        };
        state.loans.insert(id, loan.clone());
        Ok(loan)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        let state = lock(&self.0)?;
        state
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    async fn mark_returned(&self, id: i32) -> AppResult<Loan> {
        let mut state = lock(&self.0)?;

        let loan = state
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Loan already returned".to_string()));
        }

        let now = Utc::now();
        Loan::check_dates(loan.loan_date, Some(now), now)?;

        state.ledger_increment(loan.book_id)?;

        let loan = state.loans.get_mut(&id).ok_or_else(|| {
            AppError::NotFound(format!("Loan with id {} not found", id))
        })?;
        loan.return_date = Some(now);
        Ok(loan.clone())
    }

    async fn renew(&self, id: i32, additional_days: i64) -> AppResult<Loan> {
        let mut state = lock(&self.0)?;
        let loan = state
            .loans
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))?;
        if loan.return_date.is_some() {
            return Err(AppError::Conflict("Cannot renew a returned loan".to_string()));
        }
        loan.due_date = loan.due_date + Duration::days(additional_days);
        loan.renewals += 1;
        Ok(loan.clone())
    }

    async fn active(&self) -> AppResult<Vec<LoanDetails>> {
        let state = lock(&self.0)?;
        let now = Utc::now();
        let mut loans: Vec<&Loan> = state.loans.values().filter(|l| l.is_open()).collect();
        loans.sort_by_key(|l| l.due_date);
        Ok(loans.iter().map(|l| state.loan_details(l, now)).collect())
    }

    async fn overdue(&self) -> AppResult<Vec<LoanDetails>> {
        let state = lock(&self.0)?;
        let now = Utc::now();
        let mut loans: Vec<&Loan> = state
            .loans
            .values()
            .filter(|l| l.is_overdue_at(now))
            .collect();
        loans.sort_by_key(|l| l.due_date);
        Ok(loans.iter().map(|l| state.loan_details(l, now)).collect())
    }

    async fn for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let state = lock(&self.0)?;
        let now = Utc::now();
        let mut loans: Vec<&Loan> = state
            .loans
            .values()
            .filter(|l| l.user_id == user_id)
            .collect();
        loans.sort_by_key(|l| std::cmp::Reverse(l.loan_date));
        Ok(loans.iter().map(|l| state.loan_details(l, now)).collect())
    }

    async fn current_for_user(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let state = lock(&self.0)?;
        let now = Utc::now();
        let mut loans: Vec<&Loan> = state
            .loans
            .values()
            .filter(|l| l.user_id == user_id && l.is_open())
            .collect();
        loans.sort_by_key(|l| l.due_date);
        Ok(loans.iter().map(|l| state.loan_details(l, now)).collect())
    }

    async fn has_open_loan(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let state = lock(&self.0)?;
        Ok(state
            .loans
            .values()
            .any(|l| l.user_id == user_id && l.book_id == book_id && l.is_open()))
    }

    async fn count_open_for_user(&self, user_id: i32) -> AppResult<i64> {
        let state = lock(&self.0)?;
        Ok(state
            .loans
            .values()
            .filter(|l| l.user_id == user_id && l.is_open())
            .count() as i64)
    }

    async fn count_active(&self) -> AppResult<i64> {
        let state = lock(&self.0)?;
        Ok(state.loans.values().filter(|l| l.is_open()).count() as i64)
    }

    async fn count_overdue(&self) -> AppResult<i64> {
        let state = lock(&self.0)?;
        let now = Utc::now();
        Ok(state.loans.values().filter(|l| l.is_overdue_at(now)).count() as i64)
    }
}

#[async_trait]
impl ReservationStore for MemoryReservations {
    async fn create(&self, book_id: i32, user_id: i32, reserve_days: i64) -> AppResult<Reservation> {
        let mut state = lock(&self.0)?;

        let book = state
            .books
            .get(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        if book.available_copies == 0 {
            return Err(AppError::Unavailable(format!(
                "No available copies of book {}",
                book_id
            )));
        }

        let already_reserved = state
            .reservations
            .values()
            .any(|r| r.user_id == user_id && r.book_id == book_id && r.is_active);
        if already_reserved {
            return Err(AppError::Conflict(
                "User already has an active reservation for this book".to_string(),
            ));
        }

        let now = Utc::now();
        let id = state.next_id();
        let reservation = Reservation {
            id,
            book_id,
            user_id,
            reservation_date: now,
            expiry_date: now + Duration::days(reserve_days),
            is_active: true,
        };
        state.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        let state = lock(&self.0)?;
        state
            .reservations
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    async fn cancel(&self, id: i32) -> AppResult<Reservation> {
        let mut state = lock(&self.0)?;
        let reservation = state
            .reservations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))?;
        reservation.is_active = false;
        Ok(reservation.clone())
    }

    async fn active(&self, user_id: Option<i32>) -> AppResult<Vec<ReservationDetails>> {
        let state = lock(&self.0)?;
        let mut reservations: Vec<&Reservation> = state
            .reservations
            .values()
            .filter(|r| r.is_active && user_id.map(|id| r.user_id == id).unwrap_or(true))
            .collect();
        reservations.sort_by_key(|r| r.expiry_date);
        Ok(reservations
            .iter()
            .map(|r| state.reservation_details(r))
            .collect())
    }

    async fn for_user(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        let state = lock(&self.0)?;
        let mut reservations: Vec<&Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .collect();
        reservations.sort_by_key(|r| std::cmp::Reverse(r.reservation_date));
        Ok(reservations
            .iter()
            .map(|r| state.reservation_details(r))
            .collect())
    }

    async fn has_active(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let state = lock(&self.0)?;
        Ok(state
            .reservations
            .values()
            .any(|r| r.user_id == user_id && r.book_id == book_id && r.is_active))
    }

    async fn count_active(&self) -> AppResult<i64> {
        let state = lock(&self.0)?;
        Ok(state.reservations.values().filter(|r| r.is_active).count() as i64)
    }
}
