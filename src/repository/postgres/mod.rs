//! Postgres adapters for the store traits

pub mod authors;
pub mod books;
pub mod genres;
pub mod ledger;
pub mod loans;
pub mod reservations;
pub mod users;
