//! API handlers for Athenaeum REST endpoints
//!
//! Authentication is handled in front of this server; handlers receive
//! already-authorized requests.

pub mod authors;
pub mod books;
pub mod genres;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod reservations;
pub mod stats;
pub mod users;
