//! Reservation model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Reservation model from database
///
/// A reservation stays in the table for its whole life; cancellation and
/// fulfilment both clear `is_active` rather than deleting the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
}

/// Reservation with book and holder context for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub book_title: String,
    pub user_name: String,
    pub reservation_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
}

impl ReservationDetails {
    pub fn from_reservation(r: &Reservation, book_title: String, user_name: String) -> Self {
        Self {
            id: r.id,
            book_id: r.book_id,
            user_id: r.user_id,
            book_title,
            user_name,
            reservation_date: r.reservation_date,
            expiry_date: r.expiry_date,
            is_active: r.is_active,
        }
    }
}
