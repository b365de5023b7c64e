//! Reservation management service
//!
//! Reservations check availability when they are placed but hold no copy:
//! the ledger only moves through loans.

use crate::{
    error::{AppError, AppResult},
    models::reservation::{Reservation, ReservationDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
}

impl ReservationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Reserve a book for a user for `reserve_days` days
    pub async fn reserve(
        &self,
        book_id: i32,
        user_id: i32,
        reserve_days: i64,
    ) -> AppResult<Reservation> {
        if reserve_days <= 0 {
            return Err(AppError::InvalidArgument(
                "Reservation period must be positive".to_string(),
            ));
        }

        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;

        let reservation = self
            .repository
            .reservations
            .create(book_id, user_id, reserve_days)
            .await?;
        tracing::info!(
            "Reservation {} placed: book {} for user {} until {}",
            reservation.id, book_id, user_id, reservation.expiry_date
        );
        Ok(reservation)
    }

    /// Cancel a reservation
    pub async fn cancel(&self, reservation_id: i32) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.cancel(reservation_id).await?;
        tracing::info!("Reservation {} cancelled", reservation_id);
        Ok(reservation)
    }

    /// Get a reservation by ID
    pub async fn get_reservation(&self, reservation_id: i32) -> AppResult<Reservation> {
        self.repository.reservations.get_by_id(reservation_id).await
    }

    /// Active reservations, soonest expiry first, optionally for one user
    pub async fn get_active_reservations(
        &self,
        user_id: Option<i32>,
    ) -> AppResult<Vec<ReservationDetails>> {
        self.repository.reservations.active(user_id).await
    }

    /// Full reservation history for a user, most recent first
    pub async fn get_user_reservations(&self, user_id: i32) -> AppResult<Vec<ReservationDetails>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository.reservations.for_user(user_id).await
    }

    /// Count active reservations
    pub async fn count_active(&self) -> AppResult<i64> {
        self.repository.reservations.count_active().await
    }
}
