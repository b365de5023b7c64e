//! Reservation management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::reservation::{Reservation, ReservationDetails},
};

/// Create reservation request
#[derive(Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    /// Book to reserve
    pub book_id: i32,
    /// Reserving user
    pub user_id: i32,
    /// Days until the reservation expires
    pub reserve_days: i64,
}

/// Reservation response
#[derive(Serialize, ToSchema)]
pub struct ReservationResponse {
    /// Reservation ID
    pub id: i32,
    /// Expiry date (ISO 8601 format)
    pub expiry_date: DateTime<Utc>,
    /// Status message
    pub message: String,
}

/// Query parameters for listing active reservations
#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ActiveReservationsQuery {
    /// Restrict to one user's reservations
    pub user_id: Option<i32>,
}

/// Reserve a book
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation placed", body = ReservationResponse),
        (status = 400, description = "Invalid reservation period"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "No copies available or duplicate reservation")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<ReservationResponse>)> {
    let reservation = state
        .services
        .reservations
        .reserve(request.book_id, request.user_id, request.reserve_days)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse {
            id: reservation.id,
            expiry_date: reservation.expiry_date,
            message: "Book reserved successfully".to_string(),
        }),
    ))
}

/// Get a reservation by ID
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get_reservation(reservation_id).await?;
    Ok(Json(reservation))
}

/// Cancel a reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.cancel(reservation_id).await?;
    Ok(Json(reservation))
}

/// Active reservations, soonest expiry first
#[utoipa::path(
    get,
    path = "/reservations/active",
    tag = "reservations",
    params(ActiveReservationsQuery),
    responses(
        (status = 200, description = "Active reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn list_active_reservations(
    State(state): State<crate::AppState>,
    Query(query): Query<ActiveReservationsQuery>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let reservations = state
        .services
        .reservations
        .get_active_reservations(query.user_id)
        .await?;
    Ok(Json(reservations))
}

/// Reservation history for a specific user, most recent first
#[utoipa::path(
    get,
    path = "/users/{id}/reservations",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's reservations", body = Vec<ReservationDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_reservations(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let reservations = state
        .services
        .reservations
        .get_user_reservations(user_id)
        .await?;
    Ok(Json(reservations))
}
