//! Statistics endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

/// Statistics response
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    /// Book statistics
    pub books: BookStats,
    /// User statistics
    pub users: UserStats,
    /// Loan statistics
    pub loans: LoanStats,
    /// Reservation statistics
    pub reservations: ReservationStats,
}

#[derive(Serialize, ToSchema)]
pub struct BookStats {
    /// Total number of catalogued books
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct UserStats {
    /// Total number of user accounts
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct LoanStats {
    /// Open loans
    pub active: i64,
    /// Open loans past their due date
    pub overdue: i64,
}

#[derive(Serialize, ToSchema)]
pub struct ReservationStats {
    /// Active reservations
    pub active: i64,
}

/// Get library statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Library statistics", body = StatsResponse)
    )
)]
pub async fn get_stats(State(state): State<crate::AppState>) -> AppResult<Json<StatsResponse>> {
    let stats = state.services.stats.get_stats().await?;
    Ok(Json(stats))
}
