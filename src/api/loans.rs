//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanDetails},
};

/// Create loan request
#[derive(Deserialize, ToSchema)]
pub struct CreateLoanRequest {
    /// Book to borrow
    pub book_id: i32,
    /// Borrowing user
    pub user_id: i32,
    /// Loan period in days
    pub loan_days: i64,
}

/// Return loan request; the body is optional
#[derive(Default, Deserialize, ToSchema)]
pub struct ReturnLoanRequest {
    /// When set, the loan must belong to this user
    pub user_id: Option<i32>,
}

/// Renew loan request
#[derive(Deserialize, ToSchema)]
pub struct RenewLoanRequest {
    /// Days to add to the due date
    pub additional_days: i64,
}

/// Loan response with calculated dates
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    /// Loan ID
    pub id: i32,
    /// Due date (ISO 8601 format)
    pub due_date: DateTime<Utc>,
    /// Renewal count
    pub renewals: i16,
    /// Status message
    pub message: String,
}

/// Return response with the closed loan
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    /// The returned loan
    pub loan: Loan,
}

/// Create a new loan (borrow a book)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Invalid loan period"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "No copies available or duplicate loan")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let loan = state
        .services
        .loans
        .issue_loan(request.book_id, request.user_id, request.loan_days)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            id: loan.id,
            due_date: loan.due_date,
            renewals: loan.renewals,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan", body = Loan),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 403, description = "Loan belongs to another user"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReturnLoanRequest>>,
) -> AppResult<Json<ReturnResponse>> {
    let requesting_user = request.and_then(|Json(r)| r.user_id);

    let loan = state.services.loans.return_loan(loan_id, requesting_user).await?;

    Ok(Json(ReturnResponse {
        status: "returned".to_string(),
        loan,
    }))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/renew",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = RenewLoanRequest,
    responses(
        (status = 200, description = "Loan renewed", body = LoanResponse),
        (status = 400, description = "Invalid renewal period"),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned or renewal cap reached")
    )
)]
pub async fn renew_loan(
    State(state): State<crate::AppState>,
    Path(loan_id): Path<i32>,
    Json(request): Json<RenewLoanRequest>,
) -> AppResult<Json<LoanResponse>> {
    let loan = state
        .services
        .loans
        .renew_loan(loan_id, request.additional_days)
        .await?;

    Ok(Json(LoanResponse {
        id: loan.id,
        due_date: loan.due_date,
        renewals: loan.renewals,
        message: format!("Loan renewed ({} renewals)", loan.renewals),
    }))
}

/// All open loans, soonest due first
#[utoipa::path(
    get,
    path = "/loans/active",
    tag = "loans",
    responses(
        (status = 200, description = "Active loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_active_loans(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.get_active_loans().await?;
    Ok(Json(loans))
}

/// Open loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_overdue_loans(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.get_overdue_loans().await?;
    Ok(Json(loans))
}

/// Loan history for a specific user, most recent first
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.get_user_loans(user_id).await?;
    Ok(Json(loans))
}

/// Open loans for a specific user, soonest due first
#[utoipa::path(
    get,
    path = "/users/{id}/loans/current",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User's open loans", body = Vec<LoanDetails>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_current_loans(
    State(state): State<crate::AppState>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.get_user_current_loans(user_id).await?;
    Ok(Json(loans))
}
