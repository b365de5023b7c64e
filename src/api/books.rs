//! Book (catalog) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::book::{BookDetails, BookQuery, CreateBook, UpdateBook},
};

/// Availability snapshot for a single book
#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    /// Book ID
    pub book_id: i32,
    /// Whether at least one copy can be loaned right now
    pub available: bool,
    /// Number of lendable copies
    pub available_copies: i32,
}

/// List books, optionally filtered by a search term
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "List of books", body = Vec<BookDetails>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<BookDetails>>> {
    let books = state.services.catalog.list_books(query.search.as_deref()).await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookDetails),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Book with this ISBN already exists")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<BookDetails>)> {
    let created = state.services.catalog.create_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookDetails),
        (status = 404, description = "Book not found"),
        (status = 409, description = "ISBN conflict or copies on loan")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(book): Json<UpdateBook>,
) -> AppResult<Json<BookDetails>> {
    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies are out on loan")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current availability of a book
#[utoipa::path(
    get,
    path = "/books/{id}/availability",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Availability snapshot", body = AvailabilityResponse),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_availability(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AvailabilityResponse>> {
    let available_copies = state.services.loans.get_available_copies(id).await?;
    Ok(Json(AvailabilityResponse {
        book_id: id,
        available: available_copies > 0,
        available_copies,
    }))
}
