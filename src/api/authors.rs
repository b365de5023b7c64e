//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::BookDetails,
    },
};

/// Query parameters for listing authors
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct AuthorQuery {
    /// Case-insensitive substring search over name and biography
    pub search: Option<String>,
}

/// List authors, optionally filtered by a search term
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    params(AuthorQuery),
    responses(
        (status = 200, description = "List of authors", body = Vec<Author>)
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    Query(query): Query<AuthorQuery>,
) -> AppResult<Json<Vec<Author>>> {
    let authors = state
        .services
        .catalog
        .list_authors(query.search.as_deref())
        .await?;
    Ok(Json(authors))
}

/// Get an author by ID
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Author>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

/// Create a new author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Author with this name already exists")
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    Json(author): Json<CreateAuthor>,
) -> AppResult<(StatusCode, Json<Author>)> {
    let created = state.services.catalog.create_author(author).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing author
#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    request_body = UpdateAuthor,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Author with this name already exists")
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(author): Json<UpdateAuthor>,
) -> AppResult<Json<Author>> {
    let updated = state.services.catalog.update_author(id, author).await?;
    Ok(Json(updated))
}

/// Delete an author
#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Author still has books")
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Books by a given author
#[utoipa::path(
    get,
    path = "/authors/{id}/books",
    tag = "authors",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Books by the author", body = Vec<BookDetails>),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author_books(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<BookDetails>>> {
    let books = state.services.catalog.get_books_by_author(id).await?;
    Ok(Json(books))
}
