//! Genre endpoints

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
        book::BookDetails,
        genre::{CreateGenre, Genre, UpdateGenre},
    },
};

/// Query parameters for listing genres
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct GenreQuery {
    /// Case-insensitive substring search over name and description
    pub search: Option<String>,
}

/// List genres, optionally filtered by a search term
#[utoipa::path(
    get,
    path = "/genres",
    tag = "genres",
    params(GenreQuery),
    responses(
        (status = 200, description = "List of genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(
    State(state): State<crate::AppState>,
    Query(query): Query<GenreQuery>,
) -> AppResult<Json<Vec<Genre>>> {
    let genres = state
        .services
        .catalog
        .list_genres(query.search.as_deref())
        .await?;
    Ok(Json(genres))
}

/// Get a genre by ID
#[utoipa::path(
    get,
    path = "/genres/{id}",
    tag = "genres",
    params(
        ("id" = i32, Path, description = "Genre ID")
    ),
    responses(
        (status = 200, description = "Genre", body = Genre),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn get_genre(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Genre>> {
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(Json(genre))
}

/// Create a new genre
#[utoipa::path(
    post,
    path = "/genres",
    tag = "genres",
    request_body = CreateGenre,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Genre with this name already exists")
    )
)]
pub async fn create_genre(
    State(state): State<crate::AppState>,
    Json(genre): Json<CreateGenre>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    let created = state.services.catalog.create_genre(genre).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing genre
#[utoipa::path(
    put,
    path = "/genres/{id}",
    tag = "genres",
    params(
        ("id" = i32, Path, description = "Genre ID")
    ),
    request_body = UpdateGenre,
    responses(
        (status = 200, description = "Genre updated", body = Genre),
        (status = 404, description = "Genre not found"),
        (status = 409, description = "Genre with this name already exists")
    )
)]
pub async fn update_genre(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(genre): Json<UpdateGenre>,
) -> AppResult<Json<Genre>> {
    let updated = state.services.catalog.update_genre(id, genre).await?;
    Ok(Json(updated))
}

/// Delete a genre
#[utoipa::path(
    delete,
    path = "/genres/{id}",
    tag = "genres",
    params(
        ("id" = i32, Path, description = "Genre ID")
    ),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Genre not found"),
        (status = 409, description = "Genre still has books")
    )
)]
pub async fn delete_genre(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Books in a given genre
#[utoipa::path(
    get,
    path = "/genres/{id}/books",
    tag = "genres",
    params(
        ("id" = i32, Path, description = "Genre ID")
    ),
    responses(
        (status = 200, description = "Books in the genre", body = Vec<BookDetails>),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn get_genre_books(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<BookDetails>>> {
    let books = state.services.catalog.get_books_by_genre(id).await?;
    Ok(Json(books))
}
