//! User management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{CreateUser, Role, UpdateRole, User},
};

/// Role membership response
#[derive(Serialize, ToSchema)]
pub struct RoleResponse {
    /// User ID
    pub user_id: i32,
    /// Role name
    pub role: Role,
}

/// List users ordered by name
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "List of users", body = Vec<User>)
    )
)]
pub async fn list_users(State(state): State<crate::AppState>) -> AppResult<Json<Vec<User>>> {
    let users = state.services.users.list_users().await?;
    Ok(Json(users))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get_user(id).await?;
    Ok(Json(user))
}

/// Create a new user account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let created = state.services.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Look up a user's role
#[utoipa::path(
    get,
    path = "/users/{id}/role",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Role membership", body = RoleResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_role(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<RoleResponse>> {
    let role = state.services.users.get_user_role(id).await?;
    Ok(Json(RoleResponse { user_id: id, role }))
}

/// Change a user's role
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user_role(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateRole>,
) -> AppResult<Json<User>> {
    let user = state.services.users.update_user_role(id, request.role).await?;
    Ok(Json(user))
}

/// Delete a user account
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has open loans")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
