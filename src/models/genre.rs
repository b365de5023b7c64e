//! Genre model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Genre model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Create genre request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGenre {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub description: Option<String>,
}

/// Update genre request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGenre {
    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: String,
    pub description: Option<String>,
}
