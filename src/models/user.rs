//! User account model and related types
//!
//! Authentication lives outside this server; the model covers accounts and
//! role membership only.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Role membership levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Librarian,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Librarian => "librarian",
            Role::Admin => "admin",
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "librarian" => Role::Librarian,
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// User account model from database
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Full name must not be empty"))]
    pub full_name: String,
    /// Role to assign; defaults to `user`
    pub role: Option<Role>,
}

/// Update role request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
}
