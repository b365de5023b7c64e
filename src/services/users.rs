//! User account service
//!
//! Covers the identity-directory surface: accounts and role membership.
//! Authentication and policy enforcement live outside this server.

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Role, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn get_user(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn user_exists(&self, id: i32) -> AppResult<bool> {
        self.repository.users.exists(id).await
    }

    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.email_exists(&user.email).await? {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let created = self.repository.users.create(&user).await?;
        tracing::info!("User {} created with role {}", created.id, created.role.as_str());
        Ok(created)
    }

    /// Role membership for a user
    pub async fn get_user_role(&self, id: i32) -> AppResult<Role> {
        Ok(self.repository.users.get_by_id(id).await?.role)
    }

    pub async fn is_user_in_role(&self, id: i32, role: Role) -> AppResult<bool> {
        Ok(self.repository.users.get_by_id(id).await?.role == role)
    }

    pub async fn update_user_role(&self, id: i32, role: Role) -> AppResult<User> {
        let updated = self.repository.users.update_role(id, role).await?;
        tracing::info!("User {} role changed to {}", id, role.as_str());
        Ok(updated)
    }

    /// Delete a user account; rejected while the user holds open loans
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        // Verify user exists
        self.repository.users.get_by_id(id).await?;

        let open_loans = self.repository.loans.count_open_for_user(id).await?;
        if open_loans > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot delete a user with {} open loans",
                open_loans
            )));
        }

        self.repository.users.delete(id).await?;
        tracing::info!("User {} deleted", id);
        Ok(())
    }
}
