//! Shared helpers for the in-memory integration tests

#![allow(dead_code)]

use athenaeum_server::{
    config::LoansConfig,
    models::{
        book::{BookDetails, CreateBook},
        user::{CreateUser, User},
    },
    repository::Repository,
    services::Services,
};

/// Fresh services over a fresh in-memory repository
pub fn setup() -> (Repository, Services) {
    setup_with_loans_config(LoansConfig::default())
}

pub fn setup_with_loans_config(config: LoansConfig) -> (Repository, Services) {
    let repository = Repository::in_memory();
    let services = Services::new(repository.clone(), config);
    (repository, services)
}

pub async fn add_book(repository: &Repository, title: &str, isbn: &str, copies: i32) -> BookDetails {
    repository
        .books
        .create(&CreateBook {
            title: title.to_string(),
            isbn: isbn.to_string(),
            publisher: None,
            year: 2000,
            pages: 300,
            language: None,
            description: None,
            total_copies: copies,
            author_ids: vec![],
            genre_ids: vec![],
        })
        .await
        .expect("failed to create book")
}

pub async fn add_user(repository: &Repository, email: &str, name: &str) -> User {
    repository
        .users
        .create(&CreateUser {
            email: email.to_string(),
            full_name: name.to_string(),
            role: None,
        })
        .await
        .expect("failed to create user")
}
