//! Business logic services

pub mod catalog;
pub mod loans;
pub mod reservations;
pub mod stats;
pub mod users;

use crate::{config::LoansConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, loans_config: LoansConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), loans_config),
            reservations: reservations::ReservationsService::new(repository.clone()),
            stats: stats::StatsService::new(repository),
        }
    }
}
