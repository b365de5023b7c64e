//! Statistics service: read-only projections over the ledger state

use crate::{
    api::stats::{BookStats, LoanStats, ReservationStats, StatsResponse, UserStats},
    error::AppResult,
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Snapshot of library-wide counts
    pub async fn get_stats(&self) -> AppResult<StatsResponse> {
        Ok(StatsResponse {
            books: BookStats {
                total: self.repository.books.count().await?,
            },
            users: UserStats {
                total: self.repository.users.count().await?,
            },
            loans: LoanStats {
                active: self.repository.loans.count_active().await?,
                overdue: self.repository.loans.count_overdue().await?,
            },
            reservations: ReservationStats {
                active: self.repository.reservations.count_active().await?,
            },
        })
    }
}
