//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, genres, health, loans, reservations, stats, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Athenaeum API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::get_availability,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        authors::get_author_books,
        // Genres
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::update_genre,
        genres::delete_genre,
        genres::get_genre_books,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::get_user_role,
        users::update_user_role,
        users::delete_user,
        // Loans
        loans::create_loan,
        loans::get_loan,
        loans::return_loan,
        loans::renew_loan,
        loans::list_active_loans,
        loans::list_overdue_loans,
        loans::get_user_loans,
        loans::get_user_current_loans,
        // Reservations
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::cancel_reservation,
        reservations::list_active_reservations,
        reservations::get_user_reservations,
        // Stats
        stats::get_stats,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::BookQuery,
            books::AvailabilityResponse,
            // Authors
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            // Genres
            crate::models::genre::Genre,
            crate::models::genre::CreateGenre,
            crate::models::genre::UpdateGenre,
            // Users
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::CreateUser,
            crate::models::user::UpdateRole,
            users::RoleResponse,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanDetails,
            loans::CreateLoanRequest,
            loans::ReturnLoanRequest,
            loans::RenewLoanRequest,
            loans::LoanResponse,
            loans::ReturnResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationDetails,
            reservations::CreateReservationRequest,
            reservations::ReservationResponse,
            // Stats
            stats::StatsResponse,
            stats::BookStats,
            stats::UserStats,
            stats::LoanStats,
            stats::ReservationStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog book management"),
        (name = "authors", description = "Author management"),
        (name = "genres", description = "Genre management"),
        (name = "users", description = "User account management"),
        (name = "loans", description = "Loan management"),
        (name = "reservations", description = "Reservation management"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
