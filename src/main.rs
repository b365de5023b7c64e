//! Athenaeum Server - Library Management System
//!
//! A Rust REST API server for catalog, loan and reservation management.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use athenaeum_server::{api, config::AppConfig, repository::Repository, services::Services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("athenaeum_server={},tower_http=debug", config.logging.level).into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Athenaeum Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::postgres(pool);
    let services = Services::new(repository, config.loans.clone());

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Books (catalog)
        .route("/books", get(api::books::list_books))
        .route("/books", post(api::books::create_book))
        .route("/books/:id", get(api::books::get_book))
        .route("/books/:id", put(api::books::update_book))
        .route("/books/:id", delete(api::books::delete_book))
        .route("/books/:id/availability", get(api::books::get_availability))
        // Authors
        .route("/authors", get(api::authors::list_authors))
        .route("/authors", post(api::authors::create_author))
        .route("/authors/:id", get(api::authors::get_author))
        .route("/authors/:id", put(api::authors::update_author))
        .route("/authors/:id", delete(api::authors::delete_author))
        .route("/authors/:id/books", get(api::authors::get_author_books))
        // Genres
        .route("/genres", get(api::genres::list_genres))
        .route("/genres", post(api::genres::create_genre))
        .route("/genres/:id", get(api::genres::get_genre))
        .route("/genres/:id", put(api::genres::update_genre))
        .route("/genres/:id", delete(api::genres::delete_genre))
        .route("/genres/:id/books", get(api::genres::get_genre_books))
        // Users
        .route("/users", get(api::users::list_users))
        .route("/users", post(api::users::create_user))
        .route("/users/:id", get(api::users::get_user))
        .route("/users/:id", delete(api::users::delete_user))
        .route("/users/:id/role", get(api::users::get_user_role))
        .route("/users/:id/role", put(api::users::update_user_role))
        .route("/users/:id/loans", get(api::loans::get_user_loans))
        .route("/users/:id/loans/current", get(api::loans::get_user_current_loans))
        .route("/users/:id/reservations", get(api::reservations::get_user_reservations))
        // Loans
        .route("/loans", post(api::loans::create_loan))
        .route("/loans/active", get(api::loans::list_active_loans))
        .route("/loans/overdue", get(api::loans::list_overdue_loans))
        .route("/loans/:id", get(api::loans::get_loan))
        .route("/loans/:id/return", post(api::loans::return_loan))
        .route("/loans/:id/renew", post(api::loans::renew_loan))
        // Reservations
        .route("/reservations", post(api::reservations::create_reservation))
        .route("/reservations/active", get(api::reservations::list_active_reservations))
        .route("/reservations/:id", get(api::reservations::get_reservation))
        .route("/reservations/:id/cancel", post(api::reservations::cancel_reservation))
        // Statistics
        .route("/stats", get(api::stats::get_stats))
        .with_state(state);

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
