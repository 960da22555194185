//! API handlers for Libris REST endpoints

pub mod books;
pub mod borrowings;
pub mod extract;
pub mod health;
pub mod openapi;
pub mod stats;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use extract::{ApiJson, ApiPath, ApiQuery};

use crate::{
    error::AppError,
    models::user::{ActingUser, SessionClaims},
    AppState,
};

/// Session claims from the bearer token, if the request carries one.
///
/// A missing `Authorization` header yields `None`; a malformed or invalid
/// token is rejected.
pub struct MaybeSession(pub Option<SessionClaims>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(MaybeSession(None));
        };

        let auth_header = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthenticated("Invalid authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthenticated("Invalid authorization header format".to_string())
        })?;

        let claims = SessionClaims::from_token(token.trim(), &state.config.auth)
            .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

        Ok(MaybeSession(Some(claims)))
    }
}

/// Extractor for the acting user of a request, bound to its internal record
pub struct MaybeActingUser(pub Option<ActingUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeActingUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeSession(claims) = MaybeSession::from_request_parts(parts, state).await?;
        let acting = state.services.identity.resolve(claims.as_ref()).await?;
        Ok(MaybeActingUser(acting))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::search_books).post(books::create_book))
        .route("/books/categories", get(books::list_categories))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Borrowing workflow
        .route(
            "/borrowings",
            get(borrowings::list_borrowings).post(borrowings::borrow_book),
        )
        .route("/borrowings/:id/return", post(borrowings::return_book))
        // Acting user
        .route("/me/loans", get(borrowings::my_loans))
        .route("/me/stats", get(stats::my_stats))
        // Users
        .route("/users", get(users::list_users))
        .route("/users/me", post(users::ensure_me))
        // Statistics
        .route("/stats", get(stats::library_stats))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
