//! User endpoints

use axum::{extract::State, Json};

use crate::{
    error::{AppError, AppResult},
    models::user::{User, UserSummary},
};

use super::{MaybeActingUser, MaybeSession};

/// Bind the session's identity to a user record, creating it on first call
#[utoipa::path(
    post,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user record", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn ensure_me(
    State(state): State<crate::AppState>,
    MaybeSession(claims): MaybeSession,
) -> AppResult<Json<User>> {
    let claims =
        claims.ok_or_else(|| AppError::Unauthenticated("No authenticated user".to_string()))?;

    let user = state.services.identity.ensure_user(&claims.principal()).await?;
    Ok(Json(user))
}

/// List users with their loan counters (librarian)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users sorted by name", body = Vec<UserSummary>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Librarian privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    MaybeActingUser(acting): MaybeActingUser,
) -> AppResult<Json<Vec<UserSummary>>> {
    let users = state.services.catalog.list_users(acting.as_ref()).await?;
    Ok(Json(users))
}
