//! Statistics endpoints

use axum::{extract::State, Json};

use crate::error::AppResult;

pub use crate::models::stats::{LibraryStats, MyStats};

use super::MaybeActingUser;

/// Library statistics (librarian)
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = LibraryStats),
        (status = 403, description = "Librarian privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn library_stats(
    State(state): State<crate::AppState>,
    MaybeActingUser(acting): MaybeActingUser,
) -> AppResult<Json<LibraryStats>> {
    let stats = state.services.stats.library_stats(acting.as_ref()).await?;
    Ok(Json(stats))
}

/// Loan statistics of the current user
#[utoipa::path(
    get,
    path = "/me/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own loan statistics", body = MyStats),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_stats(
    State(state): State<crate::AppState>,
    MaybeActingUser(acting): MaybeActingUser,
) -> AppResult<Json<MyStats>> {
    let stats = state.services.stats.my_stats(acting.as_ref()).await?;
    Ok(Json(stats))
}
