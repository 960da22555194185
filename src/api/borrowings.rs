//! Borrowing endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrowing::{BorrowRequest, Borrowing, BorrowingQuery, LoanDetails, MyLoansQuery},
};

use super::{ApiJson, ApiPath, ApiQuery, MaybeActingUser};

/// Borrow response
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub borrowing: Borrowing,
    /// Status message
    pub message: String,
}

/// Borrow a book
///
/// `due_date` defaults to the configured loan length. A date is rejected as
/// past only once it has ended in every timezone, so a client's local today
/// is always accepted.
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    MaybeActingUser(acting): MaybeActingUser,
    ApiJson(request): ApiJson<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let borrowing = state.services.borrowings.borrow(acting.as_ref(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            borrowing,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = Borrowing),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the borrower", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    MaybeActingUser(acting): MaybeActingUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state.services.borrowings.return_book(acting.as_ref(), id).await?;
    Ok(Json(borrowing))
}

/// List all borrowings (librarian)
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowings, newest first", body = Vec<LoanDetails>),
        (status = 403, description = "Librarian privileges required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    MaybeActingUser(acting): MaybeActingUser,
    ApiQuery(query): ApiQuery<BorrowingQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.catalog.list_borrowings(acting.as_ref(), &query).await?;
    Ok(Json(loans))
}

/// Loans of the current user
#[utoipa::path(
    get,
    path = "/me/loans",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(MyLoansQuery),
    responses(
        (status = 200, description = "Own loans, newest first", body = Vec<LoanDetails>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    MaybeActingUser(acting): MaybeActingUser,
    ApiQuery(query): ApiQuery<MyLoansQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state
        .services
        .catalog
        .my_loans(acting.as_ref(), query.active_only)
        .await?;
    Ok(Json(loans))
}
