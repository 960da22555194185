//! Borrowing workflow: the borrow/return state machine
//!
//! Per book: `Available --borrow--> Borrowed --return--> Available`.
//! Preconditions are checked here so callers get precise errors; the store
//! re-checks them inside its atomic unit, so a lost race still ends in
//! `Conflict` with nothing written.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use validator::Validate;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        borrowing::{BorrowRequest, Borrowing, NewBorrowing},
        user::{require_acting, ActingUser},
    },
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct BorrowingsService {
    store: Arc<dyn CatalogStore>,
    config: LoansConfig,
}

impl BorrowingsService {
    pub fn new(store: Arc<dyn CatalogStore>, config: LoansConfig) -> Self {
        Self { store, config }
    }

    /// Borrow a book for the acting user
    pub async fn borrow(
        &self,
        acting: Option<&ActingUser>,
        request: BorrowRequest,
    ) -> AppResult<Borrowing> {
        let acting = require_acting(acting)?;
        request.validate()?;

        let now = Utc::now();
        let today = now.date_naive();
        let due_date = request
            .due_date
            .unwrap_or_else(|| today + Duration::days(self.config.default_duration_days as i64));
        if due_date < earliest_current_date(now) {
            return Err(AppError::Validation(
                "Due date must be today or later".to_string(),
            ));
        }

        let book = self.store.get_book(request.book_id).await?;
        if !book.is_available() {
            return Err(AppError::Conflict("Book not available".to_string()));
        }

        let borrowing = self
            .store
            .borrow_book(&NewBorrowing {
                book_id: book.id,
                user_id: acting.id(),
                student_id: non_blank(request.student_id),
                student_name: non_blank(request.student_name),
                borrow_date: now,
                due_date,
            })
            .await?;

        tracing::info!(
            borrowing_id = borrowing.id,
            book_id = book.id,
            user_id = acting.id(),
            %due_date,
            "Book borrowed"
        );
        Ok(borrowing)
    }

    /// Return a borrowed book. Allowed for the borrower and for staff.
    pub async fn return_book(
        &self,
        acting: Option<&ActingUser>,
        borrowing_id: i32,
    ) -> AppResult<Borrowing> {
        let acting = require_acting(acting)?;

        let borrowing = self.store.get_borrowing(borrowing_id).await?;
        if borrowing.user_id != acting.id() && !acting.role.is_staff() {
            return Err(AppError::Forbidden(
                "Only the borrower or a librarian can return this book".to_string(),
            ));
        }
        if !borrowing.is_open() {
            return Err(AppError::Conflict("Borrowing already returned".to_string()));
        }

        let returned = self
            .store
            .return_borrowing(borrowing_id, Utc::now())
            .await?;

        tracing::info!(
            borrowing_id = returned.id,
            book_id = returned.book_id,
            user_id = acting.id(),
            "Book returned"
        );
        Ok(returned)
    }
}

/// The earliest calendar date still current somewhere (UTC-12). A due date
/// is only in the past once it is past in every timezone.
pub fn earliest_current_date(now: DateTime<Utc>) -> NaiveDate {
    (now - Duration::hours(12)).date_naive()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
