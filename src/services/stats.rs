//! Statistics service

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::AppResult,
    models::{
        borrowing::BorrowingStatus,
        stats::{LibraryStats, MyStats},
        user::{require_acting, require_staff, ActingUser},
    },
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn CatalogStore>,
}

impl StatsService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Catalog and circulation counters for the librarian dashboard
    pub async fn library_stats(&self, acting: Option<&ActingUser>) -> AppResult<LibraryStats> {
        require_staff(acting)?;
        let today = Utc::now().date_naive();
        self.store.library_stats(today).await
    }

    /// Loan counters of the acting user
    pub async fn my_stats(&self, acting: Option<&ActingUser>) -> AppResult<MyStats> {
        let acting = require_acting(acting)?;
        let today = Utc::now().date_naive();

        let loans = self
            .store
            .list_borrowings_for_user(acting.id(), false, today)
            .await?;

        let borrowed = loans
            .iter()
            .filter(|l| l.status == BorrowingStatus::Borrowed)
            .count() as i64;

        Ok(MyStats {
            total_loans: loans.len() as i64,
            borrowed,
            overdue: loans.iter().filter(|l| l.is_overdue).count() as i64,
            returned: loans.len() as i64 - borrowed,
        })
    }
}
