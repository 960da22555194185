//! Dashboard counters

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog and circulation counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LibraryStats {
    pub total_books: i64,
    pub available_books: i64,
    pub borrowed_books: i64,
    /// Number of distinct categories
    pub categories: i64,
    pub active_borrowings: i64,
    pub overdue_borrowings: i64,
}

/// Loan counters of a single user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MyStats {
    pub total_loans: i64,
    /// Currently out
    pub borrowed: i64,
    pub overdue: i64,
    pub returned: i64,
}
