//! Aggregate counters for dashboards

use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row};

use crate::{error::AppResult, models::stats::LibraryStats};

#[derive(Clone)]
pub struct StatsRepository {
    pool: Pool<Postgres>,
}

impl StatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Catalog and circulation counters computed in one round trip
    pub async fn library(&self, today: NaiveDate) -> AppResult<LibraryStats> {
        let row = sqlx::query(
            r#"
            SELECT b.total_books, b.available_books, b.borrowed_books, b.categories,
                   br.active_borrowings, br.overdue_borrowings
            FROM (
                SELECT COUNT(*) AS total_books,
                       COUNT(*) FILTER (WHERE status = 'Available') AS available_books,
                       COUNT(*) FILTER (WHERE status = 'Borrowed') AS borrowed_books,
                       COUNT(DISTINCT category) FILTER (WHERE category <> '') AS categories
                FROM books
            ) b
            CROSS JOIN (
                SELECT COUNT(*) AS active_borrowings,
                       COUNT(*) FILTER (WHERE due_date < $1) AS overdue_borrowings
                FROM borrowings
                WHERE return_date IS NULL
            ) br
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(LibraryStats {
            total_books: row.try_get("total_books")?,
            available_books: row.try_get("available_books")?,
            borrowed_books: row.try_get("borrowed_books")?,
            categories: row.try_get("categories")?,
            active_borrowings: row.try_get("active_borrowings")?,
            overdue_borrowings: row.try_get("overdue_borrowings")?,
        })
    }
}
