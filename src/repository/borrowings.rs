//! Borrowings repository for database operations

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgRow, PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{Borrowing, BorrowingQuery, BorrowingStatus, LoanDetails, NewBorrowing},
    },
};

const BORROWING_COLUMNS: &str = "id, book_id, user_id, student_id, student_name, \
     borrow_date, due_date, return_date, status";

/// Borrowings joined with their book; aliases keep both id columns apart
const LOAN_SELECT: &str = r#"
    SELECT br.id AS borrowing_id, br.user_id, br.student_id, br.student_name,
           br.borrow_date, br.due_date, br.return_date, br.status AS borrowing_status,
           b.id AS book_id, b.title, b.author, b.category, b.description, b.cover,
           b.status AS book_status, b.isbn, b.published_year
    FROM borrowings br
    JOIN books b ON b.id = br.book_id
"#;

fn loan_from_row(row: &PgRow, today: NaiveDate) -> Result<LoanDetails, sqlx::Error> {
    let borrowing = Borrowing {
        id: row.try_get("borrowing_id")?,
        book_id: row.try_get("book_id")?,
        user_id: row.try_get("user_id")?,
        student_id: row.try_get("student_id")?,
        student_name: row.try_get("student_name")?,
        borrow_date: row.try_get("borrow_date")?,
        due_date: row.try_get("due_date")?,
        return_date: row.try_get("return_date")?,
        status: row.try_get("borrowing_status")?,
    };
    let book = Book {
        id: row.try_get("book_id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        cover: row.try_get("cover")?,
        status: row.try_get("book_status")?,
        isbn: row.try_get("isbn")?,
        published_year: row.try_get("published_year")?,
    };
    Ok(LoanDetails::new(borrowing, book, today))
}

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        Self::find(&mut *self.pool.acquire().await?, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    /// Borrowings of a user with book details, newest first
    pub async fn list_for_user(
        &self,
        user_id: i32,
        active_only: bool,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(&format!(
            r#"
            {}
            WHERE br.user_id = $1 AND (NOT $2 OR br.return_date IS NULL)
            ORDER BY br.borrow_date DESC, br.id DESC
            "#,
            LOAN_SELECT
        ))
        .bind(user_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        let loans = rows
            .iter()
            .map(|row| loan_from_row(row, today))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    /// All borrowings matching the query, newest first
    pub async fn list(&self, query: &BorrowingQuery, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let rows = sqlx::query(&format!(
            r#"
            {}
            WHERE ($1::text IS NULL OR br.status = $1)
              AND ($2::boolean IS NULL
                   OR (br.return_date IS NULL AND br.due_date < $3) = $2)
              AND ($4::integer IS NULL OR br.user_id = $4)
            ORDER BY br.borrow_date DESC, br.id DESC
            "#,
            LOAN_SELECT
        ))
        .bind(query.status)
        .bind(query.overdue)
        .bind(today)
        .bind(query.user_id)
        .fetch_all(&self.pool)
        .await?;

        let loans = rows
            .iter()
            .map(|row| loan_from_row(row, today))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    /// Fetch a borrowing on the given connection
    pub async fn find(conn: &mut PgConnection, id: i32) -> AppResult<Option<Borrowing>> {
        let borrowing = sqlx::query_as::<_, Borrowing>(&format!(
            "SELECT {} FROM borrowings WHERE id = $1",
            BORROWING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(borrowing)
    }

    /// Insert an open borrowing. A second open borrowing for the same book
    /// violates `borrowings_one_open_per_book` and surfaces as a conflict.
    pub async fn insert(conn: &mut PgConnection, new: &NewBorrowing) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            INSERT INTO borrowings (book_id, user_id, student_id, student_name,
                                    borrow_date, due_date, return_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, $7)
            RETURNING {}
            "#,
            BORROWING_COLUMNS
        ))
        .bind(new.book_id)
        .bind(new.user_id)
        .bind(&new.student_id)
        .bind(&new.student_name)
        .bind(new.borrow_date)
        .bind(new.due_date)
        .bind(BorrowingStatus::Borrowed)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Book not available".to_string())
            }
            other => AppError::from(other),
        })
    }

    /// Close an open borrowing. Returns None when it is missing or already closed.
    pub async fn close(
        conn: &mut PgConnection,
        id: i32,
        returned_at: DateTime<Utc>,
    ) -> AppResult<Option<Borrowing>> {
        let borrowing = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            UPDATE borrowings
            SET return_date = $2, status = $3
            WHERE id = $1 AND return_date IS NULL
            RETURNING {}
            "#,
            BORROWING_COLUMNS
        ))
        .bind(id)
        .bind(returned_at)
        .bind(BorrowingStatus::Returned)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(borrowing)
    }
}
