//! Books repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookStatus, CreateBook, UpdateBook},
};

const BOOK_COLUMNS: &str =
    "id, title, author, category, description, cover, status, isbn, published_year";

/// Escape LIKE wildcards so user input is matched literally
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn history_conflict() -> AppError {
    AppError::Conflict("Book has borrowing history and cannot be deleted".to_string())
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search books, in id order
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {}
            FROM books
            WHERE ($1::text IS NULL
                   OR title ILIKE $1
                   OR author ILIKE $1
                   OR description ILIKE $1)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY id
            "#,
            BOOK_COLUMNS
        ))
        .bind(query.text().map(like_pattern))
        .bind(query.category())
        .bind(query.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Distinct non-empty categories, sorted
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category
            FROM books
            WHERE category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Create a new book (always `Available`)
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, category, description, cover, status, isbn, published_year)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.description)
        .bind(&book.cover)
        .bind(BookStatus::Available)
        .bind(&book.isbn)
        .bind(book.published_year)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update descriptive fields; status is never written here
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                category = COALESCE($4, category),
                description = COALESCE($5, description),
                cover = COALESCE($6, cover),
                isbn = COALESCE($7, isbn),
                published_year = COALESCE($8, published_year)
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(&book.description)
        .bind(&book.cover)
        .bind(&book.isbn)
        .bind(book.published_year)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book that has never been borrowed. The book row is locked
    /// first so a borrow committing in between is seen as history.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if locked.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let has_history: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE book_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_history {
            return Err(history_conflict());
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => history_conflict(),
                other => AppError::from(other),
            })?;

        tx.commit().await?;
        Ok(())
    }

    /// Move a book from `from` to `to`. Returns false when the book is
    /// missing or not currently in `from`; the row lock taken by the update
    /// serializes concurrent callers.
    pub async fn transition_status(
        conn: &mut PgConnection,
        id: i32,
        from: BookStatus,
        to: BookStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE books SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Unconditionally set a book's status
    pub async fn update_status(conn: &mut PgConnection, id: i32, status: BookStatus) -> AppResult<()> {
        let result = sqlx::query("UPDATE books SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Current status, if the book exists
    pub async fn status_of(conn: &mut PgConnection, id: i32) -> AppResult<Option<BookStatus>> {
        let status = sqlx::query_scalar::<_, BookStatus>("SELECT status FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(status)
    }
}
