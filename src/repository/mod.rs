//! Catalog store: persistence for books, borrowings and users
//!
//! Services talk to the store through [`CatalogStore`]. Composite writes
//! (`borrow_book`, `return_borrowing`) are atomic units owned by the store:
//! the book status flip and the borrowing write either both land or neither
//! does.

pub mod books;
pub mod borrowings;
pub mod memory;
pub mod stats;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookStatus, CreateBook, UpdateBook},
        borrowing::{Borrowing, BorrowingQuery, LoanDetails, NewBorrowing},
        stats::LibraryStats,
        user::{ExternalPrincipal, User, UserSummary},
    },
};

pub use memory::MemoryStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Check that the store is reachable
    async fn ping(&self) -> AppResult<()>;

    async fn get_book(&self, id: i32) -> AppResult<Book>;
    async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>>;
    async fn list_categories(&self) -> AppResult<Vec<String>>;
    async fn create_book(&self, book: &CreateBook) -> AppResult<Book>;
    async fn update_book(&self, id: i32, book: &UpdateBook) -> AppResult<Book>;
    async fn delete_book(&self, id: i32) -> AppResult<()>;

    async fn get_borrowing(&self, id: i32) -> AppResult<Borrowing>;
    async fn list_borrowings_for_user(
        &self,
        user_id: i32,
        active_only: bool,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>>;
    async fn list_borrowings(
        &self,
        query: &BorrowingQuery,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>>;

    /// Atomically flip the book from `Available` to `Borrowed` and insert
    /// the open borrowing. `NotFound` for an unknown book, `Conflict` when
    /// the book is not available.
    async fn borrow_book(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing>;

    /// Atomically close the borrowing and flip its book back to
    /// `Available`. `NotFound` for an unknown borrowing, `Conflict` when it
    /// was already returned.
    async fn return_borrowing(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Borrowing>;

    async fn get_user(&self, id: i32) -> AppResult<User>;
    async fn find_user_by_external_id(&self, external_id: &str) -> AppResult<Option<User>>;
    /// Insert-if-absent keyed on the external id
    async fn upsert_user(&self, principal: &ExternalPrincipal) -> AppResult<User>;
    async fn list_users(&self, today: NaiveDate) -> AppResult<Vec<UserSummary>>;

    /// Catalog and circulation counters, aggregated by the store
    async fn library_stats(&self, today: NaiveDate) -> AppResult<LibraryStats>;
}

/// PostgreSQL-backed store holding the connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub borrowings: borrowings::BorrowingsRepository,
    pub users: users::UsersRepository,
    pub stats: stats::StatsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            borrowings: borrowings::BorrowingsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            stats: stats::StatsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl CatalogStore for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books.get_by_id(id).await
    }

    async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.books.search(query).await
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        self.books.categories().await
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        self.books.create(book).await
    }

    async fn update_book(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        self.books.update(id, book).await
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.books.delete(id).await
    }

    async fn get_borrowing(&self, id: i32) -> AppResult<Borrowing> {
        self.borrowings.get_by_id(id).await
    }

    async fn list_borrowings_for_user(
        &self,
        user_id: i32,
        active_only: bool,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        self.borrowings.list_for_user(user_id, active_only, today).await
    }

    async fn list_borrowings(
        &self,
        query: &BorrowingQuery,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        self.borrowings.list(query, today).await
    }

    async fn borrow_book(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        // Dropping `tx` on any early return rolls the unit back
        let mut tx = self.pool.begin().await?;

        let flipped = books::BooksRepository::transition_status(
            &mut tx,
            borrowing.book_id,
            BookStatus::Available,
            BookStatus::Borrowed,
        )
        .await?;

        if !flipped {
            return match books::BooksRepository::status_of(&mut tx, borrowing.book_id).await? {
                None => Err(AppError::NotFound(format!(
                    "Book with id {} not found",
                    borrowing.book_id
                ))),
                Some(_) => Err(AppError::Conflict("Book not available".to_string())),
            };
        }

        let created = borrowings::BorrowingsRepository::insert(&mut tx, borrowing).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn return_borrowing(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let closed = match borrowings::BorrowingsRepository::close(&mut tx, id, returned_at).await? {
            Some(borrowing) => borrowing,
            None => {
                return match borrowings::BorrowingsRepository::find(&mut tx, id).await? {
                    None => Err(AppError::NotFound(format!("Borrowing with id {} not found", id))),
                    Some(_) => Err(AppError::Conflict("Borrowing already returned".to_string())),
                };
            }
        };

        books::BooksRepository::update_status(&mut tx, closed.book_id, BookStatus::Available)
            .await?;
        tx.commit().await?;

        Ok(closed)
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.users.get_by_id(id).await
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        self.users.get_by_external_id(external_id).await
    }

    async fn upsert_user(&self, principal: &ExternalPrincipal) -> AppResult<User> {
        self.users.upsert(principal).await
    }

    async fn list_users(&self, today: NaiveDate) -> AppResult<Vec<UserSummary>> {
        self.users.list_with_counts(today).await
    }

    async fn library_stats(&self, today: NaiveDate) -> AppResult<LibraryStats> {
        self.stats.library(today).await
    }
}
