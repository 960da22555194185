//! Catalog queries and librarian catalog management

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        borrowing::{BorrowingQuery, LoanDetails},
        user::{require_acting, require_staff, ActingUser, UserSummary},
    },
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Search books by text, category and status. Blank filters are ignored.
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.store.list_books(query).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.store.get_book(id).await
    }

    /// Distinct categories, sorted
    pub async fn categories(&self) -> AppResult<Vec<String>> {
        self.store.list_categories().await
    }

    /// Add a book to the catalog. New books start out available.
    pub async fn create_book(&self, acting: Option<&ActingUser>, book: CreateBook) -> AppResult<Book> {
        let acting = require_staff(acting)?;
        book.validate()?;

        let created = self.store.create_book(&book).await?;
        tracing::info!(book_id = created.id, user_id = acting.id(), "Book created");
        Ok(created)
    }

    pub async fn update_book(
        &self,
        acting: Option<&ActingUser>,
        id: i32,
        book: UpdateBook,
    ) -> AppResult<Book> {
        let acting = require_staff(acting)?;
        book.validate()?;

        let updated = self.store.update_book(id, &book).await?;
        tracing::info!(book_id = id, user_id = acting.id(), "Book updated");
        Ok(updated)
    }

    /// Remove a book that was never borrowed
    pub async fn delete_book(&self, acting: Option<&ActingUser>, id: i32) -> AppResult<()> {
        let acting = require_staff(acting)?;

        self.store.delete_book(id).await?;
        tracing::info!(book_id = id, user_id = acting.id(), "Book deleted");
        Ok(())
    }

    /// Borrowings of the acting user with their books, newest first
    pub async fn my_loans(
        &self,
        acting: Option<&ActingUser>,
        active_only: bool,
    ) -> AppResult<Vec<LoanDetails>> {
        let acting = require_acting(acting)?;
        let today = Utc::now().date_naive();
        self.store
            .list_borrowings_for_user(acting.id(), active_only, today)
            .await
    }

    pub async fn list_borrowings(
        &self,
        acting: Option<&ActingUser>,
        query: &BorrowingQuery,
    ) -> AppResult<Vec<LoanDetails>> {
        require_staff(acting)?;
        let today = Utc::now().date_naive();
        self.store.list_borrowings(query, today).await
    }

    pub async fn list_users(&self, acting: Option<&ActingUser>) -> AppResult<Vec<UserSummary>> {
        require_staff(acting)?;
        let today = Utc::now().date_naive();
        self.store.list_users(today).await
    }
}
