//! In-process catalog store
//!
//! Every operation runs under a single lock, which makes each composite
//! write atomic with respect to all other callers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookStatus, CreateBook, UpdateBook},
        borrowing::{Borrowing, BorrowingQuery, BorrowingStatus, LoanDetails, NewBorrowing},
        stats::LibraryStats,
        user::{ExternalPrincipal, User, UserSummary},
    },
};

use super::CatalogStore;

#[derive(Default)]
struct MemoryState {
    books: BTreeMap<i32, Book>,
    borrowings: BTreeMap<i32, Borrowing>,
    users: BTreeMap<i32, User>,
    next_book_id: i32,
    next_borrowing_id: i32,
    next_user_id: i32,
}

impl MemoryState {
    fn book(&self, id: i32) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn book_mut(&mut self, id: i32) -> AppResult<&mut Book> {
        self.books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn borrowing(&self, id: i32) -> AppResult<&Borrowing> {
        self.borrowings
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    fn loan(&self, borrowing: &Borrowing, today: NaiveDate) -> AppResult<LoanDetails> {
        let book = self.book(borrowing.book_id)?.clone();
        Ok(LoanDetails::new(borrowing.clone(), book, today))
    }

    /// Newest first, matching the SQL ordering
    fn loans_where<F>(&self, today: NaiveDate, keep: F) -> AppResult<Vec<LoanDetails>>
    where
        F: Fn(&Borrowing) -> bool,
    {
        let mut selected: Vec<&Borrowing> = self.borrowings.values().filter(|b| keep(*b)).collect();
        selected.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date).then(b.id.cmp(&a.id)));
        selected.into_iter().map(|b| self.loan(b, today)).collect()
    }
}

/// Catalog store kept in process memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.state.lock().await.book(id).cloned()
    }

    async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .values()
            .filter(|book| query.matches(book))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut categories: Vec<String> = state
            .books
            .values()
            .filter_map(|book| book.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        state.next_book_id += 1;
        let created = Book {
            id: state.next_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            category: book.category.clone(),
            description: book.description.clone(),
            cover: book.cover.clone(),
            status: BookStatus::Available,
            isbn: book.isbn.clone(),
            published_year: book.published_year,
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_book(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        let stored = state.book_mut(id)?;
        book.apply_to(stored);
        Ok(stored.clone())
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.book(id)?;
        if state.borrowings.values().any(|b| b.book_id == id) {
            return Err(AppError::Conflict(
                "Book has borrowing history and cannot be deleted".to_string(),
            ));
        }
        state.books.remove(&id);
        Ok(())
    }

    async fn get_borrowing(&self, id: i32) -> AppResult<Borrowing> {
        self.state.lock().await.borrowing(id).cloned()
    }

    async fn list_borrowings_for_user(
        &self,
        user_id: i32,
        active_only: bool,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;
        state.loans_where(today, |b| b.user_id == user_id && (!active_only || b.is_open()))
    }

    async fn list_borrowings(
        &self,
        query: &BorrowingQuery,
        today: NaiveDate,
    ) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;
        state.loans_where(today, |b| query.matches(b, today))
    }

    async fn borrow_book(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        let mut state = self.state.lock().await;

        if !state.users.contains_key(&borrowing.user_id) {
            return Err(AppError::NotFound(format!(
                "User with id {} not found",
                borrowing.user_id
            )));
        }
        if !state.book(borrowing.book_id)?.is_available() {
            return Err(AppError::Conflict("Book not available".to_string()));
        }

        state.next_borrowing_id += 1;
        let created = Borrowing {
            id: state.next_borrowing_id,
            book_id: borrowing.book_id,
            user_id: borrowing.user_id,
            student_id: borrowing.student_id.clone(),
            student_name: borrowing.student_name.clone(),
            borrow_date: borrowing.borrow_date,
            due_date: borrowing.due_date,
            return_date: None,
            status: BorrowingStatus::Borrowed,
        };

        state.book_mut(borrowing.book_id)?.status = BookStatus::Borrowed;
        state.borrowings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn return_borrowing(&self, id: i32, returned_at: DateTime<Utc>) -> AppResult<Borrowing> {
        let mut state = self.state.lock().await;

        let book_id = {
            let borrowing = state.borrowing(id)?;
            if !borrowing.is_open() {
                return Err(AppError::Conflict("Borrowing already returned".to_string()));
            }
            borrowing.book_id
        };
        // Checked before any write so a dangling book id changes nothing
        state.book(book_id)?;

        state.book_mut(book_id)?.status = BookStatus::Available;
        let borrowing = state
            .borrowings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;
        borrowing.return_date = Some(returned_at);
        borrowing.status = BorrowingStatus::Returned;
        Ok(borrowing.clone())
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.state
            .lock()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.external_id == external_id)
            .cloned())
    }

    async fn upsert_user(&self, principal: &ExternalPrincipal) -> AppResult<User> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .users
            .values()
            .find(|u| u.external_id == principal.external_id)
        {
            return Ok(existing.clone());
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            external_id: principal.external_id.clone(),
            name: principal.name.clone(),
            email: principal.email.clone(),
            image_url: principal.image_url.clone(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self, today: NaiveDate) -> AppResult<Vec<UserSummary>> {
        let state = self.state.lock().await;
        let mut users: Vec<UserSummary> = state
            .users
            .values()
            .map(|user| {
                let open = state
                    .borrowings
                    .values()
                    .filter(|b| b.user_id == user.id && b.is_open());
                UserSummary {
                    user: user.clone(),
                    active_borrowings: open.clone().count() as i64,
                    overdue_borrowings: open.filter(|b| b.is_overdue(today)).count() as i64,
                }
            })
            .collect();
        users.sort_by(|a, b| a.user.name.cmp(&b.user.name).then(a.user.id.cmp(&b.user.id)));
        Ok(users)
    }

    async fn library_stats(&self, today: NaiveDate) -> AppResult<LibraryStats> {
        let state = self.state.lock().await;

        let available = state.books.values().filter(|b| b.is_available()).count() as i64;
        let mut categories: Vec<&str> = state
            .books
            .values()
            .filter_map(|b| b.category.as_deref())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        let open = state.borrowings.values().filter(|b| b.is_open());

        Ok(LibraryStats {
            total_books: state.books.len() as i64,
            available_books: available,
            borrowed_books: state.books.len() as i64 - available,
            categories: categories.len() as i64,
            active_borrowings: open.clone().count() as i64,
            overdue_borrowings: open.filter(|b| b.is_overdue(today)).count() as i64,
        })
    }
}
