//! Data models for Libris

pub mod book;
pub mod borrowing;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookQuery, BookStatus, CreateBook, UpdateBook};
pub use borrowing::{Borrowing, BorrowingQuery, BorrowingStatus, LoanDetails, NewBorrowing};
pub use stats::{LibraryStats, MyStats};
pub use user::{ActingUser, ExternalPrincipal, User, UserRole, UserSummary};
