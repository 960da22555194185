//! Borrowing (loan) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::Book;

/// Borrowing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum BorrowingStatus {
    Borrowed,
    Returned,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Borrowed => "Borrowed",
            BorrowingStatus::Returned => "Returned",
        }
    }
}

impl std::fmt::Display for BorrowingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "borrowed" => Ok(BorrowingStatus::Borrowed),
            "returned" => Ok(BorrowingStatus::Returned),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

/// Accepts any letter case, like `FromStr`
impl<'de> Deserialize<'de> for BorrowingStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl sqlx::Type<Postgres> for BorrowingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for BorrowingStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowingStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Borrowing model from database. Rows are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    /// Display snapshot of the student the book was handed to
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
}

impl Borrowing {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }
}

/// Values for a borrowing insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewBorrowing {
    pub book_id: i32,
    pub user_id: i32,
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: NaiveDate,
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BorrowRequest {
    pub book_id: i32,
    /// Due date (defaults to the configured loan duration)
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 50, message = "Student id must be at most 50 characters"))]
    pub student_id: Option<String>,
    #[validate(length(max = 100, message = "Student name must be at most 100 characters"))]
    pub student_name: Option<String>,
}

/// Borrowing joined with its book, for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub borrowing_id: i32,
    pub user_id: i32,
    pub book: Book,
    pub student_id: Option<String>,
    pub student_name: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn new(borrowing: Borrowing, book: Book, today: NaiveDate) -> Self {
        let is_overdue = borrowing.is_overdue(today);
        Self {
            borrowing_id: borrowing.id,
            user_id: borrowing.user_id,
            book,
            student_id: borrowing.student_id,
            student_name: borrowing.student_name,
            borrow_date: borrowing.borrow_date,
            due_date: borrowing.due_date,
            return_date: borrowing.return_date,
            status: borrowing.status,
            is_overdue,
        }
    }
}

/// Borrowing list filters (librarian view)
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    pub status: Option<BorrowingStatus>,
    /// Only open borrowings past their due date
    pub overdue: Option<bool>,
    pub user_id: Option<i32>,
}

impl BorrowingQuery {
    pub fn matches(&self, borrowing: &Borrowing, today: NaiveDate) -> bool {
        self.status.map(|s| borrowing.status == s).unwrap_or(true)
            && self
                .overdue
                .map(|o| borrowing.is_overdue(today) == o)
                .unwrap_or(true)
            && self.user_id.map(|u| borrowing.user_id == u).unwrap_or(true)
    }
}

/// Filter for a user's own loans
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MyLoansQuery {
    /// Only borrowings that are still out
    #[serde(default)]
    pub active_only: bool,
}
