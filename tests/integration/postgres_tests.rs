//! PostgreSQL store tests
//!
//! Each test gets a fresh database with the migrations applied.
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres_tests -- --ignored

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use libris_server::{
    error::AppError,
    models::{
        book::{BookQuery, BookStatus, CreateBook},
        borrowing::{BorrowingQuery, BorrowingStatus, NewBorrowing},
        user::ExternalPrincipal,
    },
    repository::{books::BooksRepository, borrowings::BorrowingsRepository, CatalogStore, Repository},
};

fn new_book(title: &str) -> CreateBook {
    CreateBook {
        title: title.into(),
        author: "Author".into(),
        category: Some("Fiction".into()),
        description: None,
        cover: None,
        isbn: None,
        published_year: None,
    }
}

fn principal(external_id: &str) -> ExternalPrincipal {
    ExternalPrincipal {
        external_id: external_id.into(),
        name: external_id.into(),
        email: format!("{}@example.com", external_id),
        image_url: None,
    }
}

fn new_borrowing(book_id: i32, user_id: i32, due_in_days: i64) -> NewBorrowing {
    let now = Utc::now();
    NewBorrowing {
        book_id,
        user_id,
        student_id: None,
        student_name: None,
        borrow_date: now,
        due_date: now.date_naive() + Duration::days(due_in_days),
    }
}

async fn open_borrowings(repo: &Repository, book_id: i32) -> usize {
    let today = Utc::now().date_naive();
    repo.list_borrowings(
        &BorrowingQuery {
            status: Some(BorrowingStatus::Borrowed),
            ..Default::default()
        },
        today,
    )
    .await
    .unwrap()
    .iter()
    .filter(|l| l.book.id == book_id)
    .count()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_borrows_leave_one_winner(pool: PgPool) {
    let repo = Repository::new(pool);
    let book = repo.create_book(&new_book("The Great Gatsby")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..12 {
        let user = repo.upsert_user(&principal(&format!("student-{}", i))).await.unwrap();
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.borrow_book(&new_borrowing(book.id, user.id, 14)).await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 11);
    assert_eq!(open_borrowings(&repo, book.id).await, 1);
    assert_eq!(repo.get_book(book.id).await.unwrap().status, BookStatus::Borrowed);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn return_reopens_book_and_double_return_conflicts(pool: PgPool) {
    let repo = Repository::new(pool);
    let book = repo.create_book(&new_book("Dune")).await.unwrap();
    let user = repo.upsert_user(&principal("alice")).await.unwrap();

    let borrowing = repo.borrow_book(&new_borrowing(book.id, user.id, 7)).await.unwrap();
    assert_eq!(repo.get_book(book.id).await.unwrap().status, BookStatus::Borrowed);

    let returned = repo.return_borrowing(borrowing.id, Utc::now()).await.unwrap();
    assert_eq!(returned.status, BorrowingStatus::Returned);
    assert!(returned.return_date.is_some());
    assert_eq!(repo.get_book(book.id).await.unwrap().status, BookStatus::Available);

    let again = repo.return_borrowing(borrowing.id, Utc::now()).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
    let stored = repo.get_borrowing(borrowing.id).await.unwrap();
    assert_eq!(stored.return_date, returned.return_date);

    let missing = repo.return_borrowing(borrowing.id + 1000, Utc::now()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn borrowing_an_unavailable_or_unknown_book_writes_nothing(pool: PgPool) {
    let repo = Repository::new(pool);
    let book = repo.create_book(&new_book("Dune")).await.unwrap();
    let alice = repo.upsert_user(&principal("alice")).await.unwrap();
    let bob = repo.upsert_user(&principal("bob")).await.unwrap();

    repo.borrow_book(&new_borrowing(book.id, alice.id, 7)).await.unwrap();

    let second = repo.borrow_book(&new_borrowing(book.id, bob.id, 7)).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(open_borrowings(&repo, book.id).await, 1);

    let unknown = repo.borrow_book(&new_borrowing(book.id + 1000, bob.id, 7)).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn second_open_borrowing_is_a_conflict(pool: PgPool) {
    let repo = Repository::new(pool.clone());
    let book = repo.create_book(&new_book("Dune")).await.unwrap();
    let user = repo.upsert_user(&principal("alice")).await.unwrap();
    repo.borrow_book(&new_borrowing(book.id, user.id, 7)).await.unwrap();

    // Skip the status guard and hit the open-borrowing index directly
    let mut tx = pool.begin().await.unwrap();
    let result = BorrowingsRepository::insert(&mut tx, &new_borrowing(book.id, user.id, 7)).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_upserts_create_one_user(pool: PgPool) {
    let repo = Repository::new(pool);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.upsert_user(&principal("user_2abc")).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let users = repo.list_users(Utc::now().date_naive()).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user.external_id, "user_2abc");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn search_matches_wildcards_literally(pool: PgPool) {
    let repo = Repository::new(pool);
    for title in ["100% Pure", "1000 Pure", "snake_case", "snakeXcase"] {
        repo.create_book(&new_book(title)).await.unwrap();
    }

    let search = |q: &str| BookQuery {
        q: Some(q.into()),
        category: None,
        status: None,
    };

    let percent = repo.list_books(&search("100%")).await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].title, "100% Pure");

    let underscore = repo.list_books(&search("E_C")).await.unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].title, "snake_case");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn delete_waits_for_in_flight_borrow_and_conflicts(pool: PgPool) {
    let repo = Repository::new(pool.clone());
    let book = repo.create_book(&new_book("Dune")).await.unwrap();
    let user = repo.upsert_user(&principal("alice")).await.unwrap();

    // Same writes as a borrow, held open while the delete starts
    let mut tx = pool.begin().await.unwrap();
    let flipped =
        BooksRepository::transition_status(&mut tx, book.id, BookStatus::Available, BookStatus::Borrowed)
            .await
            .unwrap();
    assert!(flipped);
    BorrowingsRepository::insert(&mut tx, &new_borrowing(book.id, user.id, 7))
        .await
        .unwrap();

    let deleting = {
        let repo = repo.clone();
        tokio::spawn(async move { repo.delete_book(book.id).await })
    };
    tokio::time::sleep(StdDuration::from_millis(300)).await;
    tx.commit().await.unwrap();

    let result = deleting.await.unwrap();
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(repo.get_book(book.id).await.unwrap().status, BookStatus::Borrowed);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn delete_checks_existence_and_history(pool: PgPool) {
    let repo = Repository::new(pool);
    let unused = repo.create_book(&new_book("Never borrowed")).await.unwrap();

    repo.delete_book(unused.id).await.unwrap();
    assert!(matches!(repo.delete_book(unused.id).await, Err(AppError::NotFound(_))));

    let book = repo.create_book(&new_book("Dune")).await.unwrap();
    let user = repo.upsert_user(&principal("alice")).await.unwrap();
    let borrowing = repo.borrow_book(&new_borrowing(book.id, user.id, 7)).await.unwrap();
    repo.return_borrowing(borrowing.id, Utc::now()).await.unwrap();

    assert!(matches!(repo.delete_book(book.id).await, Err(AppError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn library_stats_are_counted_in_sql(pool: PgPool) {
    let repo = Repository::new(pool);
    let first = repo.create_book(&new_book("A")).await.unwrap();
    let second = repo.create_book(&new_book("B")).await.unwrap();
    let mut science = new_book("C");
    science.category = Some("Science".into());
    repo.create_book(&science).await.unwrap();
    let user = repo.upsert_user(&principal("alice")).await.unwrap();

    repo.borrow_book(&new_borrowing(first.id, user.id, -3)).await.unwrap();
    repo.borrow_book(&new_borrowing(second.id, user.id, 7)).await.unwrap();

    let stats = repo.library_stats(Utc::now().date_naive()).await.unwrap();
    assert_eq!(stats.total_books, 3);
    assert_eq!(stats.available_books, 1);
    assert_eq!(stats.borrowed_books, 2);
    assert_eq!(stats.categories, 2);
    assert_eq!(stats.active_borrowings, 2);
    assert_eq!(stats.overdue_borrowings, 1);
}
