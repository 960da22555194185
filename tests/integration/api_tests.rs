//! API integration tests
//!
//! The router runs in-process over the memory store; session tokens are
//! signed with the configured test secret.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_server::{
    api,
    config::AppConfig,
    models::{book::CreateBook, user::{SessionClaims, UserRole}},
    repository::{CatalogStore, MemoryStore},
    AppState,
};

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    secret: String,
}

impl TestApp {
    async fn new() -> Self {
        let config = AppConfig::default();
        let secret = config.auth.jwt_secret.clone();
        let store = Arc::new(MemoryStore::new());

        for (title, author, category) in [
            ("The Great Gatsby", "F. Scott Fitzgerald", "Fiction"),
            ("A Brief History of Time", "Stephen Hawking", "Science"),
            ("Gatsby Revisited", "Jane Critic", "Essays"),
        ] {
            store
                .create_book(&CreateBook {
                    title: title.into(),
                    author: author.into(),
                    category: Some(category.into()),
                    description: None,
                    cover: None,
                    isbn: None,
                    published_year: None,
                })
                .await
                .unwrap();
        }

        let state = AppState::new(config, store.clone());
        Self {
            router: api::create_router(state),
            store,
            secret,
        }
    }

    fn token(&self, sub: &str, role: UserRole) -> String {
        let now = Utc::now();
        SessionClaims {
            sub: sub.into(),
            name: sub.into(),
            email: format!("{}@example.com", sub),
            image_url: None,
            role,
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        }
        .create_token(&self.secret)
        .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_search_is_public_and_case_insensitive() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/api/v1/books?q=gatsby&category=Fiction", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let books = body.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "The Great Gatsby");
    assert_eq!(books[0]["status"], "Available");

    let (status, body) = app.send(Method::GET, "/api/v1/books/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["Essays", "Fiction", "Science"]));
}

#[tokio::test]
async fn test_borrow_and_return_flow() {
    let app = TestApp::new().await;
    let alice = app.token("alice", UserRole::Student);
    let bob = app.token("bob", UserRole::Student);
    let due = (Utc::now().date_naive() + Duration::days(7)).to_string();

    // Alice borrows the book
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/borrowings",
            Some(&alice),
            Some(json!({ "book_id": 1, "due_date": due })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["borrowing"]["status"], "Borrowed");
    assert!(body["borrowing"]["return_date"].is_null());
    let borrowing_id = body["borrowing"]["id"].as_i64().unwrap();

    let (_, book) = app.send(Method::GET, "/api/v1/books/1", None, None).await;
    assert_eq!(book["status"], "Borrowed");

    // Bob is turned away
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/borrowings",
            Some(&bob),
            Some(json!({ "book_id": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "StateConflict");

    // Bob cannot return Alice's book
    let uri = format!("/api/v1/borrowings/{}/return", borrowing_id);
    let (status, _) = app.send(Method::POST, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Alice returns it
    let (status, body) = app.send(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Returned");
    assert!(body["return_date"].is_string());

    let (_, book) = app.send(Method::GET, "/api/v1/books/1", None, None).await;
    assert_eq!(book["status"], "Available");

    // A second return is a conflict
    let (status, _) = app.send(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_borrow_requires_authentication() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::POST, "/api/v1/borrowings", None, Some(json!({ "book_id": 1 })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthenticated");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/borrowings",
            Some("not-a-token"),
            Some(json!({ "book_id": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.store.get_book(1).await.unwrap().status.as_str(), "Available");
}

#[tokio::test]
async fn test_borrow_validation_errors() {
    let app = TestApp::new().await;
    let alice = app.token("alice", UserRole::Student);
    let past = (Utc::now().date_naive() - Duration::days(2)).to_string();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/borrowings",
            Some(&alice),
            Some(json!({ "book_id": 1, "due_date": past })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/borrowings",
            Some(&alice),
            Some(json!({ "book_id": 999 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_my_loans_and_stats() {
    let app = TestApp::new().await;
    let alice = app.token("alice", UserRole::Student);

    for book_id in [1, 2] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/v1/borrowings",
                Some(&alice),
                Some(json!({ "book_id": book_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, loans) = app.send(Method::GET, "/api/v1/me/loans", Some(&alice), None).await;
    let loans = loans.as_array().unwrap();
    assert_eq!(loans.len(), 2);
    assert_eq!(loans[0]["is_overdue"], false);

    let first_id = loans[1]["borrowing_id"].as_i64().unwrap();
    let uri = format!("/api/v1/borrowings/{}/return", first_id);
    let (status, _) = app.send(Method::POST, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, active) = app
        .send(Method::GET, "/api/v1/me/loans?active_only=true", Some(&alice), None)
        .await;
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, stats) = app.send(Method::GET, "/api/v1/me/stats", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_loans"], 2);
    assert_eq!(stats["borrowed"], 1);
    assert_eq!(stats["returned"], 1);

    let (status, _) = app.send(Method::GET, "/api/v1/me/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_management_is_librarian_only() {
    let app = TestApp::new().await;
    let student = app.token("student", UserRole::Student);
    let librarian = app.token("librarian", UserRole::Librarian);
    let book = json!({ "title": "Dune", "author": "Frank Herbert", "category": "Fiction" });

    let (status, body) = app
        .send(Method::POST, "/api/v1/books", Some(&student), Some(book.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NotAuthorized");

    let (status, created) = app
        .send(Method::POST, "/api/v1/books", Some(&librarian), Some(book))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "Available");
    let id = created["id"].as_i64().unwrap();

    let uri = format!("/api/v1/books/{}", id);
    let (status, updated) = app
        .send(
            Method::PUT,
            &uri,
            Some(&librarian),
            Some(json!({ "description": "Desert planet" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Desert planet");

    let (status, _) = app.send(Method::DELETE, &uri, Some(&librarian), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ensure_user_is_idempotent() {
    let app = TestApp::new().await;
    let token = app.token("user_2abc", UserRole::Student);

    let (status, first) = app.send(Method::POST, "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app.send(Method::POST, "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["external_id"], "user_2abc");

    let librarian = app.token("librarian", UserRole::Librarian);
    let (status, users) = app.send(Method::GET, "/api/v1/users", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::OK);
    let matching = users
        .as_array()
        .unwrap()
        .iter()
        .filter(|u| u["external_id"] == "user_2abc")
        .count();
    assert_eq!(matching, 1);

    let (status, _) = app.send(Method::GET, "/api/v1/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_library_stats_for_librarians() {
    let app = TestApp::new().await;
    let alice = app.token("alice", UserRole::Student);
    let librarian = app.token("librarian", UserRole::Librarian);

    app.send(
        Method::POST,
        "/api/v1/borrowings",
        Some(&alice),
        Some(json!({ "book_id": 2 })),
    )
    .await;

    let (status, stats) = app.send(Method::GET, "/api/v1/stats", Some(&librarian), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_books"], 3);
    assert_eq!(stats["borrowed_books"], 1);
    assert_eq!(stats["active_borrowings"], 1);
    assert_eq!(stats["overdue_borrowings"], 0);

    let (status, _) = app.send(Method::GET, "/api/v1/stats", Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new().await;
    let (status, doc) = app.send(Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/borrowings"].is_object());
}

#[tokio::test]
async fn test_status_filter_accepts_any_case() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::GET, "/api/v1/books?status=available", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = app
        .send(Method::GET, "/api/v1/books?status=BORROWED", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_input_uses_error_body() {
    let app = TestApp::new().await;
    let alice = app.token("alice", UserRole::Student);

    let (status, body) = app
        .send(Method::GET, "/api/v1/books?status=lost", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, body) = app.send(Method::GET, "/api/v1/books/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/borrowings",
            Some(&alice),
            Some(json!({ "book_id": "one" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert!(body["message"].is_string());
}
