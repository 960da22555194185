//! Libris library server
//!
//! A REST JSON API over a book catalog: search, borrow and return books,
//! with per-user loan history and librarian dashboards.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}

impl AppState {
    /// Build the state and its services over a store
    pub fn new(config: AppConfig, store: Arc<dyn repository::CatalogStore>) -> Self {
        let services = services::Services::new(store, config.loans.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
        }
    }
}
