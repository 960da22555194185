//! Business logic services

pub mod borrowings;
pub mod catalog;
pub mod identity;
pub mod stats;

use std::sync::Arc;

use crate::{config::LoansConfig, repository::CatalogStore};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub identity: identity::IdentityService,
    pub catalog: catalog::CatalogService,
    pub borrowings: borrowings::BorrowingsService,
    pub stats: stats::StatsService,
    store: Arc<dyn CatalogStore>,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Arc<dyn CatalogStore>, loans_config: LoansConfig) -> Self {
        Self {
            identity: identity::IdentityService::new(store.clone()),
            catalog: catalog::CatalogService::new(store.clone()),
            borrowings: borrowings::BorrowingsService::new(store.clone(), loans_config),
            stats: stats::StatsService::new(store.clone()),
            store,
        }
    }

    /// Readiness check against the backing store
    pub async fn ping_store(&self) -> crate::error::AppResult<()> {
        self.store.ping().await
    }
}
