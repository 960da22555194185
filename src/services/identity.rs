//! Identity binding: external principals to internal users

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::user::{ActingUser, ExternalPrincipal, SessionClaims, User},
    repository::CatalogStore,
};

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn CatalogStore>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Return the user bound to this principal, creating it on first contact.
    /// Safe to call concurrently for the same principal.
    pub async fn ensure_user(&self, principal: &ExternalPrincipal) -> AppResult<User> {
        if principal.external_id.trim().is_empty() {
            return Err(AppError::Validation("External id is required".to_string()));
        }

        if let Some(user) = self
            .store
            .find_user_by_external_id(&principal.external_id)
            .await?
        {
            return Ok(user);
        }

        let user = self.store.upsert_user(principal).await?;
        tracing::info!(
            user_id = user.id,
            external_id = %user.external_id,
            "Bound identity to user"
        );
        Ok(user)
    }

    /// Resolve the acting user of a request from its verified session, if any
    pub async fn resolve(&self, claims: Option<&SessionClaims>) -> AppResult<Option<ActingUser>> {
        let Some(claims) = claims else {
            return Ok(None);
        };

        let user = self.ensure_user(&claims.principal()).await?;
        Ok(Some(ActingUser {
            user,
            role: claims.role,
        }))
    }
}
