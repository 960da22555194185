//! User model, identity-provider principals and session claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::{config::AuthConfig, error::AppError};

/// Internal user record bound to an external identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    /// Subject id assigned by the identity provider
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
}

/// Identity asserted by the identity provider for the current request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ExternalPrincipal {
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub image_url: Option<String>,
}

/// Role chosen at onboarding and carried in the provider's metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Librarian,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Librarian => "librarian",
            UserRole::Admin => "admin",
        }
    }

    /// Librarians and admins manage the catalog and everyone's loans
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Librarian | UserRole::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            // Older onboarding flows stored "teacher" for library staff
            "librarian" | "teacher" => Ok(UserRole::Librarian),
            "admin" => Ok(UserRole::Admin),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

/// The internal user behind a request, with the role from its session
#[derive(Debug, Clone, PartialEq)]
pub struct ActingUser {
    pub user: User,
    pub role: UserRole,
}

impl ActingUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Librarian privileges required".to_string()))
        }
    }
}

/// Resolve the acting user or fail as unauthenticated
pub fn require_acting(acting: Option<&ActingUser>) -> Result<&ActingUser, AppError> {
    acting.ok_or_else(|| AppError::Unauthenticated("No authenticated user".to_string()))
}

/// Resolve the acting user and require the librarian role
pub fn require_staff(acting: Option<&ActingUser>) -> Result<&ActingUser, AppError> {
    let acting = require_acting(acting)?;
    acting.require_staff()?;
    Ok(acting)
}

/// User with loan counters, for the librarian dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub active_borrowings: i64,
    pub overdue_borrowings: i64,
}

fn deserialize_role<'de, D>(deserializer: D) -> Result<UserRole, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()).unwrap_or_default())
}

/// Session token claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_role")]
    pub role: UserRole,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl SessionClaims {
    /// Sign the claims (used by tests and local tooling)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Verify and parse a session token
    pub fn from_token(token: &str, auth: &AuthConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let mut validation = Validation::default();
        if let Some(ref issuer) = auth.issuer {
            validation.set_issuer(&[issuer]);
        }
        match auth.audience {
            Some(ref audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            &validation,
        )?;
        Ok(token_data.claims)
    }

    pub fn principal(&self) -> ExternalPrincipal {
        ExternalPrincipal {
            external_id: self.sub.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            image_url: self.image_url.clone(),
        }
    }
}
