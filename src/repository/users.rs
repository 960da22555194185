//! Users repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::user::{ExternalPrincipal, User, UserSummary},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, external_id, name, email, image_url FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by identity-provider subject id
    pub async fn get_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, external_id, name, email, image_url FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Insert the user unless one with the same external id exists, then
    /// return the stored row. Concurrent callers all end up with the same row.
    pub async fn upsert(&self, principal: &ExternalPrincipal) -> AppResult<User> {
        let inserted = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, name, email, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING id, external_id, name, email, image_url
            "#,
        )
        .bind(&principal.external_id)
        .bind(&principal.name)
        .bind(&principal.email)
        .bind(&principal.image_url)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(user) = inserted {
            return Ok(user);
        }

        self.get_by_external_id(&principal.external_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "User {} vanished after upsert",
                    principal.external_id
                ))
            })
    }

    /// All users with their open and overdue borrowing counts
    pub async fn list_with_counts(&self, today: NaiveDate) -> AppResult<Vec<UserSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT u.id, u.external_id, u.name, u.email, u.image_url,
                   COUNT(br.id) FILTER (WHERE br.return_date IS NULL) AS active_borrowings,
                   COUNT(br.id) FILTER (WHERE br.return_date IS NULL AND br.due_date < $1)
                       AS overdue_borrowings
            FROM users u
            LEFT JOIN borrowings br ON br.user_id = u.id
            GROUP BY u.id
            ORDER BY u.name, u.id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(UserSummary {
                user: User {
                    id: row.try_get("id")?,
                    external_id: row.try_get("external_id")?,
                    name: row.try_get("name")?,
                    email: row.try_get("email")?,
                    image_url: row.try_get("image_url")?,
                },
                active_borrowings: row.try_get("active_borrowings")?,
                overdue_borrowings: row.try_get("overdue_borrowings")?,
            });
        }

        Ok(result)
    }
}
