use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::DirectoryUser;
use crate::utils::error::AppError;

/// Lookup into the user accounts owned by the auth side of the system. The
/// reservation core only needs to match a webhook payload's email back to an
/// account, best effort.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, AppError>;
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, AppError> {
        let user = sqlx::query_as::<_, DirectoryUser>(
            "SELECT id, email, first_name, last_name, active, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
