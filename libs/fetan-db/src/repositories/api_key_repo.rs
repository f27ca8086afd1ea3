use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::api_key::ApiKey;

#[derive(Clone, Debug)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, key: &str) -> Result<ApiKey> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (name, key)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create API key")
    }

    /// Looks up an active key and stamps its last use.
    pub async fn validate(&self, key: &str) -> Result<Option<ApiKey>> {
        sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys SET last_used_at = CURRENT_TIMESTAMP
            WHERE key = $1 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to validate API key")
    }

    pub async fn get_all(&self) -> Result<Vec<ApiKey>> {
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch API keys")
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete API key")?;
        Ok(())
    }
}
