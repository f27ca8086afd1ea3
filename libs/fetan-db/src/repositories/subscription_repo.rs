use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::store::Subscription;

#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch subscription by ID")
    }

    pub async fn list_active(&self) -> Result<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE is_active = TRUE ORDER BY price ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active subscriptions")
    }

    pub async fn list_all(&self) -> Result<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions ORDER BY price ASC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch subscriptions")
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        price: i64,
        duration_days: i32,
        discount_percentage: i32,
        max_users: Option<i32>,
    ) -> Result<Subscription> {
        sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (name, description, price, duration_days, discount_percentage, max_users)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(duration_days)
        .bind(discount_percentage)
        .bind(max_users)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create subscription")
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE subscriptions SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
