use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::order::{Order, OrderItem, OrderWithItems};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    pub completed_payments: i64,
    pub total_revenue: i64,
}

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Order>> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch order by ID")
    }

    pub async fn get_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch order items")
    }

    pub async fn get_with_items(&self, id: i64) -> Result<Option<OrderWithItems>> {
        let Some(order) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let items = self.get_items(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch user orders")
    }

    pub async fn list_all(&self) -> Result<Vec<Order>> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch orders")
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete order")?;
        Ok(result.rows_affected() > 0)
    }

    /// Orders created since the given instant. Used for the per-day
    /// sequence in order numbers; the caller runs it inside the
    /// creation transaction.
    pub async fn count_created_since(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE created_at >= $1")
            .bind(since)
            .fetch_one(&mut **tx)
            .await
            .context("Failed to count today's orders")
    }

    pub async fn stats(&self) -> Result<OrderStats> {
        sqlx::query_as::<_, OrderStats>(
            r#"
            SELECT
                COUNT(*) AS total_orders,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
                COUNT(*) FILTER (WHERE status = 'delivered') AS delivered_orders,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_orders,
                COUNT(*) FILTER (WHERE payment_status = 'completed') AS completed_payments,
                COALESCE(SUM(total) FILTER (WHERE payment_status = 'completed'), 0) AS total_revenue
            FROM orders
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute order stats")
    }
}
