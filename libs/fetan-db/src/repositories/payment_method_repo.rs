use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::store::PaymentMethod;

#[derive(Debug, Clone)]
pub struct PaymentMethodRepository {
    pool: PgPool,
}

impl PaymentMethodRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<PaymentMethod>> {
        sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch payment method by ID")
    }

    pub async fn list_active(&self) -> Result<Vec<PaymentMethod>> {
        sqlx::query_as::<_, PaymentMethod>(
            "SELECT * FROM payment_methods WHERE is_active = TRUE ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active payment methods")
    }

    pub async fn list_all(&self) -> Result<Vec<PaymentMethod>> {
        sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch payment methods")
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        name: &str,
        method_type: &str,
        account_name: &str,
        account_number: &str,
        instructions: &str,
        minimum_amount: Option<i64>,
        maximum_amount: Option<i64>,
    ) -> Result<PaymentMethod> {
        sqlx::query_as::<_, PaymentMethod>(
            r#"
            INSERT INTO payment_methods (name, method_type, account_name, account_number,
                                         instructions, minimum_amount, maximum_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(method_type)
        .bind(account_name)
        .bind(account_number)
        .bind(instructions)
        .bind(minimum_amount)
        .bind(maximum_amount)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create payment method")
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE payment_methods SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM payment_methods WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
