use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::coupon::Coupon;

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: PgPool,
}

impl CouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Codes are stored upper-cased; lookups normalize the same way.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
            .bind(code.trim().to_uppercase())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch coupon by code")
    }

    pub async fn list_all(&self) -> Result<Vec<Coupon>> {
        sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch coupons")
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        code: &str,
        coupon_type: &str,
        value: i64,
        minimum_amount: i64,
        maximum_discount: Option<i64>,
        usage_limit: Option<i32>,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
        description: &str,
    ) -> Result<Coupon> {
        sqlx::query_as::<_, Coupon>(
            r#"
            INSERT INTO coupons (code, coupon_type, value, minimum_amount, maximum_discount,
                                 usage_limit, valid_from, valid_until, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(code.trim().to_uppercase())
        .bind(coupon_type)
        .bind(value)
        .bind(minimum_amount)
        .bind(maximum_discount)
        .bind(usage_limit)
        .bind(valid_from)
        .bind(valid_until)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create coupon")
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE coupons SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
