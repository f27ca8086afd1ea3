use chrono::Utc;
use sqlx::PgPool;

use fetan_db::StoreError;
use fetan_db::models::store::Subscription;
use fetan_db::models::user::{PaymentScreenshot, screenshot_status, subscription_status};

/// Review of customer-submitted payment screenshots, addressed by
/// screenshot id so each upload is independently reviewable. Approval
/// of a subscription-linked screenshot activates the plan in the same
/// transaction; reviewing an already-reviewed screenshot changes
/// nothing and returns the stored state.
#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_pending(&self) -> Result<Vec<PaymentScreenshot>, StoreError> {
        Ok(sqlx::query_as::<_, PaymentScreenshot>(
            "SELECT * FROM payment_screenshots WHERE status = 'pending' ORDER BY uploaded_at",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Approves one of the user's screenshots. When it is linked to a
    /// subscription purchase the plan is activated atomically:
    /// capacity-guarded seat increment, user status flip, expiry set
    /// from the plan duration.
    pub async fn approve(
        &self,
        user_id: i64,
        screenshot_id: i64,
    ) -> Result<PaymentScreenshot, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(shot) = self.lock_screenshot(&mut tx, user_id, screenshot_id).await? else {
            return Err(StoreError::NotFound("payment screenshot"));
        };
        if shot.status != screenshot_status::PENDING {
            return Ok(shot);
        }

        if let Some(subscription_id) = shot.subscription_id {
            let sub = sqlx::query_as::<_, Subscription>(
                "SELECT * FROM subscriptions WHERE id = $1 FOR UPDATE",
            )
            .bind(subscription_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound("subscription"))?;

            if !sub.has_capacity() {
                return Err(StoreError::validation(format!(
                    "subscription '{}' is full",
                    sub.name
                )));
            }

            // Conditional increment backstops the capacity check under
            // concurrent approvals.
            let result = sqlx::query(
                r#"
                UPDATE subscriptions SET current_users = current_users + 1
                WHERE id = $1 AND (max_users IS NULL OR current_users < max_users)
                "#,
            )
            .bind(subscription_id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::validation(format!(
                    "subscription '{}' is full",
                    sub.name
                )));
            }

            let expiry = Utc::now() + chrono::Duration::days(sub.duration_days as i64);
            sqlx::query(
                r#"
                UPDATE users
                SET subscription_id = $1, subscription_status = $2, subscription_expiry = $3
                WHERE id = $4
                "#,
            )
            .bind(subscription_id)
            .bind(subscription_status::ACTIVE)
            .bind(expiry)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query_as::<_, PaymentScreenshot>(
            r#"
            UPDATE payment_screenshots
            SET status = $1, reviewed_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(screenshot_status::APPROVED)
        .bind(shot.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "payment screenshot {} approved for user {}{}",
            updated.id,
            user_id,
            match updated.subscription_id {
                Some(id) => format!(" (subscription {id} activated)"),
                None => String::new(),
            }
        );

        Ok(updated)
    }

    /// Rejects one of the user's pending screenshots, persisting the
    /// reason when one is given.
    pub async fn reject(
        &self,
        user_id: i64,
        screenshot_id: i64,
        reason: Option<&str>,
    ) -> Result<PaymentScreenshot, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(shot) = self.lock_screenshot(&mut tx, user_id, screenshot_id).await? else {
            return Err(StoreError::NotFound("payment screenshot"));
        };
        if shot.status != screenshot_status::PENDING {
            return Ok(shot);
        }

        let updated = sqlx::query_as::<_, PaymentScreenshot>(
            r#"
            UPDATE payment_screenshots
            SET status = $1, reject_reason = $2, reviewed_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(screenshot_status::REJECTED)
        .bind(reason.map(str::trim).filter(|r| !r.is_empty()))
        .bind(shot.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "payment screenshot {} rejected for user {}",
            updated.id,
            user_id
        );

        Ok(updated)
    }

    async fn lock_screenshot(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: i64,
        screenshot_id: i64,
    ) -> Result<Option<PaymentScreenshot>, StoreError> {
        Ok(sqlx::query_as::<_, PaymentScreenshot>(
            r#"
            SELECT * FROM payment_screenshots
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(screenshot_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?)
    }
}
