use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::user::{CartLine, PaymentScreenshot, User};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by ID")
    }

    pub async fn get_by_tg_id(&self, tg_id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE tg_id = $1")
            .bind(tg_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by Telegram ID")
    }

    pub async fn get_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by referral code")
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch users")
    }

    pub async fn upsert(
        &self,
        tg_id: i64,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (tg_id, username, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (tg_id) DO UPDATE
            SET username = COALESCE(EXCLUDED.username, users.username),
                full_name = COALESCE(EXCLUDED.full_name, users.full_name)
            RETURNING *
            "#,
        )
        .bind(tg_id)
        .bind(username)
        .bind(full_name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to upsert user")
    }

    pub async fn mark_registered(&self, id: i64, phone: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE users SET is_registered = TRUE, phone = COALESCE($1, phone) WHERE id = $2")
            .bind(phone)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_referral_code(&self, id: i64, code: &str) -> Result<()> {
        sqlx::query("UPDATE users SET referral_code = $1 WHERE id = $2")
            .bind(code)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Cart ---

    /// Adds to the cart, bumping the quantity when the product is
    /// already there.
    pub async fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .context("Failed to add cart item")?;
        Ok(())
    }

    pub async fn set_cart_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<()> {
        if quantity <= 0 {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query(
                "UPDATE cart_items SET quantity = $1 WHERE user_id = $2 AND product_id = $3",
            )
            .bind(quantity)
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn get_cart(&self, user_id: i64) -> Result<Vec<CartLine>> {
        sqlx::query_as::<_, CartLine>(
            r#"
            SELECT c.product_id, p.name AS product_name, c.quantity, p.price AS unit_price, p.stock
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.added_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch cart")
    }

    pub async fn clear_cart(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Payment screenshots ---

    pub async fn add_screenshot(
        &self,
        user_id: i64,
        subscription_id: Option<i64>,
        url: &str,
    ) -> Result<PaymentScreenshot> {
        sqlx::query_as::<_, PaymentScreenshot>(
            r#"
            INSERT INTO payment_screenshots (user_id, subscription_id, url)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(subscription_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .context("Failed to record payment screenshot")
    }

    pub async fn get_screenshots(&self, user_id: i64) -> Result<Vec<PaymentScreenshot>> {
        sqlx::query_as::<_, PaymentScreenshot>(
            "SELECT * FROM payment_screenshots WHERE user_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch payment screenshots")
    }
}
