use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::store::{Product, ProductSubscriptionDiscount};

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product by ID")
    }

    pub async fn list_active(&self) -> Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE is_active = TRUE ORDER BY featured DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch active products")
    }

    pub async fn list_all(&self) -> Result<Vec<Product>> {
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch products")
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        price: i64,
        original_price: i64,
        category: &str,
        stock: i32,
        image_url: Option<&str>,
    ) -> Result<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price, original_price, category, stock, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(original_price)
        .bind(category)
        .bind(stock)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create product")
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_views(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE products SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Folds a new rating into the running average.
    pub async fn add_rating(&self, id: i64, rating: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET rating_average = (rating_average * rating_count + $1) / (rating_count + 1),
                rating_count = rating_count + 1
            WHERE id = $2
            "#,
        )
        .bind(rating as f64)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update product rating")?;
        Ok(())
    }

    pub async fn get_subscription_discounts(
        &self,
        product_id: i64,
    ) -> Result<Vec<ProductSubscriptionDiscount>> {
        sqlx::query_as::<_, ProductSubscriptionDiscount>(
            "SELECT * FROM product_subscription_discounts WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch product subscription discounts")
    }

    pub async fn set_subscription_discount(
        &self,
        product_id: i64,
        subscription_id: i64,
        discount_percentage: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_subscription_discounts (product_id, subscription_id, discount_percentage)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, subscription_id)
            DO UPDATE SET discount_percentage = EXCLUDED.discount_percentage
            "#,
        )
        .bind(product_id)
        .bind(subscription_id)
        .bind(discount_percentage)
        .execute(&self.pool)
        .await
        .context("Failed to set subscription discount")?;
        Ok(())
    }
}
