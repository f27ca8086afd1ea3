use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use fetan_db::StoreError;
use fetan_db::models::store::{PaymentMethod, Product, ProductSubscriptionDiscount, Subscription};
use fetan_db::repositories::payment_method_repo::PaymentMethodRepository;
use fetan_db::repositories::product_repo::ProductRepository;
use fetan_db::repositories::subscription_repo::SubscriptionRepository;

/// Products, subscription plans and payment methods. Customers see the
/// active subset; admins get full CRUD with explicit partial updates.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
    products: ProductRepository,
    subscriptions: SubscriptionRepository,
    payment_methods: PaymentMethodRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub original_price: Option<i64>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub stock: i32,
    pub image_url: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

/// Partial update; every field is optional and absent fields keep their
/// current value. Never a blind JSON merge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub original_price: Option<i64>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    pub featured: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub duration_days: i32,
    #[serde(default)]
    pub discount_percentage: i32,
    pub max_users: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentMethodInput {
    pub name: String,
    pub method_type: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub instructions: String,
    pub minimum_amount: Option<i64>,
    pub maximum_amount: Option<i64>,
}

const METHOD_TYPES: [&str; 4] = ["bank", "mobile_money", "crypto", "other"];

/// Plan as shown to customers, with the effective price after the
/// plan's own discount.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub discounted_price: i64,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            products: ProductRepository::new(pool.clone()),
            subscriptions: SubscriptionRepository::new(pool.clone()),
            payment_methods: PaymentMethodRepository::new(pool.clone()),
            pool,
        }
    }

    // --- Products ---

    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.list_active().await?)
    }

    pub async fn list_products_admin(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.list_all().await?)
    }

    /// Customer-facing read; bumps the view counter.
    pub async fn view_product(&self, id: i64) -> Result<Product, StoreError> {
        let product = self
            .products
            .get_by_id(id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(StoreError::NotFound("product"))?;
        self.products.increment_views(id).await?;
        Ok(product)
    }

    pub async fn create_product(&self, input: CreateProductInput) -> Result<Product, StoreError> {
        if input.name.trim().is_empty() {
            return Err(StoreError::validation("product name is required"));
        }
        if input.price < 0 {
            return Err(StoreError::validation("price cannot be negative"));
        }
        if input.stock < 0 {
            return Err(StoreError::validation("stock cannot be negative"));
        }
        let original_price = input.original_price.unwrap_or(input.price);
        Ok(self
            .products
            .create(
                input.name.trim(),
                &input.description,
                input.price,
                original_price,
                &input.category,
                input.stock,
                input.image_url.as_deref(),
            )
            .await?)
    }

    pub async fn update_product(
        &self,
        id: i64,
        input: UpdateProductInput,
    ) -> Result<Product, StoreError> {
        if input.price.is_some_and(|p| p < 0) {
            return Err(StoreError::validation("price cannot be negative"));
        }
        if input.stock.is_some_and(|s| s < 0) {
            return Err(StoreError::validation("stock cannot be negative"));
        }
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                price = COALESCE($3, price),
                original_price = COALESCE($4, original_price),
                category = COALESCE($5, category),
                stock = COALESCE($6, stock),
                is_active = COALESCE($7, is_active),
                featured = COALESCE($8, featured),
                image_url = COALESCE($9, image_url)
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(input.name.as_deref())
        .bind(input.description.as_deref())
        .bind(input.price)
        .bind(input.original_price)
        .bind(input.category.as_deref())
        .bind(input.stock)
        .bind(input.is_active)
        .bind(input.featured)
        .bind(input.image_url.as_deref())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("product"))
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), StoreError> {
        if !self.products.delete(id).await? {
            return Err(StoreError::NotFound("product"));
        }
        Ok(())
    }

    pub async fn rate_product(&self, id: i64, rating: i32) -> Result<(), StoreError> {
        if !(1..=5).contains(&rating) {
            return Err(StoreError::validation("rating must be between 1 and 5"));
        }
        self.products
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound("product"))?;
        self.products.add_rating(id, rating).await?;
        Ok(())
    }

    pub async fn product_discounts(
        &self,
        product_id: i64,
    ) -> Result<Vec<ProductSubscriptionDiscount>, StoreError> {
        Ok(self.products.get_subscription_discounts(product_id).await?)
    }

    pub async fn set_product_discount(
        &self,
        product_id: i64,
        subscription_id: i64,
        discount_percentage: i32,
    ) -> Result<(), StoreError> {
        if !(0..=100).contains(&discount_percentage) {
            return Err(StoreError::validation(
                "discount percentage must be between 0 and 100",
            ));
        }
        self.products
            .get_by_id(product_id)
            .await?
            .ok_or(StoreError::NotFound("product"))?;
        self.subscriptions
            .get_by_id(subscription_id)
            .await?
            .ok_or(StoreError::NotFound("subscription"))?;
        self.products
            .set_subscription_discount(product_id, subscription_id, discount_percentage)
            .await?;
        Ok(())
    }

    // --- Subscriptions ---

    pub async fn list_subscriptions(&self) -> Result<Vec<SubscriptionView>, StoreError> {
        Ok(self
            .subscriptions
            .list_active()
            .await?
            .into_iter()
            .map(|s| {
                let discounted_price = s.discounted_price();
                SubscriptionView {
                    subscription: s,
                    discounted_price,
                }
            })
            .collect())
    }

    pub async fn list_subscriptions_admin(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self.subscriptions.list_all().await?)
    }

    pub async fn create_subscription(
        &self,
        input: CreateSubscriptionInput,
    ) -> Result<Subscription, StoreError> {
        if input.name.trim().is_empty() {
            return Err(StoreError::validation("subscription name is required"));
        }
        if input.price < 0 {
            return Err(StoreError::validation("price cannot be negative"));
        }
        if input.duration_days <= 0 {
            return Err(StoreError::validation("duration must be positive"));
        }
        if !(0..=100).contains(&input.discount_percentage) {
            return Err(StoreError::validation(
                "discount percentage must be between 0 and 100",
            ));
        }
        Ok(self
            .subscriptions
            .create(
                input.name.trim(),
                &input.description,
                input.price,
                input.duration_days,
                input.discount_percentage,
                input.max_users,
            )
            .await?)
    }

    pub async fn set_subscription_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        if !self.subscriptions.set_active(id, active).await? {
            return Err(StoreError::NotFound("subscription"));
        }
        Ok(())
    }

    pub async fn delete_subscription(&self, id: i64) -> Result<(), StoreError> {
        if !self.subscriptions.delete(id).await? {
            return Err(StoreError::NotFound("subscription"));
        }
        Ok(())
    }

    // --- Payment methods ---

    pub async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, StoreError> {
        Ok(self.payment_methods.list_active().await?)
    }

    pub async fn list_payment_methods_admin(&self) -> Result<Vec<PaymentMethod>, StoreError> {
        Ok(self.payment_methods.list_all().await?)
    }

    pub async fn create_payment_method(
        &self,
        input: CreatePaymentMethodInput,
    ) -> Result<PaymentMethod, StoreError> {
        if input.name.trim().is_empty() {
            return Err(StoreError::validation("payment method name is required"));
        }
        if !METHOD_TYPES.contains(&input.method_type.as_str()) {
            return Err(StoreError::validation(format!(
                "unknown payment method type '{}'",
                input.method_type
            )));
        }
        if let (Some(min), Some(max)) = (input.minimum_amount, input.maximum_amount) {
            if min > max {
                return Err(StoreError::validation(
                    "minimum amount cannot exceed maximum amount",
                ));
            }
        }
        Ok(self
            .payment_methods
            .create(
                input.name.trim(),
                &input.method_type,
                &input.account_name,
                &input.account_number,
                &input.instructions,
                input.minimum_amount,
                input.maximum_amount,
            )
            .await?)
    }

    pub async fn set_payment_method_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        if !self.payment_methods.set_active(id, active).await? {
            return Err(StoreError::NotFound("payment method"));
        }
        Ok(())
    }

    pub async fn delete_payment_method(&self, id: i64) -> Result<(), StoreError> {
        if !self.payment_methods.delete(id).await? {
            return Err(StoreError::NotFound("payment method"));
        }
        Ok(())
    }
}
