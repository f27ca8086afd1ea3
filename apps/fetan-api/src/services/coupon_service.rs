use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use fetan_db::StoreError;
use fetan_db::models::coupon::{self, Coupon};
use fetan_db::repositories::coupon_repo::CouponRepository;

/// Coupon administration and pre-checkout validation. The discount
/// math itself lives on the `Coupon` model; redemption counting
/// happens in the order lifecycle, not here.
#[derive(Clone)]
pub struct CouponService {
    coupons: CouponRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCouponInput {
    pub code: String,
    pub coupon_type: String,
    pub value: i64,
    #[serde(default)]
    pub minimum_amount: i64,
    pub maximum_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

/// What the storefront shows before checkout: the coupon and the
/// discount it would produce on the current cart subtotal.
#[derive(Debug, Serialize)]
pub struct CouponQuote {
    pub coupon: Coupon,
    pub discount: i64,
}

impl CouponService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            coupons: CouponRepository::new(pool),
        }
    }

    /// Validates a code against the current time and a cart subtotal.
    /// Read-only; nothing is consumed until the order's payment
    /// completes.
    pub async fn quote(&self, code: &str, subtotal: i64) -> Result<CouponQuote, StoreError> {
        let coupon = self
            .coupons
            .get_by_code(code)
            .await?
            .ok_or(StoreError::NotFound("coupon"))?;
        if !coupon.is_valid(Utc::now()) {
            return Err(StoreError::validation("coupon is not valid"));
        }
        let discount = coupon.calculate_discount(subtotal);
        if discount == 0 && subtotal < coupon.minimum_amount {
            return Err(StoreError::validation(format!(
                "order must be at least {} cents to use this coupon",
                coupon.minimum_amount
            )));
        }
        Ok(CouponQuote { coupon, discount })
    }

    pub async fn list(&self) -> Result<Vec<Coupon>, StoreError> {
        Ok(self.coupons.list_all().await?)
    }

    pub async fn create(&self, input: CreateCouponInput) -> Result<Coupon, StoreError> {
        let code = input.code.trim();
        if code.is_empty() {
            return Err(StoreError::validation("coupon code is required"));
        }
        match input.coupon_type.as_str() {
            coupon::TYPE_PERCENTAGE => {
                if !(1..=100).contains(&input.value) {
                    return Err(StoreError::validation(
                        "percentage value must be between 1 and 100",
                    ));
                }
            }
            coupon::TYPE_FIXED => {
                if input.value <= 0 {
                    return Err(StoreError::validation("fixed discount must be positive"));
                }
            }
            other => {
                return Err(StoreError::validation(format!(
                    "unknown coupon type '{other}'"
                )));
            }
        }
        if input.valid_until <= input.valid_from {
            return Err(StoreError::validation(
                "valid_until must be after valid_from",
            ));
        }
        if input.usage_limit.is_some_and(|limit| limit <= 0) {
            return Err(StoreError::validation("usage limit must be positive"));
        }

        let created = self
            .coupons
            .create(
                code,
                &input.coupon_type,
                input.value,
                input.minimum_amount,
                input.maximum_discount,
                input.usage_limit,
                input.valid_from,
                input.valid_until,
                &input.description,
            )
            .await;

        match created {
            Ok(c) => Ok(c),
            Err(e) => {
                // Surface the UNIQUE violation as a client error.
                if let Some(db) = e
                    .downcast_ref::<sqlx::Error>()
                    .and_then(|e| e.as_database_error())
                {
                    if db.constraint() == Some("coupons_code_key") {
                        return Err(StoreError::validation(format!(
                            "coupon code '{}' already exists",
                            code.to_uppercase()
                        )));
                    }
                }
                Err(StoreError::Internal(e))
            }
        }
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        if !self.coupons.set_active(id, active).await? {
            return Err(StoreError::NotFound("coupon"));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if !self.coupons.delete(id).await? {
            return Err(StoreError::NotFound("coupon"));
        }
        Ok(())
    }
}
