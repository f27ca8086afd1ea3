use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod subscription_status {
    pub const ACTIVE: &str = "active";
    pub const PENDING: &str = "pending";
    pub const EXPIRED: &str = "expired";
}

pub mod screenshot_status {
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub tg_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_registered: bool,
    pub referral_code: Option<String>,
    pub referred_by_user_id: Option<i64>,
    pub referred_by_agent_id: Option<i64>,
    pub subscription_id: Option<i64>,
    pub subscription_status: String,
    pub subscription_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// An active subscription that has not yet expired.
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription_id.is_some()
            && self.subscription_status == subscription_status::ACTIVE
            && self.subscription_expiry.is_some_and(|expiry| expiry > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// Cart line joined with its product, as shown to the customer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub stock: i32,
}

/// A customer-submitted payment proof. `subscription_id` is set for
/// bot-flow subscription purchases so approval can activate the plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentScreenshot {
    pub id: i64,
    pub user_id: i64,
    pub subscription_id: Option<i64>,
    pub url: String,
    pub status: String,
    pub reject_reason: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}
