use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Prices are integer cents throughout.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub original_price: i64,
    pub category: String,
    pub stock: i32,
    pub is_active: bool,
    pub featured: bool,
    pub views: i64,
    pub sales: i64,
    pub rating_average: f64,
    pub rating_count: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductSubscriptionDiscount {
    pub id: i64,
    pub product_id: i64,
    pub subscription_id: i64,
    pub discount_percentage: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_days: i32,
    pub discount_percentage: i32,
    pub max_users: Option<i32>,
    pub current_users: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn discounted_price(&self) -> i64 {
        if self.discount_percentage > 0 {
            self.price - self.price * self.discount_percentage as i64 / 100
        } else {
            self.price
        }
    }

    pub fn has_capacity(&self) -> bool {
        match self.max_users {
            Some(max) => self.current_users < max,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    pub method_type: String, // 'bank', 'mobile_money', 'crypto', 'other'
    pub account_name: String,
    pub account_number: String,
    pub instructions: String,
    pub minimum_amount: Option<i64>,
    pub maximum_amount: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Whether an order total falls inside the configured bounds.
    pub fn accepts_amount(&self, amount: i64) -> bool {
        if let Some(min) = self.minimum_amount {
            if amount < min {
                return false;
            }
        }
        if let Some(max) = self.maximum_amount {
            if amount > max {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn plan_price_reflects_its_own_discount() {
        let mut s = Subscription {
            id: 1,
            name: "Gold".into(),
            description: String::new(),
            price: 100_00,
            duration_days: 30,
            discount_percentage: 0,
            max_users: Some(2),
            current_users: 0,
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(s.discounted_price(), 100_00);
        s.discount_percentage = 25;
        assert_eq!(s.discounted_price(), 75_00);

        assert!(s.has_capacity());
        s.current_users = 2;
        assert!(!s.has_capacity());
        s.max_users = None;
        assert!(s.has_capacity());
    }

    #[test]
    fn payment_method_bounds() {
        let pm = PaymentMethod {
            id: 1,
            name: "CBE".into(),
            method_type: "bank".into(),
            account_name: String::new(),
            account_number: String::new(),
            instructions: String::new(),
            minimum_amount: Some(5_00),
            maximum_amount: Some(500_00),
            is_active: true,
            created_at: Utc::now(),
        };
        assert!(!pm.accepts_amount(4_99));
        assert!(pm.accepts_amount(5_00));
        assert!(pm.accepts_amount(500_00));
        assert!(!pm.accepts_amount(500_01));
    }
}
