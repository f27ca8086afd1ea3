use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const TYPE_PERCENTAGE: &str = "percentage";
pub const TYPE_FIXED: &str = "fixed";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub coupon_type: String, // 'percentage' or 'fixed'
    pub value: i64,
    pub minimum_amount: i64,
    pub maximum_discount: Option<i64>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Valid iff active, inside the validity window, and under the
    /// usage cap (no cap means unlimited).
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && now >= self.valid_from
            && now <= self.valid_until
            && self.usage_limit.is_none_or(|limit| self.used_count < limit)
    }

    /// Discount in cents for the given amount. Pure, no side effects.
    /// Returns 0 below the minimum amount; percentage discounts are
    /// clamped to `maximum_discount`, and the result never exceeds the
    /// amount itself.
    pub fn calculate_discount(&self, amount: i64) -> i64 {
        if amount < self.minimum_amount {
            return 0;
        }

        let mut discount = if self.coupon_type == TYPE_PERCENTAGE {
            let raw = amount * self.value / 100;
            match self.maximum_discount {
                Some(max) if raw > max => max,
                _ => raw,
            }
        } else {
            self.value
        };

        if discount > amount {
            discount = amount;
        }
        discount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(coupon_type: &str, value: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: 1,
            code: "SAVE10".into(),
            coupon_type: coupon_type.into(),
            value,
            minimum_amount: 0,
            maximum_discount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            is_active: true,
            description: String::new(),
            created_at: now,
        }
    }

    #[test]
    fn percentage_discount_clamped_to_maximum() {
        let mut c = coupon(TYPE_PERCENTAGE, 10);
        c.minimum_amount = 20_00;
        c.maximum_discount = Some(5_00);
        // 10% of 100.00 would be 10.00 but the cap is 5.00
        assert_eq!(c.calculate_discount(100_00), 5_00);
    }

    #[test]
    fn below_minimum_amount_yields_zero() {
        let mut c = coupon(TYPE_PERCENTAGE, 10);
        c.minimum_amount = 20_00;
        assert_eq!(c.calculate_discount(10_00), 0);
    }

    #[test]
    fn fixed_discount_never_exceeds_amount() {
        let c = coupon(TYPE_FIXED, 50_00);
        assert_eq!(c.calculate_discount(30_00), 30_00);
        assert_eq!(c.calculate_discount(80_00), 50_00);
    }

    #[test]
    fn calculate_discount_is_pure() {
        let c = coupon(TYPE_PERCENTAGE, 15);
        let first = c.calculate_discount(40_00);
        let second = c.calculate_discount(40_00);
        assert_eq!(first, second);
        assert_eq!(c.used_count, 0);
    }

    #[test]
    fn validity_window_and_usage_cap() {
        let now = Utc::now();
        let mut c = coupon(TYPE_FIXED, 100);
        assert!(c.is_valid(now));

        c.is_active = false;
        assert!(!c.is_valid(now));
        c.is_active = true;

        assert!(!c.is_valid(now + Duration::days(2)));
        assert!(!c.is_valid(now - Duration::days(2)));

        c.usage_limit = Some(3);
        c.used_count = 3;
        assert!(!c.is_valid(now));
        c.used_count = 2;
        assert!(c.is_valid(now));
    }
}
