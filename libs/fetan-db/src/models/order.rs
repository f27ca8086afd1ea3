use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Fulfilment statuses. Stored as lowercase strings; the CHECK
/// constraint on `orders.status` mirrors this list.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const CONFIRMED: &str = "confirmed";
    pub const PROCESSING: &str = "processing";
    pub const SHIPPED: &str = "shipped";
    pub const DELIVERED: &str = "delivered";
    pub const CANCELLED: &str = "cancelled";

    pub const ALL: [&str; 6] = [PENDING, CONFIRMED, PROCESSING, SHIPPED, DELIVERED, CANCELLED];

    /// The lifecycle is a straight line pending -> confirmed ->
    /// processing -> shipped -> delivered, with cancellation allowed
    /// from any non-terminal state. Delivered and cancelled are
    /// terminal.
    pub fn can_transition(from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        match to {
            CONFIRMED => from == PENDING,
            PROCESSING => from == CONFIRMED,
            SHIPPED => from == PROCESSING,
            DELIVERED => from == SHIPPED,
            CANCELLED => from != DELIVERED && from != CANCELLED,
            _ => false,
        }
    }
}

pub mod payment_status {
    pub const PENDING: &str = "pending";
    pub const PROCESSING: &str = "processing";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
    pub const CANCELLED: &str = "cancelled";

    pub const ALL: [&str; 5] = [PENDING, PROCESSING, COMPLETED, FAILED, CANCELLED];

    pub fn is_known(value: &str) -> bool {
        ALL.contains(&value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub coupon_id: Option<i64>,
    pub payment_method_id: i64,
    pub payment_status: String,
    pub screenshot_url: String,
    pub screenshot_uploaded_at: DateTime<Utc>,
    pub status: String,
    pub shipping_full_name: String,
    pub shipping_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub notes: String,
    pub agent_id: Option<i64>,
    pub commission: i64,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Line snapshot owned by the order. `unit_price` and `discount` are
/// frozen at purchase time and never track the live product price.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: i64,
    pub discount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
    use super::status::*;

    #[test]
    fn forward_path_is_single_step() {
        assert!(can_transition(PENDING, CONFIRMED));
        assert!(can_transition(CONFIRMED, PROCESSING));
        assert!(can_transition(PROCESSING, SHIPPED));
        assert!(can_transition(SHIPPED, DELIVERED));

        assert!(!can_transition(PENDING, PROCESSING));
        assert!(!can_transition(PENDING, SHIPPED));
        assert!(!can_transition(CONFIRMED, DELIVERED));
        assert!(!can_transition(SHIPPED, CONFIRMED));
    }

    #[test]
    fn cancellation_from_any_non_terminal_state() {
        for from in [PENDING, CONFIRMED, PROCESSING, SHIPPED] {
            assert!(can_transition(from, CANCELLED), "{from} -> cancelled");
        }
        assert!(!can_transition(DELIVERED, CANCELLED));
        assert!(!can_transition(CANCELLED, CANCELLED));
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for to in ALL {
            assert!(!can_transition(DELIVERED, to), "delivered -> {to}");
            assert!(!can_transition(CANCELLED, to), "cancelled -> {to}");
        }
    }

    #[test]
    fn self_transition_is_rejected() {
        for s in ALL {
            assert!(!can_transition(s, s));
        }
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert!(!can_transition(PENDING, "refunded"));
    }
}
