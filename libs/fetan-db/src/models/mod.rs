pub mod agent;
pub mod api_key;
pub mod coupon;
pub mod order;
pub mod store;
pub mod user;
