pub mod agent_service;
pub mod catalog_service;
pub mod coupon_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod user_service;
