pub mod agent_repo;
pub mod api_key_repo;
pub mod coupon_repo;
pub mod order_repo;
pub mod payment_method_repo;
pub mod product_repo;
pub mod subscription_repo;
pub mod user_repo;
