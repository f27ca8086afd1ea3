use fetan_db::StoreError;
use fetan_db::models::user::User;

use crate::AppState;
use crate::auth::Claims;

pub mod agents;
pub mod auth;
pub mod bot;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod users;

/// Resolves the authenticated customer from the JWT claims. Client
/// tokens carry the Telegram ID as subject.
pub(crate) async fn current_user(state: &AppState, claims: &Claims) -> Result<User, StoreError> {
    let tg_id: i64 = claims.sub.parse().map_err(|_| StoreError::Unauthorized)?;
    state.users.get_by_tg_id(tg_id).await
}
