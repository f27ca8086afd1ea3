use rand::Rng;
use serde::Serialize;
use sqlx::PgPool;

use fetan_db::StoreError;
use fetan_db::models::user::{CartLine, PaymentScreenshot, User};
use fetan_db::repositories::agent_repo::AgentRepository;
use fetan_db::repositories::product_repo::ProductRepository;
use fetan_db::repositories::user_repo::UserRepository;

const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const USER_CODE_PREFIX: &str = "FETAN-";
pub const AGENT_CODE_PREFIX: &str = "AG-";

/// Generates a short referral code with the given prefix. Ambiguous
/// characters (0/O, 1/I) are excluded from the charset.
pub(crate) fn generate_referral_code(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..6)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect();
    format!("{prefix}{suffix}")
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserStats {
    pub total_users: i64,
    pub registered_users: i64,
    pub active_subscriptions: i64,
}

/// Telegram users: registration, referral attribution, the server-held
/// cart, and payment screenshot records.
#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    users: UserRepository,
    agents: AgentRepository,
    products: ProductRepository,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            agents: AgentRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn get(&self, id: i64) -> Result<User, StoreError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound("user"))
    }

    pub async fn get_by_tg_id(&self, tg_id: i64) -> Result<User, StoreError> {
        self.users
            .get_by_tg_id(tg_id)
            .await?
            .ok_or(StoreError::NotFound("user"))
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.list_all().await?)
    }

    pub async fn stats(&self) -> Result<UserStats, StoreError> {
        Ok(sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                COUNT(*) AS total_users,
                COUNT(*) FILTER (WHERE is_registered) AS registered_users,
                COUNT(*) FILTER (WHERE subscription_status = 'active'
                                 AND subscription_expiry > NOW()) AS active_subscriptions
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?)
    }

    /// Upsert on /start or WebApp login. A referral code in the start
    /// parameter attributes the user to an agent (`AG-` prefix) or to
    /// another user, first touch wins.
    pub async fn upsert(
        &self,
        tg_id: i64,
        username: Option<&str>,
        full_name: Option<&str>,
        referral_code: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut user = self.users.upsert(tg_id, username, full_name).await?;

        if let Some(code) = referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            if user.referred_by_agent_id.is_none() && user.referred_by_user_id.is_none() {
                self.attribute_referral(&mut user, code).await?;
            }
        }

        if user.referral_code.is_none() {
            let code = self.assign_referral_code(user.id).await?;
            user.referral_code = Some(code);
        }

        Ok(user)
    }

    pub async fn register(&self, user_id: i64, phone: Option<&str>) -> Result<User, StoreError> {
        self.get(user_id).await?;
        self.users.mark_registered(user_id, phone).await?;
        self.get(user_id).await
    }

    async fn attribute_referral(&self, user: &mut User, code: &str) -> Result<(), StoreError> {
        if code.starts_with(AGENT_CODE_PREFIX) {
            if let Some(agent) = self.agents.get_by_referral_code(code).await? {
                sqlx::query("UPDATE users SET referred_by_agent_id = $1 WHERE id = $2")
                    .bind(agent.id)
                    .bind(user.id)
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::Database)?;
                self.agents.record_referral(agent.id, user.id).await?;
                user.referred_by_agent_id = Some(agent.id);
                tracing::info!("user {} attributed to agent {}", user.id, agent.id);
            }
        } else if let Some(referrer) = self.users.get_by_referral_code(code).await? {
            if referrer.id != user.id {
                sqlx::query("UPDATE users SET referred_by_user_id = $1 WHERE id = $2")
                    .bind(referrer.id)
                    .bind(user.id)
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::Database)?;
                user.referred_by_user_id = Some(referrer.id);
            }
        }
        Ok(())
    }

    /// Retries on the (unlikely) UNIQUE collision of a generated code.
    async fn assign_referral_code(&self, user_id: i64) -> Result<String, StoreError> {
        for _ in 0..5 {
            let code = generate_referral_code(USER_CODE_PREFIX);
            match self.users.set_referral_code(user_id, &code).await {
                Ok(()) => return Ok(code),
                Err(e) => {
                    let is_collision = e
                        .downcast_ref::<sqlx::Error>()
                        .and_then(|e| e.as_database_error())
                        .is_some_and(|db| db.constraint() == Some("users_referral_code_key"));
                    if !is_collision {
                        return Err(StoreError::Internal(e));
                    }
                }
            }
        }
        Err(StoreError::Internal(anyhow::anyhow!(
            "could not generate a unique referral code"
        )))
    }

    // --- Cart ---

    pub async fn add_to_cart(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<Vec<CartLine>, StoreError> {
        if quantity <= 0 {
            return Err(StoreError::validation("quantity must be positive"));
        }
        let product = self
            .products
            .get_by_id(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(StoreError::NotFound("product"))?;
        if product.stock < quantity {
            return Err(StoreError::InsufficientStock { product_id });
        }
        self.users.add_to_cart(user_id, product_id, quantity).await?;
        Ok(self.users.get_cart(user_id).await?)
    }

    pub async fn set_cart_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<Vec<CartLine>, StoreError> {
        self.users
            .set_cart_quantity(user_id, product_id, quantity)
            .await?;
        Ok(self.users.get_cart(user_id).await?)
    }

    pub async fn get_cart(&self, user_id: i64) -> Result<Vec<CartLine>, StoreError> {
        Ok(self.users.get_cart(user_id).await?)
    }

    pub async fn clear_cart(&self, user_id: i64) -> Result<(), StoreError> {
        Ok(self.users.clear_cart(user_id).await?)
    }

    // --- Payment screenshots ---

    pub async fn add_screenshot(
        &self,
        user_id: i64,
        subscription_id: Option<i64>,
        url: &str,
    ) -> Result<PaymentScreenshot, StoreError> {
        self.get(user_id).await?;
        Ok(self
            .users
            .add_screenshot(user_id, subscription_id, url)
            .await?)
    }

    pub async fn screenshots(&self, user_id: i64) -> Result<Vec<PaymentScreenshot>, StoreError> {
        Ok(self.users.get_screenshots(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_carry_the_prefix_and_length() {
        let code = generate_referral_code(USER_CODE_PREFIX);
        assert!(code.starts_with("FETAN-"));
        assert_eq!(code.len(), "FETAN-".len() + 6);

        let agent = generate_referral_code(AGENT_CODE_PREFIX);
        assert!(agent.starts_with("AG-"));
    }

    #[test]
    fn referral_codes_avoid_ambiguous_characters() {
        for _ in 0..50 {
            let code = generate_referral_code("");
            assert!(
                code.chars().all(|c| !"0O1I".contains(c)),
                "ambiguous char in {code}"
            );
        }
    }
}
