use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Agent {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub referral_code: Option<String>,
    pub commission_pct: i32,
    pub total_earnings: i64,
    pub is_active: bool,
    pub role: String, // 'agent' or 'super_agent'
    pub permissions: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Commission in cents for an order total, at this agent's rate.
    pub fn commission_for(&self, total: i64) -> i64 {
        total * self.commission_pct as i64 / 100
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AgentReferral {
    pub id: i64,
    pub agent_id: i64,
    pub user_id: i64,
    pub referred_at: DateTime<Utc>,
}
