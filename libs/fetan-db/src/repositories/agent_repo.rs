use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::agent::{Agent, AgentReferral};

#[derive(Debug, Clone)]
pub struct AgentRepository {
    pool: PgPool,
}

impl AgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Agent>> {
        sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch agent by ID")
    }

    pub async fn get_by_referral_code(&self, code: &str) -> Result<Option<Agent>> {
        sqlx::query_as::<_, Agent>(
            "SELECT * FROM agents WHERE referral_code = $1 AND is_active = TRUE",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch agent by referral code")
    }

    pub async fn list_all(&self) -> Result<Vec<Agent>> {
        sqlx::query_as::<_, Agent>("SELECT * FROM agents ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch agents")
    }

    pub async fn create(
        &self,
        full_name: &str,
        email: &str,
        phone: &str,
        password_hash: &str,
        commission_pct: i32,
        role: &str,
    ) -> Result<Agent> {
        sqlx::query_as::<_, Agent>(
            r#"
            INSERT INTO agents (full_name, email, phone, password_hash, commission_pct, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(phone)
        .bind(password_hash)
        .bind(commission_pct)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create agent")
    }

    pub async fn set_referral_code(&self, id: i64, code: &str) -> Result<()> {
        sqlx::query("UPDATE agents SET referral_code = $1 WHERE id = $2")
            .bind(code)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn record_referral(&self, agent_id: i64, user_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_referrals (agent_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (agent_id, user_id) DO NOTHING
            "#,
        )
        .bind(agent_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .context("Failed to record agent referral")?;
        Ok(())
    }

    pub async fn get_referrals(&self, agent_id: i64) -> Result<Vec<AgentReferral>> {
        sqlx::query_as::<_, AgentReferral>(
            "SELECT * FROM agent_referrals WHERE agent_id = $1 ORDER BY referred_at DESC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch agent referrals")
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
