use serde::Deserialize;
use sqlx::PgPool;

use fetan_db::StoreError;
use fetan_db::models::agent::{Agent, AgentReferral};
use fetan_db::repositories::agent_repo::AgentRepository;

use super::user_service::{AGENT_CODE_PREFIX, generate_referral_code};

const ROLES: [&str; 2] = ["agent", "super_agent"];

/// Sales agent administration. Earnings are credited by the order
/// lifecycle on payment completion; this service never writes them
/// directly.
#[derive(Clone)]
pub struct AgentService {
    agents: AgentRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentInput {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub password: String,
    pub commission_pct: i32,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "agent".to_string()
}

impl AgentService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            agents: AgentRepository::new(pool),
        }
    }

    pub async fn list(&self) -> Result<Vec<Agent>, StoreError> {
        Ok(self.agents.list_all().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Agent, StoreError> {
        self.agents
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound("agent"))
    }

    pub async fn referrals(&self, id: i64) -> Result<Vec<AgentReferral>, StoreError> {
        self.get(id).await?;
        Ok(self.agents.get_referrals(id).await?)
    }

    pub async fn create(&self, input: CreateAgentInput) -> Result<Agent, StoreError> {
        if input.full_name.trim().is_empty() {
            return Err(StoreError::validation("agent name is required"));
        }
        if !input.email.contains('@') {
            return Err(StoreError::validation("a valid email is required"));
        }
        if input.password.len() < 8 {
            return Err(StoreError::validation(
                "password must be at least 8 characters",
            ));
        }
        if !(0..=100).contains(&input.commission_pct) {
            return Err(StoreError::validation(
                "commission must be between 0 and 100 percent",
            ));
        }
        if !ROLES.contains(&input.role.as_str()) {
            return Err(StoreError::validation(format!(
                "unknown agent role '{}'",
                input.role
            )));
        }

        let hash = bcrypt::hash(&input.password, bcrypt::DEFAULT_COST)
            .map_err(|e| StoreError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;

        let created = self
            .agents
            .create(
                input.full_name.trim(),
                input.email.trim(),
                &input.phone,
                &hash,
                input.commission_pct,
                &input.role,
            )
            .await;

        let mut agent = match created {
            Ok(a) => a,
            Err(e) => {
                let is_duplicate = e
                    .downcast_ref::<sqlx::Error>()
                    .and_then(|e| e.as_database_error())
                    .is_some_and(|db| db.constraint() == Some("agents_email_key"));
                if is_duplicate {
                    return Err(StoreError::validation(format!(
                        "an agent with email '{}' already exists",
                        input.email.trim()
                    )));
                }
                return Err(StoreError::Internal(e));
            }
        };

        let code = self.assign_referral_code(agent.id).await?;
        agent.referral_code = Some(code);
        tracing::info!("agent {} created ({})", agent.id, agent.email);
        Ok(agent)
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        if !self.agents.delete(id).await? {
            return Err(StoreError::NotFound("agent"));
        }
        Ok(())
    }

    async fn assign_referral_code(&self, agent_id: i64) -> Result<String, StoreError> {
        for _ in 0..5 {
            let code = generate_referral_code(AGENT_CODE_PREFIX);
            match self.agents.set_referral_code(agent_id, &code).await {
                Ok(()) => return Ok(code),
                Err(e) => {
                    let is_collision = e
                        .downcast_ref::<sqlx::Error>()
                        .and_then(|e| e.as_database_error())
                        .is_some_and(|db| db.constraint() == Some("agents_referral_code_key"));
                    if !is_collision {
                        return Err(StoreError::Internal(e));
                    }
                }
            }
        }
        Err(StoreError::Internal(anyhow::anyhow!(
            "could not generate a unique agent referral code"
        )))
    }
}
