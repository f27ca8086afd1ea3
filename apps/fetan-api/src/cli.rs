//! Operator commands: admin credential management and API key
//! provisioning for the bot backend.

use anyhow::{Context, Result};
use clap::Subcommand;
use fetan_db::repositories::api_key_repo::ApiKeyRepository;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum AdminAction {
    /// Create an admin account or reset its password.
    ResetPassword {
        username: String,
        password: String,
    },
    /// Issue an API key for a bot backend.
    CreateApiKey {
        /// A label identifying the consumer, e.g. "telegram-bot".
        name: String,
    },
    /// List issued API keys.
    ListApiKeys,
    /// Revoke an API key by id.
    RevokeApiKey {
        id: i64,
    },
}

pub async fn run(action: AdminAction) -> Result<()> {
    let pool = fetan_db::db::init_db().await?;

    match action {
        AdminAction::ResetPassword { username, password } => {
            if password.len() < 8 {
                anyhow::bail!("password must be at least 8 characters");
            }
            let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
                .context("Failed to hash password")?;
            sqlx::query(
                r#"
                INSERT INTO admins (username, password_hash)
                VALUES ($1, $2)
                ON CONFLICT (username) DO UPDATE SET password_hash = EXCLUDED.password_hash
                "#,
            )
            .bind(&username)
            .bind(&hash)
            .execute(&pool)
            .await
            .context("Failed to upsert admin")?;
            println!("Password set for admin '{username}'");
        }
        AdminAction::CreateApiKey { name } => {
            let key = format!("fk_{}", Uuid::new_v4().simple());
            let created = ApiKeyRepository::new(pool).create(&name, &key).await?;
            println!("API key '{}' created:", created.name);
            println!("{}", created.key);
            println!("Store it now; it is not shown again.");
        }
        AdminAction::ListApiKeys => {
            let keys = ApiKeyRepository::new(pool).get_all().await?;
            for k in keys {
                let state = if k.is_active { "active" } else { "disabled" };
                println!("{:>4}  {:<20} {}  last used: {:?}", k.id, k.name, state, k.last_used_at);
            }
        }
        AdminAction::RevokeApiKey { id } => {
            ApiKeyRepository::new(pool).delete(id).await?;
            println!("API key {id} revoked");
        }
    }

    Ok(())
}
