//! First administrator account

use anyhow::Context;
use crm_auth::hash_password;
use crm_core::config::AuthConfig;
use crm_db::{NewUser, Repository, UserRepository};
use crm_models::{normalize_email, user::check_password, Role};
use sqlx::PgPool;
use tracing::{debug, info, warn};

/// Create an admin from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when no user exists yet
pub async fn ensure_admin(pool: &PgPool, auth: &AuthConfig) -> anyhow::Result<()> {
    let repo = UserRepository::new(pool.clone());
    if repo.count().await? > 0 {
        debug!("Users present, skipping admin bootstrap");
        return Ok(());
    }

    let (Some(email), Some(password)) = (
        auth.bootstrap_admin_email.as_deref(),
        auth.bootstrap_admin_password.as_deref(),
    ) else {
        warn!("No users exist and ADMIN_EMAIL / ADMIN_PASSWORD are not set; nobody can log in");
        return Ok(());
    };

    check_password(password, auth.password_min_length)
        .map_err(|msg| anyhow::anyhow!("ADMIN_PASSWORD {}", msg))?;
    let password_hash = hash_password(password).context("failed to hash ADMIN_PASSWORD")?;

    let admin = repo
        .create(NewUser {
            email: normalize_email(email),
            display_name: "Administrator".to_string(),
            password_hash,
            role: Role::Admin,
        })
        .await
        .context("failed to create the bootstrap administrator")?;

    info!(user_id = admin.id, email = %admin.email, "Bootstrap administrator created");
    Ok(())
}
