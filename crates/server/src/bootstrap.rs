use anyhow::{Context, Result};
use shared::{normalize_email, validate_password, UserType};

use crate::{
    config::BootstrapConfig,
    db::{Database, User},
    routes::auth::hash_password,
};

/// Create the configured SYSTEM account unless a user with its email already exists.
///
/// Returns true when a new account was created. An existing account is left
/// untouched, whatever its type or password.
pub async fn ensure_system_user(db: &Database, config: &BootstrapConfig) -> Result<bool> {
    let email = normalize_email(&config.admin_email).context("Invalid bootstrap admin_email")?;
    if db.get_user_by_email(&email).await?.is_some() {
        tracing::debug!("Bootstrap account {} already exists", email);
        return Ok(false);
    }
    validate_password(&config.admin_password).context("Invalid bootstrap admin_password")?;

    let mut admin = User::new(UserType::System, config.admin_name.trim().to_string());
    admin.email = Some(email);
    admin.password_hash = Some(hash_password(&config.admin_password)?);
    db.create_user(&admin).await?;

    tracing::info!("Created bootstrap SYSTEM account {}", admin.id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap() -> BootstrapConfig {
        BootstrapConfig {
            admin_email: "Admin@Hireboard.dev".to_string(),
            admin_password: "bootstrap-password".to_string(),
            admin_name: "Administrator".to_string(),
        }
    }

    #[tokio::test]
    async fn test_creates_system_user_once() {
        let db = Database::in_memory().await.unwrap();

        assert!(ensure_system_user(&db, &bootstrap()).await.unwrap());
        assert!(!ensure_system_user(&db, &bootstrap()).await.unwrap());

        let admin = db.get_user_by_email("admin@hireboard.dev").await.unwrap().unwrap();
        assert_eq!(admin.user_type, UserType::System);
        assert!(admin.company_id.is_none());
        assert!(admin.password_hash.unwrap().starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_rejects_weak_password() {
        let db = Database::in_memory().await.unwrap();
        let mut config = bootstrap();
        config.admin_password = "short".to_string();

        assert!(ensure_system_user(&db, &config).await.is_err());
        assert!(db.get_user_by_email("admin@hireboard.dev").await.unwrap().is_none());
    }
}
