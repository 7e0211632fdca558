use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use super::{Database, RefreshToken, User};

/// Insert a user through any executor so invitation acceptance can do it inside its transaction.
pub(super) async fn insert_user<'e, E>(executor: E, user: &User) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO users (id, user_type, email, password_hash, name, is_active, company_id, phone, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(user.user_type)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.is_active)
    .bind(&user.company_id)
    .bind(&user.phone)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_refresh_token<'e, E>(executor: E, token: &RefreshToken) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, token, user_id, expires_at, is_revoked, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&token.id)
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(token.expires_at)
    .bind(token.is_revoked)
    .bind(token.created_at)
    .bind(token.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

impl Database {
    // User operations
    pub async fn create_user(&self, user: &User) -> Result<()> {
        insert_user(&self.pool, user).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list_company_users(&self, company_id: &str) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE company_id = ? ORDER BY created_at ASC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn set_user_active(&self, id: &str, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Refresh token operations
    pub async fn create_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        insert_refresh_token(&self.pool, token).await
    }

    pub async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(token)
    }

    /// Returns false when the token is unknown or was already revoked.
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = 1, updated_at = ? WHERE token = ? AND is_revoked = 0",
        )
        .bind(Utc::now())
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke `old` and store `new` atomically. Returns false, storing nothing,
    /// if `old` was already revoked (a concurrent refresh won the race).
    pub async fn rotate_refresh_token(&self, old: &str, new: &RefreshToken) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = 1, updated_at = ? WHERE token = ? AND is_revoked = 0",
        )
        .bind(Utc::now())
        .bind(old)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if revoked == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_refresh_token(&mut *tx, new).await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn revoke_user_refresh_tokens(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = 1, updated_at = ? WHERE user_id = ? AND is_revoked = 0",
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete tokens past their expiry, revoked or not.
    pub async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared::UserType;

    fn candidate(email: Option<&str>) -> User {
        let mut user = User::new(UserType::Candidate, "Jane".to_string());
        user.email = email.map(str::to_string);
        user
    }

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = Database::in_memory().await.unwrap();
        let user = candidate(Some("jane@example.com"));
        db.create_user(&user).await.unwrap();

        let by_email = db.get_user_by_email("jane@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.user_type, UserType::Candidate);
        assert!(by_email.is_active);

        let by_id = db.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email.as_deref(), Some("jane@example.com"));
        assert!(db.get_user_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_unique_when_present() {
        let db = Database::in_memory().await.unwrap();
        db.create_user(&candidate(Some("jane@example.com"))).await.unwrap();
        assert!(db.create_user(&candidate(Some("jane@example.com"))).await.is_err());

        // Several accounts without email are fine
        db.create_user(&candidate(None)).await.unwrap();
        db.create_user(&candidate(None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_user_active() {
        let db = Database::in_memory().await.unwrap();
        let user = candidate(None);
        db.create_user(&user).await.unwrap();

        assert!(db.set_user_active(&user.id, false).await.unwrap());
        assert!(!db.get_user_by_id(&user.id).await.unwrap().unwrap().is_active);
        assert!(!db.set_user_active("missing", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_token_lifecycle() {
        let db = Database::in_memory().await.unwrap();
        let user = candidate(None);
        db.create_user(&user).await.unwrap();

        let token = RefreshToken::new("tok-1".to_string(), user.id.clone(), Utc::now() + Duration::days(1));
        db.create_refresh_token(&token).await.unwrap();

        let stored = db.get_refresh_token("tok-1").await.unwrap().unwrap();
        assert!(!stored.is_revoked);

        assert!(db.revoke_refresh_token("tok-1").await.unwrap());
        assert!(!db.revoke_refresh_token("tok-1").await.unwrap());
        assert!(db.get_refresh_token("tok-1").await.unwrap().unwrap().is_revoked);
    }

    #[tokio::test]
    async fn test_refresh_token_unique() {
        let db = Database::in_memory().await.unwrap();
        let user = candidate(None);
        db.create_user(&user).await.unwrap();

        let expires = Utc::now() + Duration::days(1);
        db.create_refresh_token(&RefreshToken::new("dup".to_string(), user.id.clone(), expires))
            .await
            .unwrap();
        assert!(db
            .create_refresh_token(&RefreshToken::new("dup".to_string(), user.id.clone(), expires))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_rotate_refresh_token_only_once() {
        let db = Database::in_memory().await.unwrap();
        let user = candidate(None);
        db.create_user(&user).await.unwrap();

        let expires = Utc::now() + Duration::days(1);
        db.create_refresh_token(&RefreshToken::new("old".to_string(), user.id.clone(), expires))
            .await
            .unwrap();

        let first = RefreshToken::new("new-1".to_string(), user.id.clone(), expires);
        assert!(db.rotate_refresh_token("old", &first).await.unwrap());

        let second = RefreshToken::new("new-2".to_string(), user.id.clone(), expires);
        assert!(!db.rotate_refresh_token("old", &second).await.unwrap());
        assert!(db.get_refresh_token("new-2").await.unwrap().is_none());
        assert!(db.get_refresh_token("new-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_revoke_all_and_purge() {
        let db = Database::in_memory().await.unwrap();
        let user = candidate(None);
        db.create_user(&user).await.unwrap();

        let now = Utc::now();
        db.create_refresh_token(&RefreshToken::new("a".to_string(), user.id.clone(), now - Duration::hours(1)))
            .await
            .unwrap();
        db.create_refresh_token(&RefreshToken::new("b".to_string(), user.id.clone(), now + Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(db.revoke_user_refresh_tokens(&user.id).await.unwrap(), 2);
        assert_eq!(db.purge_expired_refresh_tokens(now).await.unwrap(), 1);
        assert!(db.get_refresh_token("a").await.unwrap().is_none());
        assert!(db.get_refresh_token("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_refresh_tokens() {
        let db = Database::in_memory().await.unwrap();
        let user = candidate(None);
        db.create_user(&user).await.unwrap();
        db.create_refresh_token(&RefreshToken::new("t".to_string(), user.id.clone(), Utc::now() + Duration::days(1)))
            .await
            .unwrap();

        assert!(db.delete_user(&user.id).await.unwrap());
        assert!(db.get_refresh_token("t").await.unwrap().is_none());
    }
}
