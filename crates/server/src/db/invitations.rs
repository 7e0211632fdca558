use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::InvitationStatus;

use super::{users::insert_user, Database, Invitation, User};

impl Database {
    pub async fn create_invitation(&self, invitation: &Invitation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invitations (id, code, email, status, company_id, used_at, expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invitation.id)
        .bind(&invitation.code)
        .bind(&invitation.email)
        .bind(invitation.status)
        .bind(&invitation.company_id)
        .bind(invitation.used_at)
        .bind(invitation.expires_at)
        .bind(invitation.created_at)
        .bind(invitation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_invitation_by_code(&self, code: &str) -> Result<Option<Invitation>> {
        let invitation = sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invitation)
    }

    pub async fn list_company_invitations(&self, company_id: &str) -> Result<Vec<Invitation>> {
        let invitations = sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE company_id = ? ORDER BY created_at DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invitations)
    }

    /// Claim a pending, unexpired invitation and create `user` in one transaction.
    ///
    /// Returns false, creating nothing, when the invitation is not claimable
    /// (unknown, already accepted, or expired at `now`).
    pub async fn accept_invitation(&self, code: &str, user: &User, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            r#"
            UPDATE invitations SET status = ?, used_at = ?, updated_at = ?
            WHERE code = ? AND status = ? AND expires_at > ?
            "#,
        )
        .bind(InvitationStatus::Accepted)
        .bind(now)
        .bind(now)
        .bind(code)
        .bind(InvitationStatus::Pending)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_user(&mut *tx, user).await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Mark pending invitations whose expiry has passed as expired.
    pub async fn expire_invitations(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE invitations SET status = ?, updated_at = ? WHERE status = ? AND expires_at <= ?",
        )
        .bind(InvitationStatus::Expired)
        .bind(now)
        .bind(InvitationStatus::Pending)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
