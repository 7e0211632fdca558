//! Invitation codes that onboard staff into a company

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use shared::{
    normalize_email, AcceptInvitationRequest, CreateInvitationRequest, InvitationStatus,
    TokenResponse, UserType,
};

use crate::{
    db::{Database, Invitation, User},
    error::AppError,
    routes::{
        auth::{hash_password, issue_tokens, random_code, AuthUser},
        companies::load_company,
    },
    state::AppState,
};

/// Attempts before giving up on finding an unused code.
const CODE_ATTEMPTS: usize = 5;

fn invitation_code(length: usize) -> String {
    random_code(length).to_uppercase()
}

/// Codes are shown uppercase; accept whatever case the user typed.
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// POST /companies/:id/invitations
pub async fn create_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    Json(req): Json<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    auth.require_company_access(&company_id)?;
    req.validate()?;
    load_company(&state, &company_id).await?;

    let settings = &state.config.invitations;
    let email = req.email.as_deref().map(normalize_email).transpose()?;
    let expires_at = Utc::now() + Duration::hours(settings.expiry_hours);

    let mut invitation = Invitation::new(String::new(), company_id.clone(), expires_at);
    invitation.email = email;
    insert_with_fresh_code(&state.db, &mut invitation, || {
        invitation_code(settings.code_length)
    })
    .await?;

    tracing::info!(
        "User {} created invitation {} for company {}",
        auth.user_id,
        invitation.code,
        company_id
    );
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// Insert `invitation` under a code from `next_code`, drawing again while the code is taken.
async fn insert_with_fresh_code(
    db: &Database,
    invitation: &mut Invitation,
    mut next_code: impl FnMut() -> String,
) -> Result<(), AppError> {
    for _ in 0..CODE_ATTEMPTS {
        invitation.code = next_code();
        match db.create_invitation(invitation).await.map_err(AppError::from) {
            Ok(()) => return Ok(()),
            Err(AppError::Conflict(_)) => {
                tracing::warn!("Invitation code collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal("Could not generate a unique invitation code".to_string()))
}

/// GET /companies/:id/invitations
pub async fn list_invitations(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<Invitation>>, AppError> {
    auth.require_company_access(&company_id)?;
    Ok(Json(state.db.list_company_invitations(&company_id).await?))
}

/// Redeem an invitation code, creating a company account.
/// POST /invitations/accept
pub async fn accept_invitation(
    State(state): State<AppState>,
    Json(req): Json<AcceptInvitationRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    req.validate()?;
    let code = normalize_code(&req.code);
    let email = normalize_email(&req.email)?;
    let now = Utc::now();

    let invitation = state
        .db
        .get_invitation_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid invitation code".to_string()))?;

    match invitation.status {
        InvitationStatus::Pending => {}
        InvitationStatus::Accepted => {
            return Err(AppError::BadRequest(
                "This invitation code has already been used".to_string(),
            ))
        }
        InvitationStatus::Expired => {
            return Err(AppError::BadRequest("This invitation code has expired".to_string()))
        }
    }

    if invitation.is_expired(now) {
        state.db.expire_invitations(now).await?;
        return Err(AppError::BadRequest("This invitation code has expired".to_string()));
    }

    if invitation.email.as_ref().is_some_and(|invited| *invited != email) {
        return Err(AppError::BadRequest(
            "This invitation was issued for a different email address".to_string(),
        ));
    }

    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let mut user = User::new(UserType::Company, req.name.trim().to_string());
    user.email = Some(email);
    user.password_hash = Some(hash_password(&req.password)?);
    user.phone = req.phone;
    user.company_id = Some(invitation.company_id.clone());

    if !state.db.accept_invitation(&code, &user, now).await? {
        return Err(AppError::BadRequest(
            "This invitation code is no longer valid".to_string(),
        ));
    }

    tracing::info!(
        "User {} joined company {} with invitation {}",
        user.id,
        invitation.company_id,
        code
    );

    let tokens = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_code_shape() {
        let code = invitation_code(8);
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab12cd34 "), "AB12CD34");
    }

    async fn company_db() -> (Database, String) {
        let db = Database::in_memory().await.unwrap();
        let company = crate::db::Company::new("Acme".to_string());
        db.create_company(&company).await.unwrap();
        (db, company.id)
    }

    fn pending(company_id: &str) -> Invitation {
        Invitation::new(String::new(), company_id.to_string(), Utc::now() + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_taken_code_is_redrawn() {
        let (db, company_id) = company_db().await;
        let mut existing = pending(&company_id);
        existing.code = "TAKEN001".to_string();
        db.create_invitation(&existing).await.unwrap();

        let mut codes = vec!["FRESH001", "TAKEN001"];
        let mut invitation = pending(&company_id);
        insert_with_fresh_code(&db, &mut invitation, || codes.pop().unwrap().to_string())
            .await
            .unwrap();

        assert_eq!(invitation.code, "FRESH001");
        let stored = db.get_invitation_by_code("FRESH001").await.unwrap().unwrap();
        assert_eq!(stored.id, invitation.id);
    }

    #[tokio::test]
    async fn test_gives_up_when_every_code_is_taken() {
        let (db, company_id) = company_db().await;
        let mut existing = pending(&company_id);
        existing.code = "TAKEN001".to_string();
        db.create_invitation(&existing).await.unwrap();

        let mut draws = 0;
        let mut invitation = pending(&company_id);
        let result = insert_with_fresh_code(&db, &mut invitation, || {
            draws += 1;
            "TAKEN001".to_string()
        })
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(draws, CODE_ATTEMPTS);
    }
}
