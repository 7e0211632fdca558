use axum::{
    extract::{Path, State},
    Json,
};
use shared::{SetUserActiveRequest, UserType};

use crate::{db::User, error::AppError, routes::auth::AuthUser, state::AppState};

async fn load_user(state: &AppState, user_id: &str) -> Result<User, AppError> {
    state
        .db
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Administrators manage everyone; company users manage their colleagues.
fn can_administer(auth: &AuthUser, target: &User) -> bool {
    if auth.is_system() {
        return true;
    }
    auth.user_type == UserType::Company
        && target.user_type == UserType::Company
        && target.company_id.is_some()
        && target.company_id == auth.company_id
}

/// GET /companies/:id/users
pub async fn list_company_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<User>>, AppError> {
    auth.require_company_access(&company_id)?;
    Ok(Json(state.db.list_company_users(&company_id).await?))
}

/// Activate or deactivate an account. Deactivation revokes its refresh tokens.
/// PATCH /users/:id/active
pub async fn set_user_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    Json(req): Json<SetUserActiveRequest>,
) -> Result<Json<User>, AppError> {
    if user_id == auth.user_id {
        return Err(AppError::BadRequest(
            "You cannot change your own active state".to_string(),
        ));
    }

    let target = load_user(&state, &user_id).await?;
    if !can_administer(&auth, &target) {
        return Err(AppError::Forbidden("You cannot manage this user".to_string()));
    }

    state.db.set_user_active(&user_id, req.is_active).await?;
    if !req.is_active {
        let revoked = state.db.revoke_user_refresh_tokens(&user_id).await?;
        tracing::info!("User {} deactivated {} ({} tokens revoked)", auth.user_id, user_id, revoked);
    }

    Ok(Json(load_user(&state, &user_id).await?))
}

/// Permanently remove an account and its refresh tokens.
/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_system()?;
    if user_id == auth.user_id {
        return Err(AppError::BadRequest("You cannot delete yourself".to_string()));
    }

    if !state.db.delete_user(&user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!("User {} deleted user {}", auth.user_id, user_id);
    Ok(Json(serde_json::json!({ "success": true })))
}
