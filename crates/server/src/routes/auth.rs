use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{normalize_email, LoginRequest, RefreshRequest, RegisterRequest, TokenResponse, UserType};

use crate::{
    config::AuthConfig,
    db::{RefreshToken, User},
    error::AppError,
    state::AppState,
};

const REFRESH_TOKEN_LENGTH: usize = 48;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub user_type: UserType,
    pub company_id: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

/// Caller identity taken from a verified `Authorization: Bearer` access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub user_type: UserType,
    pub company_id: Option<String>,
}

impl AuthUser {
    pub fn is_system(&self) -> bool {
        self.user_type == UserType::System
    }

    /// SYSTEM users manage every company; COMPANY users manage their own.
    pub fn can_manage(&self, company_id: &str) -> bool {
        match self.user_type {
            UserType::System => true,
            UserType::Company => self.company_id.as_deref() == Some(company_id),
            UserType::Candidate => false,
        }
    }

    pub fn require_system(&self) -> Result<(), AppError> {
        if !self.is_system() {
            return Err(AppError::Forbidden("Administrator access required".to_string()));
        }
        Ok(())
    }

    pub fn require_company_access(&self, company_id: &str) -> Result<(), AppError> {
        if !self.can_manage(company_id) {
            return Err(AppError::Forbidden(
                "You do not have access to this company".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::AuthError("Missing or invalid Authorization header".to_string()))?;

        let claims = verify_token(bearer.token(), &state.config.auth.jwt_secret)?;
        Ok(AuthUser {
            user_id: claims.sub,
            user_type: claims.user_type,
            company_id: claims.company_id,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Random alphanumeric string, used for refresh tokens and invitation codes.
pub fn random_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn generate_token(user: &User, auth_config: &AuthConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::minutes(auth_config.access_token_minutes))
        .ok_or_else(|| AppError::Internal("Failed to calculate expiration".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id.clone(),
        user_type: user.user_type,
        company_id: user.company_id.clone(),
        iat: now.timestamp() as usize,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth_config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::AuthError(e.to_string()))
}

fn new_refresh_token(user: &User, auth_config: &AuthConfig) -> RefreshToken {
    RefreshToken::new(
        random_code(REFRESH_TOKEN_LENGTH),
        user.id.clone(),
        Utc::now() + Duration::days(auth_config.refresh_token_days),
    )
}

fn token_response(user: &User, access_token: String, refresh: RefreshToken, auth_config: &AuthConfig) -> TokenResponse {
    TokenResponse {
        access_token,
        refresh_token: refresh.token,
        token_type: "Bearer".to_string(),
        expires_in: auth_config.access_token_minutes * 60,
        user_id: user.id.clone(),
        user_type: user.user_type,
    }
}

/// Issue a fresh access token and persist a new refresh token for `user`.
pub async fn issue_tokens(state: &AppState, user: &User) -> Result<TokenResponse, AppError> {
    let auth_config = &state.config.auth;
    let access_token = generate_token(user, auth_config)?;
    let refresh = new_refresh_token(user, auth_config);
    state.db.create_refresh_token(&refresh).await?;
    Ok(token_response(user, access_token, refresh, auth_config))
}

/// Candidate self sign-up.
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    req.validate()?;
    let email = normalize_email(&req.email)?;

    // Check if user already exists
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let mut user = User::new(UserType::Candidate, req.name.trim().to_string());
    user.email = Some(email);
    user.password_hash = Some(hash_password(&req.password)?);
    user.phone = req.phone;
    state.db.create_user(&user).await?;

    tracing::info!("Registered candidate {}", user.id);

    let tokens = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let email = normalize_email(&req.email).map_err(|_| invalid())?;
    let user = state.db.get_user_by_email(&email).await?.ok_or_else(invalid)?;

    let password_hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&req.password, password_hash)? || !user.is_active {
        return Err(invalid());
    }

    let tokens = issue_tokens(&state, &user).await?;
    tracing::info!("User {} logged in", user.id);
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new token pair. The presented token is revoked.
/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let invalid = || AppError::AuthError("Invalid or expired refresh token".to_string());

    let stored = state
        .db
        .get_refresh_token(&req.refresh_token)
        .await?
        .ok_or_else(invalid)?;
    if !stored.is_usable(Utc::now()) {
        return Err(invalid());
    }

    let user = state
        .db
        .get_user_by_id(&stored.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(invalid)?;

    let auth_config = &state.config.auth;
    let access_token = generate_token(&user, auth_config)?;
    let replacement = new_refresh_token(&user, auth_config);
    if !state.db.rotate_refresh_token(&stored.token, &replacement).await? {
        return Err(invalid());
    }

    tracing::debug!("Rotated refresh token for user {}", user.id);
    Ok(Json(token_response(&user, access_token, replacement, auth_config)))
}

/// Revoke a refresh token. Unknown or already revoked tokens are not an error.
/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let revoked = state.db.revoke_refresh_token(&req.refresh_token).await?;
    if revoked {
        tracing::debug!("Refresh token revoked on logout");
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<User>, AppError> {
    let user = state
        .db
        .get_user_by_id(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}
