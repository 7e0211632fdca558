//! Company, address and membership endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::{normalize_email, CreateCompanyRequest, UpdateCompanyRequest, UpsertAddressRequest};

use crate::{
    db::{Address, Company},
    error::AppError,
    routes::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct CompanyDetails {
    #[serde(flatten)]
    pub company: Company,
    pub address: Option<Address>,
}

pub(super) async fn load_company(state: &AppState, company_id: &str) -> Result<Company, AppError> {
    state
        .db
        .get_company(company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /companies
pub async fn create_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    auth.require_system()?;
    req.validate()?;

    let mut company = Company::new(req.name.trim().to_string());
    company.description = trimmed(req.description);
    company.email = req.email.as_deref().map(normalize_email).transpose()?;
    company.phone = trimmed(req.phone);
    company.website = trimmed(req.website);
    company.industry = req.industry;
    company.number_of_employees = req.number_of_employees;
    company.subscription = req.subscription.unwrap_or_default();
    state.db.create_company(&company).await?;

    tracing::info!("Created company {} ({})", company.name, company.id);
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /companies
pub async fn list_companies(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Company>>, AppError> {
    auth.require_system()?;
    Ok(Json(state.db.list_companies().await?))
}

/// GET /companies/:id
pub async fn get_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> Result<Json<CompanyDetails>, AppError> {
    auth.require_company_access(&company_id)?;
    let company = load_company(&state, &company_id).await?;
    let address = state.db.get_company_address(&company_id).await?;
    Ok(Json(CompanyDetails { company, address }))
}

/// PATCH /companies/:id
pub async fn update_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<Company>, AppError> {
    auth.require_company_access(&company_id)?;
    req.validate()?;
    if req.subscription.is_some() && !auth.is_system() {
        return Err(AppError::Forbidden(
            "Only administrators can change the subscription".to_string(),
        ));
    }

    let mut company = load_company(&state, &company_id).await?;
    if let Some(name) = req.name {
        company.name = name.trim().to_string();
    }
    if let Some(description) = req.description {
        company.description = trimmed(Some(description));
    }
    if let Some(email) = req.email {
        company.email = Some(normalize_email(&email)?);
    }
    if let Some(phone) = req.phone {
        company.phone = trimmed(Some(phone));
    }
    if let Some(website) = req.website {
        company.website = trimmed(Some(website));
    }
    if let Some(industry) = req.industry {
        company.industry = Some(industry);
    }
    if let Some(count) = req.number_of_employees {
        company.number_of_employees = Some(count);
    }
    if let Some(subscription) = req.subscription {
        company.subscription = subscription;
    }

    state.db.update_company(&company).await?;
    let company = load_company(&state, &company_id).await?;
    Ok(Json(company))
}

/// DELETE /companies/:id
pub async fn delete_company(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_system()?;

    if !state.db.delete_company(&company_id).await? {
        return Err(AppError::NotFound("Company not found".to_string()));
    }

    tracing::info!("User {} deleted company {}", auth.user_id, company_id);
    Ok(Json(serde_json::json!({ "success": true })))
}

/// PUT /companies/:id/address
pub async fn upsert_address(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    Json(req): Json<UpsertAddressRequest>,
) -> Result<Json<Address>, AppError> {
    auth.require_company_access(&company_id)?;
    req.validate()?;
    load_company(&state, &company_id).await?;

    let mut address = Address::new(company_id, req.city.trim().to_string(), req.country);
    address.street = trimmed(req.street);
    let address = state.db.upsert_address(&address).await?;
    Ok(Json(address))
}

/// DELETE /companies/:id/address
pub async fn delete_address(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_company_access(&company_id)?;

    if !state.db.delete_company_address(&company_id).await? {
        return Err(AppError::NotFound("Address not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "success": true })))
}
