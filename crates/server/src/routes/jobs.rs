//! Job postings: creation, discovery, lifecycle and statistics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use shared::{
    CreateJobRequest, JobQuery, JobStats, JobStatus, JobStatusRequest, UpdateJobRequest, UserType,
};

use crate::{
    db::{json_list, Job, JobFilter},
    error::AppError,
    routes::{auth::AuthUser, companies::load_company},
    state::AppState,
};

/// How much of the job catalogue a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Active postings only
    Public,
    /// Everything but deleted postings of the caller's own company
    Company,
    /// Everything, deleted postings included when asked for
    System,
}

fn scope_for(auth: Option<&AuthUser>, company_id: Option<&str>) -> Scope {
    match (auth, company_id) {
        (Some(auth), _) if auth.is_system() => Scope::System,
        (Some(auth), Some(company_id)) if auth.can_manage(company_id) => Scope::Company,
        _ => Scope::Public,
    }
}

/// Statuses to query for. Empty when the requested status is not visible in `scope`.
fn visible_statuses(scope: Scope, requested: Option<JobStatus>) -> Vec<JobStatus> {
    let visible = |status: &JobStatus| match scope {
        Scope::Public => status.is_public(),
        Scope::Company => !status.is_deleted(),
        Scope::System => true,
    };

    match requested {
        Some(status) if visible(&status) => vec![status],
        Some(_) => Vec::new(),
        None => JobStatus::ALL
            .iter()
            .copied()
            .filter(|status| visible(status) && !status.is_deleted())
            .collect(),
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Job not found".to_string())
}

/// Load a job the caller may read. Non-public jobs are hidden from outsiders.
pub(super) async fn load_visible_job(
    state: &AppState,
    auth: Option<&AuthUser>,
    job_id: &str,
) -> Result<Job, AppError> {
    let job = state.db.get_job(job_id).await?.ok_or_else(not_found)?;

    let manages = auth.is_some_and(|auth| auth.can_manage(&job.company_id));
    if job.status.is_deleted() && !auth.is_some_and(AuthUser::is_system) {
        return Err(not_found());
    }
    if !job.status.is_public() && !manages {
        return Err(not_found());
    }
    Ok(job)
}

/// Load a job the caller may edit. Deleted jobs are gone for editing purposes.
pub(super) async fn load_managed_job(
    state: &AppState,
    auth: &AuthUser,
    job_id: &str,
) -> Result<Job, AppError> {
    let job = state.db.get_job(job_id).await?.ok_or_else(not_found)?;
    if job.status.is_deleted() {
        return Err(not_found());
    }
    auth.require_company_access(&job.company_id)?;
    Ok(job)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /companies/:id/jobs
pub async fn create_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    auth.require_company_access(&company_id)?;
    req.validate()?;
    load_company(&state, &company_id).await?;

    let mut job = Job::new(
        company_id,
        req.title.trim().to_string(),
        req.description.trim().to_string(),
        req.job_type,
    );
    job.department = trimmed(req.department);
    job.location = trimmed(req.location);
    job.salary = trimmed(req.salary);
    job.deadline = req.deadline;
    job.responsibilities = trimmed(req.responsibilities);
    job.requirements = trimmed(req.requirements);
    job.benefits = trimmed(req.benefits);
    job.company_description = trimmed(req.company_description);
    job.skills = json_list(req.skills);
    job.experience = trimmed(req.experience);
    job.education = trimmed(req.education);
    job.job_level = req.job_level;
    job.work_type = req.work_type;
    job.industry = trimmed(req.industry);
    job.status = req.status.unwrap_or_default();
    job.cv_analysis_prompt = trimmed(req.cv_analysis_prompt);
    job.interview_prompt = trimmed(req.interview_prompt);
    job.ai_second_interview_prompt = trimmed(req.ai_second_interview_prompt);

    if job.status.is_public() && job.deadline_passed(Utc::now()) {
        return Err(AppError::BadRequest(
            "Cannot publish a job whose deadline has passed".to_string(),
        ));
    }

    state.db.create_job(&job).await?;
    tracing::info!("Created job {} for company {} as {}", job.id, job.company_id, job.status);
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs
pub async fn list_jobs(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Query(query): Query<JobQuery>,
) -> Result<Json<Vec<Job>>, AppError> {
    let scope = scope_for(auth.as_ref(), query.company_id.as_deref());
    let statuses = visible_statuses(scope, query.status);
    if statuses.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let filter = JobFilter {
        company_id: query.company_id.clone(),
        statuses,
        job_type: query.job_type,
        work_type: query.work_type,
        job_level: query.job_level,
        search: query.q.clone(),
        limit: query.limit(),
        offset: query.offset(),
    };
    Ok(Json(state.db.list_jobs(&filter).await?))
}

/// Views by anyone outside the owning company are counted.
/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, AppError> {
    let mut job = load_visible_job(&state, auth.as_ref(), &job_id).await?;

    let manages = auth.as_ref().is_some_and(|auth| auth.can_manage(&job.company_id));
    if !manages {
        state.db.increment_job_views(&job.id).await?;
        job.views += 1;
    }
    Ok(Json(job))
}

/// PATCH /jobs/:id
pub async fn update_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<String>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<Job>, AppError> {
    req.validate()?;
    let mut job = load_managed_job(&state, &auth, &job_id).await?;

    if let Some(title) = req.title {
        job.title = title.trim().to_string();
    }
    if let Some(description) = req.description {
        job.description = description.trim().to_string();
    }
    if let Some(job_type) = req.job_type {
        job.job_type = job_type;
    }
    if let Some(deadline) = req.deadline {
        job.deadline = Some(deadline);
    }
    if let Some(skills) = req.skills {
        job.skills = json_list(skills);
    }
    if req.department.is_some() {
        job.department = trimmed(req.department);
    }
    if req.location.is_some() {
        job.location = trimmed(req.location);
    }
    if req.salary.is_some() {
        job.salary = trimmed(req.salary);
    }
    if req.experience.is_some() {
        job.experience = trimmed(req.experience);
    }
    if req.education.is_some() {
        job.education = trimmed(req.education);
    }
    if req.industry.is_some() {
        job.industry = trimmed(req.industry);
    }
    if req.job_level.is_some() {
        job.job_level = req.job_level;
    }
    if req.work_type.is_some() {
        job.work_type = req.work_type;
    }
    if req.responsibilities.is_some() {
        job.responsibilities = trimmed(req.responsibilities);
    }
    if req.requirements.is_some() {
        job.requirements = trimmed(req.requirements);
    }
    if req.benefits.is_some() {
        job.benefits = trimmed(req.benefits);
    }
    if req.company_description.is_some() {
        job.company_description = trimmed(req.company_description);
    }
    if req.cv_analysis_prompt.is_some() {
        job.cv_analysis_prompt = trimmed(req.cv_analysis_prompt);
    }
    if req.interview_prompt.is_some() {
        job.interview_prompt = trimmed(req.interview_prompt);
    }
    if req.ai_second_interview_prompt.is_some() {
        job.ai_second_interview_prompt = trimmed(req.ai_second_interview_prompt);
    }

    state.db.update_job(&job).await?;
    let job = state.db.get_job(&job_id).await?.ok_or_else(not_found)?;
    Ok(Json(job))
}

/// POST /jobs/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<String>,
    Json(req): Json<JobStatusRequest>,
) -> Result<Json<Job>, AppError> {
    let mut job = load_managed_job(&state, &auth, &job_id).await?;

    if !job.status.can_transition_to(req.status) {
        return Err(AppError::BadRequest(format!(
            "Cannot change job status from {} to {}",
            job.status, req.status
        )));
    }
    if req.status.is_public() && job.deadline_passed(Utc::now()) {
        return Err(AppError::BadRequest(
            "Extend the deadline before reopening this job".to_string(),
        ));
    }

    state.db.set_job_status(&job_id, req.status).await?;
    tracing::info!("Job {} moved from {} to {}", job_id, job.status, req.status);

    job.status = req.status;
    Ok(Json(job))
}

/// Soft delete: the posting is kept with status DELETED.
/// DELETE /jobs/:id
pub async fn delete_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    load_managed_job(&state, &auth, &job_id).await?;
    state.db.set_job_status(&job_id, JobStatus::Deleted).await?;

    tracing::info!("User {} deleted job {}", auth.user_id, job_id);
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /jobs/:id/apply
pub async fn apply(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if auth.user_type != UserType::Candidate {
        return Err(AppError::Forbidden("Only candidates can apply to jobs".to_string()));
    }

    let job = load_visible_job(&state, Some(&auth), &job_id).await?;
    if job.deadline_passed(Utc::now()) {
        return Err(AppError::BadRequest("The application deadline has passed".to_string()));
    }

    let applicants = state
        .db
        .increment_job_applicants(&job_id)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!("Candidate {} applied to job {}", auth.user_id, job_id);
    Ok(Json(serde_json::json!({ "success": true, "applicants": applicants })))
}

/// GET /companies/:id/jobs/stats
pub async fn job_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(company_id): Path<String>,
) -> Result<Json<JobStats>, AppError> {
    auth.require_company_access(&company_id)?;
    load_company(&state, &company_id).await?;

    let by_status = state.db.job_status_counts(&company_id).await?;
    let (views, applicants) = state.db.job_totals(&company_id).await?;
    let total = by_status.iter().map(|entry| entry.count).sum();

    Ok(Json(JobStats {
        by_status,
        total,
        views,
        applicants,
    }))
}
