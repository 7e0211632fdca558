use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{validate_question_options, CreateQuestionRequest, UpdateQuestionRequest};

use crate::{
    db::{json_list, ScreeningQuestion},
    error::AppError,
    routes::{
        auth::AuthUser,
        jobs::{load_managed_job, load_visible_job},
    },
    state::AppState,
};

/// Load a question together with a permission check against its job.
async fn load_managed_question(
    state: &AppState,
    auth: &AuthUser,
    question_id: &str,
) -> Result<ScreeningQuestion, AppError> {
    let question = state
        .db
        .get_question(question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    load_managed_job(state, auth, &question.job_id).await?;
    Ok(question)
}

/// POST /jobs/:id/questions
pub async fn create_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<String>,
    Json(req): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<ScreeningQuestion>), AppError> {
    req.validate()?;
    let job = load_managed_job(&state, &auth, &job_id).await?;

    let mut question = ScreeningQuestion::new(job.id, req.question.trim().to_string(), req.question_type);
    question.options = json_list(req.options);
    question.required = req.required.unwrap_or(true);
    state.db.create_question(&question).await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Questions are as visible as the job they belong to.
/// GET /jobs/:id/questions
pub async fn list_questions(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Path(job_id): Path<String>,
) -> Result<Json<Vec<ScreeningQuestion>>, AppError> {
    let job = load_visible_job(&state, auth.as_ref(), &job_id).await?;
    Ok(Json(state.db.list_job_questions(&job.id).await?))
}

/// PATCH /questions/:id
pub async fn update_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(question_id): Path<String>,
    Json(req): Json<UpdateQuestionRequest>,
) -> Result<Json<ScreeningQuestion>, AppError> {
    req.validate()?;
    let mut question = load_managed_question(&state, &auth, &question_id).await?;

    if let Some(text) = req.question {
        question.question = text.trim().to_string();
    }
    if let Some(question_type) = req.question_type {
        question.question_type = question_type;
        // Switching away from multiple choice drops the old options
        if !question_type.takes_options() && req.options.is_none() {
            question.options = json_list(Vec::new());
        }
    }
    if let Some(options) = req.options {
        question.options = json_list(options);
    }
    if let Some(required) = req.required {
        question.required = required;
    }

    validate_question_options(question.question_type, &question.options.0)?;

    state.db.update_question(&question).await?;
    Ok(Json(question))
}

/// DELETE /questions/:id
pub async fn delete_question(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(question_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    load_managed_question(&state, &auth, &question_id).await?;
    state.db.delete_question(&question_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
