use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{Country, Industry, JobLevel, JobStatus, JobType, QuestionType, Subscription, UserType, WorkType};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Blank(&'static str),
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("{0}")]
    Invalid(String),
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    Ok(())
}

fn optional_text(field: &'static str, value: Option<&String>) -> Result<(), ValidationError> {
    match value {
        Some(v) => require_text(field, v),
        None => Ok(()),
    }
}

/// Trim and lowercase an email address, rejecting anything not shaped like `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    let invalid = || ValidationError::InvalidEmail(email.clone());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Options must be present (at least two, distinct, non-blank) exactly when the
/// question type takes them.
pub fn validate_question_options(
    question_type: QuestionType,
    options: &[String],
) -> Result<(), ValidationError> {
    if !question_type.takes_options() {
        if !options.is_empty() {
            return Err(ValidationError::Invalid(format!(
                "{} questions do not take options",
                question_type
            )));
        }
        return Ok(());
    }

    if options.len() < 2 {
        return Err(ValidationError::Invalid(
            "multiple choice questions need at least two options".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for option in options {
        let option = option.trim();
        if option.is_empty() {
            return Err(ValidationError::Blank("option"));
        }
        if !seen.insert(option.to_lowercase()) {
            return Err(ValidationError::Invalid(format!("duplicate option: {}", option)));
        }
    }
    Ok(())
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        normalize_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user_id: String,
    pub user_type: UserType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetUserActiveRequest {
    pub is_active: bool,
}

// ============================================================================
// Companies
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub industry: Option<Industry>,
    #[serde(default)]
    pub number_of_employees: Option<i64>,
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

impl CreateCompanyRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if let Some(email) = &self.email {
            normalize_email(email)?;
        }
        validate_employees(self.number_of_employees)
    }
}

fn validate_employees(count: Option<i64>) -> Result<(), ValidationError> {
    if count.is_some_and(|n| n < 0) {
        return Err(ValidationError::Invalid(
            "number_of_employees must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Partial update: absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<Industry>,
    pub number_of_employees: Option<i64>,
    pub subscription: Option<Subscription>,
}

impl UpdateCompanyRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        optional_text("name", self.name.as_ref())?;
        if let Some(email) = &self.email {
            normalize_email(email)?;
        }
        validate_employees(self.number_of_employees)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertAddressRequest {
    #[serde(default)]
    pub street: Option<String>,
    pub city: String,
    pub country: Country,
}

impl UpsertAddressRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("city", &self.city)?;
        optional_text("street", self.street.as_ref())
    }
}

// ============================================================================
// Invitations
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInvitationRequest {
    #[serde(default)]
    pub email: Option<String>,
}

impl CreateInvitationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = &self.email {
            normalize_email(email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptInvitationRequest {
    pub code: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl AcceptInvitationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("code", &self.code)?;
        require_text("name", &self.name)?;
        normalize_email(&self.email)?;
        validate_password(&self.password)
    }
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub description: String,
    #[serde(default)]
    pub responsibilities: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default)]
    pub company_description: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub job_level: Option<JobLevel>,
    #[serde(default)]
    pub work_type: Option<WorkType>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub cv_analysis_prompt: Option<String>,
    #[serde(default)]
    pub interview_prompt: Option<String>,
    #[serde(default)]
    pub ai_second_interview_prompt: Option<String>,
}

impl CreateJobRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        optional_text("company_description", self.company_description.as_ref())?;
        validate_skills(&self.skills)?;
        match self.status {
            None | Some(JobStatus::Draft) | Some(JobStatus::Active) => Ok(()),
            Some(other) => Err(ValidationError::Invalid(format!(
                "a new job cannot start as {}",
                other
            ))),
        }
    }
}

fn validate_skills(skills: &[String]) -> Result<(), ValidationError> {
    if skills.iter().any(|s| s.trim().is_empty()) {
        return Err(ValidationError::Blank("skill"));
    }
    Ok(())
}

/// Partial update: absent fields are left unchanged. Status changes go through
/// [`JobStatusRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub deadline: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub responsibilities: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub company_description: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub job_level: Option<JobLevel>,
    pub work_type: Option<WorkType>,
    pub industry: Option<String>,
    pub cv_analysis_prompt: Option<String>,
    pub interview_prompt: Option<String>,
    pub ai_second_interview_prompt: Option<String>,
}

impl UpdateJobRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        optional_text("title", self.title.as_ref())?;
        optional_text("description", self.description.as_ref())?;
        if let Some(skills) = &self.skills {
            validate_skills(skills)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusRequest {
    pub status: JobStatus,
}

/// Query string of `GET /jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobQuery {
    pub company_id: Option<String>,
    pub status: Option<JobStatus>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
    pub work_type: Option<WorkType>,
    pub job_level: Option<JobLevel>,
    /// Case-insensitive match against title and description
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl JobQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusCount {
    pub status: JobStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    pub by_status: Vec<JobStatusCount>,
    pub total: i64,
    pub views: i64,
    pub applicants: i64,
}

// ============================================================================
// Screening questions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionRequest {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: Option<bool>,
}

impl CreateQuestionRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("question", &self.question)?;
        validate_question_options(self.question_type, &self.options)
    }
}

/// Partial update. The merged type/options pair is validated by the caller
/// with [`validate_question_options`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQuestionRequest {
    pub question: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<String>>,
    pub required: Option<bool>,
}

impl UpdateQuestionRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        optional_text("question", self.question.as_ref())
    }
}
