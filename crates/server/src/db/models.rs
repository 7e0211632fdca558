use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    Country, Industry, InvitationStatus, JobLevel, JobStatus, JobType, QuestionType, Subscription,
    UserType, WorkType,
};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub user_type: UserType,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: String,
    pub is_active: bool,
    pub company_id: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(user_type: UserType, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            user_type,
            email: None,
            password_hash: None,
            name,
            is_active: true,
            company_id: None,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RefreshToken {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(token: String, user_id: String, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            token,
            user_id,
            expires_at,
            is_revoked: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<Industry>,
    pub number_of_employees: Option<i64>,
    pub subscription: Subscription,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name,
            description: None,
            email: None,
            phone: None,
            website: None,
            industry: None,
            number_of_employees: None,
            subscription: Subscription::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Address {
    pub id: String,
    pub street: Option<String>,
    pub city: String,
    pub country: Country,
    pub company_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    pub fn new(company_id: String, city: String, country: Country) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            street: None,
            city,
            country,
            company_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invitation {
    pub id: String,
    pub code: String,
    pub email: Option<String>,
    pub status: InvitationStatus,
    pub company_id: String,
    pub used_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    pub fn new(code: String, company_id: String, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            code,
            email: None,
            status: InvitationStatus::Pending,
            company_id,
            used_at: None,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub deadline: Option<DateTime<Utc>>,
    pub description: String,
    pub responsibilities: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub company_description: Option<String>,
    pub skills: Json<Vec<String>>,
    pub experience: Option<String>,
    pub education: Option<String>,
    pub job_level: Option<JobLevel>,
    pub work_type: Option<WorkType>,
    pub industry: Option<String>,
    pub status: JobStatus,
    pub company_id: String,
    pub cv_analysis_prompt: Option<String>,
    pub interview_prompt: Option<String>,
    pub ai_second_interview_prompt: Option<String>,
    pub applicants: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(company_id: String, title: String, description: String, job_type: JobType) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            title,
            department: None,
            location: None,
            salary: None,
            job_type,
            deadline: None,
            description,
            responsibilities: None,
            requirements: None,
            benefits: None,
            company_description: None,
            skills: Json(Vec::new()),
            experience: None,
            education: None,
            job_level: None,
            work_type: None,
            industry: None,
            status: JobStatus::default(),
            company_id,
            cv_analysis_prompt: None,
            interview_prompt: None,
            ai_second_interview_prompt: None,
            applicants: 0,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScreeningQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Json<Vec<String>>,
    pub required: bool,
    pub job_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScreeningQuestion {
    pub fn new(job_id: String, question: String, question_type: QuestionType) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            question,
            question_type,
            options: Json(Vec::new()),
            required: true,
            job_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let mut user = User::new(UserType::Candidate, "Jane".to_string());
        user.password_hash = Some("$argon2id$secret".to_string());

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["user_type"], "CANDIDATE");
        assert_eq!(json["is_active"], true);
    }

    #[test]
    fn test_refresh_token_usability() {
        let now = Utc::now();
        let mut token = RefreshToken::new("abc".to_string(), "user".to_string(), now + Duration::days(1));
        assert!(token.is_usable(now));
        assert!(!token.is_usable(now + Duration::days(2)));

        token.is_revoked = true;
        assert!(!token.is_usable(now));
    }

    #[test]
    fn test_job_serializes_type_and_skills() {
        let mut job = Job::new(
            "company".to_string(),
            "Engineer".to_string(),
            "Write Rust".to_string(),
            JobType::Contract,
        );
        job.skills = Json(vec!["rust".to_string()]);

        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["type"], "CONTRACT");
        assert_eq!(json["status"], "DRAFT");
        assert_eq!(json["skills"], serde_json::json!(["rust"]));
    }

    #[test]
    fn test_job_deadline() {
        let now = Utc::now();
        let mut job = Job::new("c".to_string(), "t".to_string(), "d".to_string(), JobType::FullTime);
        assert!(!job.deadline_passed(now));

        job.deadline = Some(now - Duration::hours(1));
        assert!(job.deadline_passed(now));

        job.deadline = Some(now + Duration::hours(1));
        assert!(!job.deadline_passed(now));
    }
}
