use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::path::Path;
#[cfg(test)]
use std::str::FromStr;

mod companies;
mod invitations;
mod jobs;
mod models;
mod users;

pub use jobs::{json_list, JobFilter};
pub use models::*;

use shared::{
    Country, Industry, InvitationStatus, JobLevel, JobStatus, JobType, QuestionType, Subscription,
    UserType, WorkType,
};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self> {
        // Ensure the directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Fresh migrated database living in a single in-memory connection.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<()> {
        let statements = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS companies (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    description TEXT,
                    email TEXT,
                    phone TEXT,
                    website TEXT,
                    industry TEXT {industry},
                    number_of_employees INTEGER CHECK (number_of_employees >= 0),
                    subscription TEXT NOT NULL DEFAULT 'FREE' {subscription},
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                industry = check_in("industry", Industry::NAMES),
                subscription = check_in("subscription", Subscription::NAMES),
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    user_type TEXT NOT NULL {user_type},
                    email TEXT UNIQUE,
                    password_hash TEXT,
                    name TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    company_id TEXT REFERENCES companies(id) ON DELETE SET NULL,
                    phone TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                user_type = check_in("user_type", UserType::NAMES),
            ),
            r#"
            CREATE TABLE IF NOT EXISTS refresh_tokens (
                id TEXT PRIMARY KEY,
                token TEXT UNIQUE NOT NULL,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL,
                is_revoked INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#
            .to_string(),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS addresses (
                    id TEXT PRIMARY KEY,
                    street TEXT,
                    city TEXT NOT NULL,
                    country TEXT NOT NULL {country},
                    company_id TEXT UNIQUE NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                country = check_in("country", Country::NAMES),
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS invitations (
                    id TEXT PRIMARY KEY,
                    code TEXT UNIQUE NOT NULL,
                    email TEXT,
                    status TEXT NOT NULL DEFAULT 'PENDING' {status},
                    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                    used_at TEXT,
                    expires_at TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                status = check_in("status", InvitationStatus::NAMES),
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS jobs (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    department TEXT,
                    location TEXT,
                    salary TEXT,
                    job_type TEXT NOT NULL {job_type},
                    deadline TEXT,
                    description TEXT NOT NULL,
                    responsibilities TEXT,
                    requirements TEXT,
                    benefits TEXT,
                    company_description TEXT,
                    skills TEXT NOT NULL DEFAULT '[]',
                    experience TEXT,
                    education TEXT,
                    job_level TEXT {job_level},
                    work_type TEXT {work_type},
                    industry TEXT,
                    status TEXT NOT NULL DEFAULT 'DRAFT' {status},
                    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
                    cv_analysis_prompt TEXT,
                    interview_prompt TEXT,
                    ai_second_interview_prompt TEXT,
                    applicants INTEGER NOT NULL DEFAULT 0,
                    views INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                job_type = check_in("job_type", JobType::NAMES),
                job_level = check_in("job_level", JobLevel::NAMES),
                work_type = check_in("work_type", WorkType::NAMES),
                status = check_in("status", JobStatus::NAMES),
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS screening_questions (
                    id TEXT PRIMARY KEY,
                    question TEXT NOT NULL,
                    question_type TEXT NOT NULL {question_type},
                    options TEXT NOT NULL DEFAULT '[]',
                    required INTEGER NOT NULL DEFAULT 1,
                    job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
                question_type = check_in("question_type", QuestionType::NAMES),
            ),
            "CREATE INDEX IF NOT EXISTS idx_users_company_id ON users(company_id)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens(user_id)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_invitations_company_id ON invitations(company_id)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_jobs_company_status ON jobs(company_id, status)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_jobs_status_created ON jobs(status, created_at)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_screening_questions_job_id ON screening_questions(job_id)".to_string(),
        ];

        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

/// `CHECK` clause restricting a column to the storage names of a closed enum.
fn check_in(column: &str, names: &[&str]) -> String {
    let values = names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CHECK ({} IN ({}))", column, values)
}
