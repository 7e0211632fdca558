use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{JobLevel, JobStatus, JobStatusCount, JobType, WorkType};
use sqlx::{types::Json, QueryBuilder, Sqlite};

use super::{Database, Job, ScreeningQuestion};

/// Filter for [`Database::list_jobs`]. `statuses` must not be empty; callers
/// decide which statuses a viewer may see.
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub company_id: Option<String>,
    pub statuses: Vec<JobStatus>,
    pub job_type: Option<JobType>,
    pub work_type: Option<WorkType>,
    pub job_level: Option<JobLevel>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            company_id: None,
            statuses: vec![JobStatus::Active],
            job_type: None,
            work_type: None,
            job_level: None,
            search: None,
            limit: shared::DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

/// `%term%` LIKE pattern with the LIKE wildcards in `term` escaped by `\`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Database {
    // Job operations
    pub async fn create_job(&self, job: &Job) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, title, department, location, salary, job_type, deadline, description,
                responsibilities, requirements, benefits, company_description, skills,
                experience, education, job_level, work_type, industry, status, company_id,
                cv_analysis_prompt, interview_prompt, ai_second_interview_prompt,
                applicants, views, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.title)
        .bind(&job.department)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(job.job_type)
        .bind(job.deadline)
        .bind(&job.description)
        .bind(&job.responsibilities)
        .bind(&job.requirements)
        .bind(&job.benefits)
        .bind(&job.company_description)
        .bind(&job.skills)
        .bind(&job.experience)
        .bind(&job.education)
        .bind(job.job_level)
        .bind(job.work_type)
        .bind(&job.industry)
        .bind(job.status)
        .bind(&job.company_id)
        .bind(&job.cv_analysis_prompt)
        .bind(&job.interview_prompt)
        .bind(&job.ai_second_interview_prompt)
        .bind(job.applicants)
        .bind(job.views)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Newest first.
    pub async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM jobs WHERE status IN (");
        let mut statuses = query.separated(", ");
        for status in &filter.statuses {
            statuses.push_bind(*status);
        }
        statuses.push_unseparated(")");

        if let Some(company_id) = &filter.company_id {
            query.push(" AND company_id = ").push_bind(company_id.clone());
        }
        if let Some(job_type) = filter.job_type {
            query.push(" AND job_type = ").push_bind(job_type);
        }
        if let Some(work_type) = filter.work_type {
            query.push(" AND work_type = ").push_bind(work_type);
        }
        if let Some(job_level) = filter.job_level {
            query.push(" AND job_level = ").push_bind(job_level);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            query
                .push(" AND (lower(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(description) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        query
            .push(" ORDER BY created_at DESC, id ASC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let jobs = query.build_query_as::<Job>().fetch_all(&self.pool).await?;
        Ok(jobs)
    }

    /// Writes every editable column of `job`. Status and counters have their
    /// own operations and are left untouched.
    pub async fn update_job(&self, job: &Job) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                title = ?, department = ?, location = ?, salary = ?, job_type = ?, deadline = ?,
                description = ?, responsibilities = ?, requirements = ?, benefits = ?,
                company_description = ?, skills = ?, experience = ?, education = ?,
                job_level = ?, work_type = ?, industry = ?, cv_analysis_prompt = ?,
                interview_prompt = ?, ai_second_interview_prompt = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&job.title)
        .bind(&job.department)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(job.job_type)
        .bind(job.deadline)
        .bind(&job.description)
        .bind(&job.responsibilities)
        .bind(&job.requirements)
        .bind(&job.benefits)
        .bind(&job.company_description)
        .bind(&job.skills)
        .bind(&job.experience)
        .bind(&job.education)
        .bind(job.job_level)
        .bind(job.work_type)
        .bind(&job.industry)
        .bind(&job.cv_analysis_prompt)
        .bind(&job.interview_prompt)
        .bind(&job.ai_second_interview_prompt)
        .bind(Utc::now())
        .bind(&job.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_job_status(&self, id: &str, status: JobStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_job_views(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE jobs SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Count an application against an active job. Returns the new applicant
    /// count, or None if the job is missing or not active.
    pub async fn increment_job_applicants(&self, id: &str) -> Result<Option<i64>> {
        let applicants = sqlx::query_scalar::<_, i64>(
            "UPDATE jobs SET applicants = applicants + 1 WHERE id = ? AND status = ? RETURNING applicants",
        )
        .bind(id)
        .bind(JobStatus::Active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(applicants)
    }

    pub async fn job_status_counts(&self, company_id: &str) -> Result<Vec<JobStatusCount>> {
        let rows = sqlx::query_as::<_, (JobStatus, i64)>(
            "SELECT status, COUNT(*) FROM jobs WHERE company_id = ? GROUP BY status ORDER BY status",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| JobStatusCount { status, count })
            .collect())
    }

    /// Total (views, applicants) over a company's jobs that are not deleted.
    pub async fn job_totals(&self, company_id: &str) -> Result<(i64, i64)> {
        let totals = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COALESCE(SUM(views), 0), COALESCE(SUM(applicants), 0)
            FROM jobs WHERE company_id = ? AND status != ?
            "#,
        )
        .bind(company_id)
        .bind(JobStatus::Deleted)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    /// Move active jobs whose deadline has passed to expired.
    pub async fn expire_overdue_jobs(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = ?, updated_at = ?
            WHERE status = ? AND deadline IS NOT NULL AND deadline <= ?
            "#,
        )
        .bind(JobStatus::Expired)
        .bind(now)
        .bind(JobStatus::Active)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // Screening question operations
    pub async fn create_question(&self, question: &ScreeningQuestion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO screening_questions (id, question, question_type, options, required, job_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&question.id)
        .bind(&question.question)
        .bind(question.question_type)
        .bind(&question.options)
        .bind(question.required)
        .bind(&question.job_id)
        .bind(question.created_at)
        .bind(question.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_question(&self, id: &str) -> Result<Option<ScreeningQuestion>> {
        let question =
            sqlx::query_as::<_, ScreeningQuestion>("SELECT * FROM screening_questions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(question)
    }

    /// In creation order.
    pub async fn list_job_questions(&self, job_id: &str) -> Result<Vec<ScreeningQuestion>> {
        let questions = sqlx::query_as::<_, ScreeningQuestion>(
            "SELECT * FROM screening_questions WHERE job_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn update_question(&self, question: &ScreeningQuestion) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE screening_questions SET question = ?, question_type = ?, options = ?, required = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&question.question)
        .bind(question.question_type)
        .bind(&question.options)
        .bind(question.required)
        .bind(Utc::now())
        .bind(&question.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_question(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM screening_questions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Wrap a list for storage in a JSON text column.
pub fn json_list(items: Vec<String>) -> Json<Vec<String>> {
    Json(items.into_iter().map(|item| item.trim().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Company;
    use chrono::Duration;
    use shared::QuestionType;

    async fn setup() -> (Database, Company) {
        let db = Database::in_memory().await.unwrap();
        let company = Company::new("Acme".to_string());
        db.create_company(&company).await.unwrap();
        (db, company)
    }

    fn job(company: &Company, title: &str, status: JobStatus) -> Job {
        let mut job = Job::new(
            company.id.clone(),
            title.to_string(),
            format!("{} at Acme", title),
            JobType::FullTime,
        );
        job.status = status;
        job
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Rust"), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }

    #[tokio::test]
    async fn test_job_roundtrip_keeps_lists_and_enums() {
        let (db, company) = setup().await;
        let mut posting = job(&company, "Backend Engineer", JobStatus::Draft);
        posting.skills = json_list(vec!["rust".to_string(), " sql ".to_string()]);
        posting.work_type = Some(WorkType::Hybrid);
        posting.job_level = Some(JobLevel::Senior);
        posting.deadline = Some(Utc::now() + Duration::days(30));
        db.create_job(&posting).await.unwrap();

        let stored = db.get_job(&posting.id).await.unwrap().unwrap();
        assert_eq!(stored.skills.0, vec!["rust", "sql"]);
        assert_eq!(stored.work_type, Some(WorkType::Hybrid));
        assert_eq!(stored.job_level, Some(JobLevel::Senior));
        assert_eq!(stored.status, JobStatus::Draft);
        assert_eq!(stored.views, 0);
        assert!(stored.deadline.is_some());
    }

    #[tokio::test]
    async fn test_list_jobs_filters() {
        let (db, company) = setup().await;
        let other = Company::new("Globex".to_string());
        db.create_company(&other).await.unwrap();

        let mut remote = job(&company, "Rust Engineer", JobStatus::Active);
        remote.work_type = Some(WorkType::Remote);
        db.create_job(&remote).await.unwrap();
        db.create_job(&job(&company, "Draft Designer", JobStatus::Draft)).await.unwrap();
        db.create_job(&job(&company, "Removed Role", JobStatus::Deleted)).await.unwrap();
        db.create_job(&job(&other, "Data Analyst", JobStatus::Active)).await.unwrap();

        let public = db.list_jobs(&JobFilter::default()).await.unwrap();
        assert_eq!(public.len(), 2);

        let acme = db
            .list_jobs(&JobFilter {
                company_id: Some(company.id.clone()),
                statuses: vec![JobStatus::Active, JobStatus::Draft],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(acme.len(), 2);
        assert!(acme.iter().all(|j| j.status != JobStatus::Deleted));

        let by_work_type = db
            .list_jobs(&JobFilter {
                work_type: Some(WorkType::Remote),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_work_type.len(), 1);
        assert_eq!(by_work_type[0].id, remote.id);

        let searched = db
            .list_jobs(&JobFilter {
                search: Some("ANALYST".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].title, "Data Analyst");
    }

    #[tokio::test]
    async fn test_list_jobs_pagination() {
        let (db, company) = setup().await;
        for i in 0..5 {
            db.create_job(&job(&company, &format!("Role {}", i), JobStatus::Active))
                .await
                .unwrap();
        }

        let first = db
            .list_jobs(&JobFilter { limit: 2, ..Default::default() })
            .await
            .unwrap();
        let rest = db
            .list_jobs(&JobFilter { limit: 10, offset: 2, ..Default::default() })
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 3);
        assert!(first.iter().all(|j| rest.iter().all(|r| r.id != j.id)));
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row() {
        let (db, company) = setup().await;
        let posting = job(&company, "Engineer", JobStatus::Active);
        db.create_job(&posting).await.unwrap();

        assert!(db.set_job_status(&posting.id, JobStatus::Deleted).await.unwrap());

        let stored = db.get_job(&posting.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Deleted);
        assert!(db.list_jobs(&JobFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_job_leaves_status_and_counters() {
        let (db, company) = setup().await;
        let mut posting = job(&company, "Engineer", JobStatus::Active);
        db.create_job(&posting).await.unwrap();
        db.increment_job_views(&posting.id).await.unwrap();

        posting.title = "Senior Engineer".to_string();
        posting.status = JobStatus::Closed;
        assert!(db.update_job(&posting).await.unwrap());

        let stored = db.get_job(&posting.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Senior Engineer");
        assert_eq!(stored.status, JobStatus::Active);
        assert_eq!(stored.views, 1);
    }

    #[tokio::test]
    async fn test_applicants_only_counted_for_active_jobs() {
        let (db, company) = setup().await;
        let active = job(&company, "Engineer", JobStatus::Active);
        let paused = job(&company, "Designer", JobStatus::Paused);
        db.create_job(&active).await.unwrap();
        db.create_job(&paused).await.unwrap();

        assert_eq!(db.increment_job_applicants(&active.id).await.unwrap(), Some(1));
        assert_eq!(db.increment_job_applicants(&active.id).await.unwrap(), Some(2));
        assert_eq!(db.increment_job_applicants(&paused.id).await.unwrap(), None);
        assert_eq!(db.increment_job_applicants("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_status_counts_and_totals() {
        let (db, company) = setup().await;
        let a = job(&company, "A", JobStatus::Active);
        let b = job(&company, "B", JobStatus::Active);
        let deleted = job(&company, "C", JobStatus::Deleted);
        db.create_job(&a).await.unwrap();
        db.create_job(&b).await.unwrap();
        db.create_job(&deleted).await.unwrap();
        db.create_job(&job(&company, "D", JobStatus::Draft)).await.unwrap();

        db.increment_job_views(&a.id).await.unwrap();
        db.increment_job_views(&b.id).await.unwrap();
        db.increment_job_views(&deleted.id).await.unwrap();
        db.increment_job_applicants(&a.id).await.unwrap();

        let counts = db.job_status_counts(&company.id).await.unwrap();
        assert_eq!(
            counts,
            vec![
                JobStatusCount { status: JobStatus::Active, count: 2 },
                JobStatusCount { status: JobStatus::Deleted, count: 1 },
                JobStatusCount { status: JobStatus::Draft, count: 1 },
            ]
        );

        assert_eq!(db.job_totals(&company.id).await.unwrap(), (2, 1));
        assert_eq!(db.job_totals("missing").await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_expire_overdue_jobs() {
        let (db, company) = setup().await;
        let now = Utc::now();

        let mut overdue = job(&company, "Overdue", JobStatus::Active);
        overdue.deadline = Some(now - Duration::days(1));
        let mut open = job(&company, "Open", JobStatus::Active);
        open.deadline = Some(now + Duration::days(1));
        let mut paused = job(&company, "Paused", JobStatus::Paused);
        paused.deadline = Some(now - Duration::days(1));
        let no_deadline = job(&company, "Evergreen", JobStatus::Active);

        for posting in [&overdue, &open, &paused, &no_deadline] {
            db.create_job(posting).await.unwrap();
        }

        assert_eq!(db.expire_overdue_jobs(now).await.unwrap(), 1);
        assert_eq!(db.get_job(&overdue.id).await.unwrap().unwrap().status, JobStatus::Expired);
        assert_eq!(db.get_job(&open.id).await.unwrap().unwrap().status, JobStatus::Active);
        assert_eq!(db.get_job(&paused.id).await.unwrap().unwrap().status, JobStatus::Paused);
    }

    #[tokio::test]
    async fn test_question_crud_in_creation_order() {
        let (db, company) = setup().await;
        let posting = job(&company, "Engineer", JobStatus::Active);
        db.create_job(&posting).await.unwrap();

        let first = ScreeningQuestion::new(posting.id.clone(), "Can you relocate?".to_string(), QuestionType::YesNo);
        let mut second = ScreeningQuestion::new(
            posting.id.clone(),
            "Preferred office?".to_string(),
            QuestionType::MultipleChoice,
        );
        second.options = json_list(vec!["Dubai".to_string(), "Riyadh".to_string()]);
        db.create_question(&first).await.unwrap();
        db.create_question(&second).await.unwrap();

        let questions = db.list_job_questions(&posting.id).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, first.id);
        assert_eq!(questions[1].options.0, vec!["Dubai", "Riyadh"]);

        second.required = false;
        second.question = "Preferred office location?".to_string();
        assert!(db.update_question(&second).await.unwrap());
        let stored = db.get_question(&second.id).await.unwrap().unwrap();
        assert!(!stored.required);
        assert_eq!(stored.question, "Preferred office location?");

        assert!(db.delete_question(&first.id).await.unwrap());
        assert!(!db.delete_question(&first.id).await.unwrap());
        assert_eq!(db.list_job_questions(&posting.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_question_requires_job() {
        let (db, _) = setup().await;
        let question = ScreeningQuestion::new("missing".to_string(), "Why?".to_string(), QuestionType::Text);
        assert!(db.create_question(&question).await.is_err());
    }
}
