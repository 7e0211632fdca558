use anyhow::Result;
use chrono::Utc;

use super::{Address, Company, Database};

impl Database {
    // Company operations
    pub async fn create_company(&self, company: &Company) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO companies (id, name, description, email, phone, website, industry,
                                   number_of_employees, subscription, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(&company.description)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.website)
        .bind(company.industry)
        .bind(company.number_of_employees)
        .bind(company.subscription)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_company(&self, id: &str) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(companies)
    }

    /// Writes every mutable column of `company` and bumps `updated_at`.
    pub async fn update_company(&self, company: &Company) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE companies SET
                name = ?, description = ?, email = ?, phone = ?, website = ?, industry = ?,
                number_of_employees = ?, subscription = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&company.name)
        .bind(&company.description)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.website)
        .bind(company.industry)
        .bind(company.number_of_employees)
        .bind(company.subscription)
        .bind(Utc::now())
        .bind(&company.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cascades to the address, invitations and jobs; members are detached.
    pub async fn delete_company(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM companies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Address operations
    /// A company has at most one address; an existing one keeps its id.
    pub async fn upsert_address(&self, address: &Address) -> Result<Address> {
        let stored = sqlx::query_as::<_, Address>(
            r#"
            INSERT INTO addresses (id, street, city, country, company_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(company_id) DO UPDATE SET
                street = excluded.street,
                city = excluded.city,
                country = excluded.country,
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(&address.id)
        .bind(&address.street)
        .bind(&address.city)
        .bind(address.country)
        .bind(&address.company_id)
        .bind(address.created_at)
        .bind(address.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    pub async fn get_company_address(&self, company_id: &str) -> Result<Option<Address>> {
        let address = sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE company_id = ?")
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(address)
    }

    pub async fn delete_company_address(&self, company_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE company_id = ?")
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Invitation, Job, User};
    use chrono::Duration;
    use shared::{Country, Industry, JobType, Subscription, UserType};

    #[tokio::test]
    async fn test_company_crud() {
        let db = Database::in_memory().await.unwrap();
        let mut company = Company::new("Acme".to_string());
        company.industry = Some(Industry::Technology);
        db.create_company(&company).await.unwrap();

        let stored = db.get_company(&company.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Acme");
        assert_eq!(stored.subscription, Subscription::Free);
        assert_eq!(stored.industry, Some(Industry::Technology));

        company.subscription = Subscription::Pro;
        company.number_of_employees = Some(42);
        assert!(db.update_company(&company).await.unwrap());

        let stored = db.get_company(&company.id).await.unwrap().unwrap();
        assert_eq!(stored.subscription, Subscription::Pro);
        assert_eq!(stored.number_of_employees, Some(42));

        assert!(db.delete_company(&company.id).await.unwrap());
        assert!(db.get_company(&company.id).await.unwrap().is_none());
        assert!(!db.delete_company(&company.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_companies_sorted_by_name() {
        let db = Database::in_memory().await.unwrap();
        for name in ["Zenith", "Acme", "Medina Labs"] {
            db.create_company(&Company::new(name.to_string())).await.unwrap();
        }

        let names: Vec<_> = db
            .list_companies()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Acme", "Medina Labs", "Zenith"]);
    }

    #[tokio::test]
    async fn test_address_is_one_per_company() {
        let db = Database::in_memory().await.unwrap();
        let company = Company::new("Acme".to_string());
        db.create_company(&company).await.unwrap();

        let first = db
            .upsert_address(&Address::new(company.id.clone(), "Dubai".to_string(), Country::Ae))
            .await
            .unwrap();

        let mut replacement = Address::new(company.id.clone(), "Riyadh".to_string(), Country::Sa);
        replacement.street = Some("King Fahd Rd".to_string());
        let second = db.upsert_address(&replacement).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.city, "Riyadh");
        assert_eq!(second.country, Country::Sa);

        let stored = db.get_company_address(&company.id).await.unwrap().unwrap();
        assert_eq!(stored.street.as_deref(), Some("King Fahd Rd"));

        assert!(db.delete_company_address(&company.id).await.unwrap());
        assert!(db.get_company_address(&company.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_address_requires_existing_company() {
        let db = Database::in_memory().await.unwrap();
        let result = db
            .upsert_address(&Address::new("missing".to_string(), "Doha".to_string(), Country::Qa))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_company_cascades_and_detaches_users() {
        let db = Database::in_memory().await.unwrap();
        let company = Company::new("Acme".to_string());
        db.create_company(&company).await.unwrap();

        db.upsert_address(&Address::new(company.id.clone(), "Dubai".to_string(), Country::Ae))
            .await
            .unwrap();

        let invitation = Invitation::new("CODE1234".to_string(), company.id.clone(), Utc::now() + Duration::days(1));
        db.create_invitation(&invitation).await.unwrap();

        let job = Job::new(company.id.clone(), "Engineer".to_string(), "Rust".to_string(), JobType::FullTime);
        db.create_job(&job).await.unwrap();

        let mut member = User::new(UserType::Company, "Omar".to_string());
        member.company_id = Some(company.id.clone());
        db.create_user(&member).await.unwrap();

        assert!(db.delete_company(&company.id).await.unwrap());

        assert!(db.get_company_address(&company.id).await.unwrap().is_none());
        assert!(db.get_invitation_by_code("CODE1234").await.unwrap().is_none());
        assert!(db.get_job(&job.id).await.unwrap().is_none());

        let member = db.get_user_by_id(&member.id).await.unwrap().unwrap();
        assert_eq!(member.company_id, None);
    }
}
