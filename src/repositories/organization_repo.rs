// src/repositories/organization_repo.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::models::{Organization, OrganizationPatch};

const ORG_COLUMNS: &str =
    "id, name, website, industry, size, description, product_description, created_at, updated_at";

pub struct OrganizationRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrganizationRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, product_description: Option<&str>) -> Result<Organization> {
        let now = Utc::now();
        let org = sqlx::query_as::<_, Organization>(&format!(
            r#"
            INSERT INTO organizations (id, name, product_description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            ORG_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(product_description)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        info!("Created organization: {} ({})", org.name, org.id);
        Ok(org)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {} FROM organizations WHERE id = ?",
            ORG_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(org)
    }

    pub async fn list(&self) -> Result<Vec<Organization>> {
        let orgs = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {} FROM organizations ORDER BY name ASC",
            ORG_COLUMNS
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(orgs)
    }

    /// Apply a partial update. Returns None when the organization does not exist.
    pub async fn update(&self, id: Uuid, patch: &OrganizationPatch) -> Result<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            r#"
            UPDATE organizations
            SET name = COALESCE(?, name),
                website = COALESCE(?, website),
                industry = COALESCE(?, industry),
                size = COALESCE(?, size),
                description = COALESCE(?, description),
                product_description = COALESCE(?, product_description),
                updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            ORG_COLUMNS
        ))
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.website.as_deref())
        .bind(patch.industry.as_deref())
        .bind(patch.size.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.product_description.as_deref())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(org)
    }
}
