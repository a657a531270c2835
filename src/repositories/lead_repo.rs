// src/repositories/lead_repo.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{Lead, LeadCandidate};

const LEAD_COLUMNS: &str =
    "id, org_id, full_name, headline, profile_url, source, score, created_at, updated_at";

pub struct LeadRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LeadRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a lead keyed by (org, profile URL). The best score seen is kept.
    pub async fn upsert(&self, org_id: Uuid, candidate: &LeadCandidate) -> Result<Uuid> {
        let now = Utc::now();
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO leads (id, org_id, full_name, headline, profile_url, source, score, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(org_id, profile_url) DO UPDATE SET
                full_name = COALESCE(excluded.full_name, leads.full_name),
                headline = COALESCE(excluded.headline, leads.headline),
                score = MAX(leads.score, excluded.score),
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(candidate.full_name.as_deref())
        .bind(candidate.headline.as_deref())
        .bind(&candidate.profile_url)
        .bind(&candidate.source)
        .bind(candidate.score)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    pub async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Lead>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM leads WHERE id IN (", LEAD_COLUMNS));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let leads = builder.build_query_as::<Lead>().fetch_all(self.pool).await?;
        Ok(leads)
    }
}
