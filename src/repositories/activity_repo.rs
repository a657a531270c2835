// src/repositories/activity_repo.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{ActivityLog, NewActivity};

pub struct ActivityRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ActivityRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, entry: &NewActivity) -> Result<Uuid> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO activity_logs
                (id, org_id, actor_id, action, entity_type, entity_id, description,
                 meta_data, ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(entry.org_id)
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.description.as_deref())
        .bind(entry.meta_data.clone().map(Json))
        .bind(entry.ip_address.as_deref())
        .bind(entry.user_agent.as_deref())
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        Ok(id)
    }

    /// Most recent activity of one actor, newest first
    pub async fn list_for_actor(&self, actor_id: Uuid, limit: i64) -> Result<Vec<ActivityLog>> {
        let entries = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, org_id, actor_id, action, entity_type, entity_id, description,
                   meta_data, ip_address, user_agent, created_at
            FROM activity_logs
            WHERE actor_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(actor_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}
