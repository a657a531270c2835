// src/repositories/persona_repo.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{NewPersona, Persona};

pub struct PersonaRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PersonaRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, org_id: Uuid, persona: &NewPersona) -> Result<Persona> {
        let created = sqlx::query_as::<_, Persona>(
            r#"
            INSERT INTO personas (id, org_id, name, definition, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, org_id, name, definition, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(persona.name.trim())
        .bind(Json(&persona.definition))
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(created)
    }

    /// Persona scoped to an organization
    pub async fn find(&self, org_id: Uuid, id: Uuid) -> Result<Option<Persona>> {
        let persona = sqlx::query_as::<_, Persona>(
            "SELECT id, org_id, name, definition, created_at FROM personas WHERE id = ? AND org_id = ?",
        )
        .bind(id)
        .bind(org_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(persona)
    }

    pub async fn list(&self, org_id: Uuid) -> Result<Vec<Persona>> {
        let personas = sqlx::query_as::<_, Persona>(
            "SELECT id, org_id, name, definition, created_at FROM personas WHERE org_id = ? ORDER BY created_at ASC",
        )
        .bind(org_id)
        .fetch_all(self.pool)
        .await?;

        Ok(personas)
    }
}
