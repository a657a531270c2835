// src/models/persona.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Target buyer profile used when evaluating interactions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonaDefinition {
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub seniority: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Persona {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub definition: Json<PersonaDefinition>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersona {
    pub name: String,
    #[serde(flatten)]
    pub definition: PersonaDefinition,
}
