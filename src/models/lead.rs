// src/models/lead.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub org_id: Uuid,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub profile_url: String,
    /// Where the lead came from, e.g. `linkedin_post`
    pub source: String,
    pub score: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A qualified actor about to be stored as a lead
#[derive(Debug, Clone)]
pub struct LeadCandidate {
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub profile_url: String,
    pub source: String,
    pub score: i64,
}
