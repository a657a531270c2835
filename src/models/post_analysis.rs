// src/models/post_analysis.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

text_enum! {
    PostStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

text_enum! {
    InteractionType {
        Comment => "COMMENT",
        Like => "LIKE",
    }
}

text_enum! {
    Classification {
        High => "high",
        Medium => "medium",
        Low => "low",
        Irrelevant => "irrelevant",
        Unclassified => "unclassified",
    }
}

/// A LinkedIn post being tracked and analyzed
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LinkedInPost {
    pub id: Uuid,
    pub post_url: String,
    pub author_name: Option<String>,
    pub post_content: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub status: PostStatus,
    pub apify_run_id: Option<String>,
    pub post_intent: Option<String>,
    pub total_comments: i64,
    pub total_likes: i64,
    pub ai_insights: Json<Value>,
    pub org_id: Uuid,
    pub persona_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A like or comment on a tracked post, with its scoring outcome
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostInteraction {
    pub id: Uuid,
    pub post_id: Uuid,
    pub interaction_type: InteractionType,
    /// Stable identity of the actor within a post: URN, profile URL or name
    pub actor_key: String,
    pub content: Option<String>,
    pub reacted_at: Option<DateTime<Utc>>,
    pub actor_name: Option<String>,
    pub actor_profile_url: Option<String>,
    pub actor_headline: Option<String>,
    pub actor_urn: Option<String>,
    pub relevance_score: i64,
    pub classification: Classification,
    pub profile_type: Option<String>,
    pub seniority_level: Option<String>,
    pub role_category: Option<String>,
    pub ai_insights: Json<Value>,
    pub lead_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Interaction row to upsert, keyed by (post_id, interaction_type, actor_key)
#[derive(Debug, Clone)]
pub struct InteractionUpsert {
    pub post_id: Uuid,
    pub interaction_type: InteractionType,
    pub actor_key: String,
    pub content: Option<String>,
    pub reacted_at: Option<DateTime<Utc>>,
    pub actor_name: Option<String>,
    pub actor_profile_url: Option<String>,
    pub actor_headline: Option<String>,
    pub actor_urn: Option<String>,
    pub relevance_score: i64,
    pub classification: Classification,
    pub profile_type: Option<String>,
    pub seniority_level: Option<String>,
    pub role_category: Option<String>,
    pub ai_insights: Value,
    pub lead_id: Option<Uuid>,
}

/// Aggregates written back on a post once its dataset is processed
#[derive(Debug, Clone, Default)]
pub struct PostSummary {
    pub author_name: Option<String>,
    pub post_content: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub post_intent: Option<String>,
    pub total_comments: i64,
    pub total_likes: i64,
    pub ai_insights: Value,
}
