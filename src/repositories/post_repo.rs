// src/repositories/post_repo.rs
use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::models::{InteractionUpsert, LinkedInPost, PostInteraction, PostStatus, PostSummary};

const POST_COLUMNS: &str = "id, post_url, author_name, post_content, posted_at, status, \
     apify_run_id, post_intent, total_comments, total_likes, ai_insights, org_id, persona_id, \
     created_at, updated_at";

const INTERACTION_COLUMNS: &str = "id, post_id, interaction_type, actor_key, content, reacted_at, \
     actor_name, actor_profile_url, actor_headline, actor_urn, relevance_score, classification, \
     profile_type, seniority_level, role_category, ai_insights, lead_id, created_at, updated_at";

pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_pending(
        &self,
        post_url: &str,
        org_id: Uuid,
        persona_id: Option<Uuid>,
    ) -> Result<LinkedInPost> {
        let now = Utc::now();
        let post = sqlx::query_as::<_, LinkedInPost>(&format!(
            r#"
            INSERT INTO linkedin_posts (id, post_url, status, ai_insights, org_id, persona_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(post_url.trim())
        .bind(PostStatus::Pending)
        .bind(Json(json!({})))
        .bind(org_id)
        .bind(persona_id)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(post)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LinkedInPost>> {
        let post = sqlx::query_as::<_, LinkedInPost>(&format!(
            "SELECT {} FROM linkedin_posts WHERE id = ?",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(post)
    }

    pub async fn find_by_run_id(&self, run_id: &str) -> Result<Option<LinkedInPost>> {
        let post = sqlx::query_as::<_, LinkedInPost>(&format!(
            "SELECT {} FROM linkedin_posts WHERE apify_run_id = ? ORDER BY created_at DESC LIMIT 1",
            POST_COLUMNS
        ))
        .bind(run_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(post)
    }

    /// Record the scraper run for a post and move it to `processing`
    pub async fn set_run(&self, id: Uuid, run_id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE linkedin_posts SET apify_run_id = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(run_id)
        .bind(PostStatus::Processing)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_status(&self, id: Uuid, status: PostStatus) -> Result<bool> {
        let result =
            sqlx::query("UPDATE linkedin_posts SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status)
                .bind(Utc::now())
                .bind(id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write the aggregates and mark the post `completed`
    pub async fn complete(&self, id: Uuid, summary: &PostSummary) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE linkedin_posts
            SET author_name = COALESCE(?, author_name),
                post_content = COALESCE(?, post_content),
                posted_at = COALESCE(?, posted_at),
                post_intent = ?,
                total_comments = ?,
                total_likes = ?,
                ai_insights = ?,
                status = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(summary.author_name.as_deref())
        .bind(summary.post_content.as_deref())
        .bind(summary.posted_at)
        .bind(summary.post_intent.as_deref())
        .bind(summary.total_comments)
        .bind(summary.total_likes)
        .bind(Json(&summary.ai_insights))
        .bind(PostStatus::Completed)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        info!(
            "Post {} completed: {} comments, {} likes",
            id, summary.total_comments, summary.total_likes
        );
        Ok(result.rows_affected() > 0)
    }

    /// Most recent posts of an organization
    pub async fn list_for_org(
        &self,
        org_id: Uuid,
        status: Option<PostStatus>,
        limit: i64,
    ) -> Result<Vec<LinkedInPost>> {
        let posts = sqlx::query_as::<_, LinkedInPost>(&format!(
            r#"
            SELECT {} FROM linkedin_posts
            WHERE org_id = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC
            LIMIT ?
            "#,
            POST_COLUMNS
        ))
        .bind(org_id)
        .bind(status)
        .bind(status)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(posts)
    }

    /// Interactions of a post, best scores first
    pub async fn interactions_for(&self, post_id: Uuid) -> Result<Vec<PostInteraction>> {
        let interactions = sqlx::query_as::<_, PostInteraction>(&format!(
            r#"
            SELECT {} FROM post_interactions
            WHERE post_id = ?
            ORDER BY relevance_score DESC, actor_key ASC
            "#,
            INTERACTION_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;

        Ok(interactions)
    }

    /// Insert or refresh an interaction keyed by (post, type, actor).
    /// The lead link follows the latest classification; the lead row itself is kept.
    pub async fn upsert_interaction(&self, row: &InteractionUpsert) -> Result<Uuid> {
        let now = Utc::now();
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO post_interactions
                (id, post_id, interaction_type, actor_key, content, reacted_at, actor_name,
                 actor_profile_url, actor_headline, actor_urn, relevance_score, classification,
                 profile_type, seniority_level, role_category, ai_insights, lead_id,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(post_id, interaction_type, actor_key) DO UPDATE SET
                content = excluded.content,
                reacted_at = COALESCE(excluded.reacted_at, post_interactions.reacted_at),
                actor_name = excluded.actor_name,
                actor_profile_url = excluded.actor_profile_url,
                actor_headline = excluded.actor_headline,
                actor_urn = excluded.actor_urn,
                relevance_score = excluded.relevance_score,
                classification = excluded.classification,
                profile_type = excluded.profile_type,
                seniority_level = excluded.seniority_level,
                role_category = excluded.role_category,
                ai_insights = excluded.ai_insights,
                lead_id = excluded.lead_id,
                updated_at = excluded.updated_at
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.post_id)
        .bind(row.interaction_type)
        .bind(&row.actor_key)
        .bind(row.content.as_deref())
        .bind(row.reacted_at)
        .bind(row.actor_name.as_deref())
        .bind(row.actor_profile_url.as_deref())
        .bind(row.actor_headline.as_deref())
        .bind(row.actor_urn.as_deref())
        .bind(row.relevance_score)
        .bind(row.classification)
        .bind(row.profile_type.as_deref())
        .bind(row.seniority_level.as_deref())
        .bind(row.role_category.as_deref())
        .bind(Json(&row.ai_insights))
        .bind(row.lead_id)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }
}
