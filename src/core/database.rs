// src/core/database.rs
//! Database connection management and schema migrations

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS organizations (
        id BLOB PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        website TEXT,
        industry TEXT,
        size TEXT,
        description TEXT,
        product_description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY NOT NULL,
        email TEXT NOT NULL UNIQUE,
        full_name TEXT,
        avatar_url TEXT,
        is_verified BOOLEAN NOT NULL DEFAULT FALSE,
        current_org_id BLOB REFERENCES organizations(id),
        language_preference TEXT NOT NULL DEFAULT 'en',
        timezone TEXT NOT NULL DEFAULT 'UTC',
        email_preferences TEXT,
        working_hours TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_login_at TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS organization_members (
        id BLOB PRIMARY KEY NOT NULL,
        org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        role TEXT NOT NULL DEFAULT 'member',
        created_at TEXT NOT NULL,
        UNIQUE (org_id, user_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity_logs (
        id BLOB PRIMARY KEY NOT NULL,
        org_id BLOB,
        actor_id BLOB NOT NULL,
        action TEXT NOT NULL,
        entity_type TEXT NOT NULL,
        entity_id BLOB,
        description TEXT,
        meta_data TEXT,
        ip_address TEXT,
        user_agent TEXT,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS personas (
        id BLOB PRIMARY KEY NOT NULL,
        org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        definition TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS campaigns (
        id BLOB PRIMARY KEY NOT NULL,
        org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        campaign_type TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft',
        leads_count INTEGER NOT NULL DEFAULT 0,
        qualified_leads_count INTEGER NOT NULL DEFAULT 0,
        contacted_count INTEGER NOT NULL DEFAULT 0,
        replied_count INTEGER NOT NULL DEFAULT 0,
        started_at TEXT,
        paused_at TEXT,
        last_resumed_at TEXT,
        completed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leads (
        id BLOB PRIMARY KEY NOT NULL,
        org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        full_name TEXT,
        headline TEXT,
        profile_url TEXT NOT NULL,
        source TEXT NOT NULL,
        score INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (org_id, profile_url)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS linkedin_posts (
        id BLOB PRIMARY KEY NOT NULL,
        post_url TEXT NOT NULL,
        author_name TEXT,
        post_content TEXT,
        posted_at TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        apify_run_id TEXT,
        post_intent TEXT,
        total_comments INTEGER NOT NULL DEFAULT 0,
        total_likes INTEGER NOT NULL DEFAULT 0,
        ai_insights TEXT NOT NULL DEFAULT '{}',
        org_id BLOB NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
        persona_id BLOB REFERENCES personas(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS post_interactions (
        id BLOB PRIMARY KEY NOT NULL,
        post_id BLOB NOT NULL REFERENCES linkedin_posts(id) ON DELETE CASCADE,
        interaction_type TEXT NOT NULL,
        actor_key TEXT NOT NULL,
        content TEXT,
        reacted_at TEXT,
        actor_name TEXT,
        actor_profile_url TEXT,
        actor_headline TEXT,
        actor_urn TEXT,
        relevance_score INTEGER NOT NULL DEFAULT 0,
        classification TEXT NOT NULL DEFAULT 'unclassified',
        profile_type TEXT,
        seniority_level TEXT,
        role_category TEXT,
        ai_insights TEXT NOT NULL DEFAULT '{}',
        lead_id BLOB REFERENCES leads(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (post_id, interaction_type, actor_key)
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);",
    "CREATE INDEX IF NOT EXISTS idx_activity_actor ON activity_logs(actor_id, created_at);",
    "CREATE INDEX IF NOT EXISTS idx_campaigns_org ON campaigns(org_id, status);",
    "CREATE INDEX IF NOT EXISTS idx_posts_org ON linkedin_posts(org_id, created_at);",
    "CREATE INDEX IF NOT EXISTS idx_posts_run ON linkedin_posts(apify_run_id);",
    "CREATE INDEX IF NOT EXISTS idx_interactions_post ON post_interactions(post_id, relevance_score);",
    "CREATE INDEX IF NOT EXISTS idx_interactions_lead ON post_interactions(lead_id);",
];

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the SQLite file and run migrations
    pub async fn connect(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url).await.with_context(|| {
            format!("Failed to connect to database: {}", database_path.display())
        })?;

        info!("Database connection established: {}", database_path.display());

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs.
    /// A single long-lived connection keeps the schema alive.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations. Every statement is idempotent.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Database migration failed")?;
        }

        info!("Database migrations completed");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::in_memory().await.unwrap();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'campaigns', 'linkedin_posts', 'post_interactions')",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 4);
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("leadscope.db");

        let first = Database::connect(&path).await.unwrap();
        first.migrate().await.unwrap();
        drop(first);

        let second = Database::connect(&path).await;
        assert!(second.is_ok(), "Reopening failed: {:?}", second.err());
        assert!(path.exists());
    }
}
