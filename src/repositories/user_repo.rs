// src/repositories/user_repo.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::models::{MemberRole, OrganizationMember, User, UserSettingsUpdate, WorkingHoursSettings};

const USER_COLUMNS: &str = "id, email, full_name, avatar_url, is_verified, current_org_id, \
     language_preference, timezone, email_preferences, working_hours, created_at, updated_at, last_login_at";

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a user. Emails are stored lowercase.
    pub async fn create(
        &self,
        email: &str,
        full_name: Option<&str>,
        current_org_id: Option<Uuid>,
    ) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let email = email.trim().to_lowercase();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, is_verified, current_org_id, created_at, updated_at)
            VALUES (?, ?, ?, FALSE, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&email)
        .bind(full_name)
        .bind(current_org_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        info!("Created user {} ({})", email, id);

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", id))
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Option<User>> {
        sqlx::query(
            r#"
            UPDATE users
            SET full_name = COALESCE(?, full_name),
                avatar_url = COALESCE(?, avatar_url),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(full_name)
        .bind(avatar_url)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        self.find_by_id(id).await
    }

    pub async fn update_settings(
        &self,
        id: Uuid,
        update: &UserSettingsUpdate,
    ) -> Result<Option<User>> {
        sqlx::query(
            r#"
            UPDATE users
            SET language_preference = COALESCE(?, language_preference),
                timezone = COALESCE(?, timezone),
                email_preferences = COALESCE(?, email_preferences),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.language_preference.as_deref())
        .bind(update.timezone.as_deref())
        .bind(update.email_preferences.clone().map(Json))
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        self.find_by_id(id).await
    }

    pub async fn update_working_hours(
        &self,
        id: Uuid,
        hours: &WorkingHoursSettings,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET working_hours = ?, updated_at = ? WHERE id = ?")
            .bind(Json(hours))
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_current_org(&self, id: Uuid, org_id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET current_org_id = ?, updated_at = ? WHERE id = ?")
            .bind(org_id)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Role of the user in the given organization, if they are a member
    pub async fn membership_role(&self, user_id: Uuid, org_id: Uuid) -> Result<Option<MemberRole>> {
        let role = sqlx::query_scalar::<_, MemberRole>(
            "SELECT role FROM organization_members WHERE user_id = ? AND org_id = ?",
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }

    /// Add a member, or change the role of an existing one
    pub async fn add_member(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<OrganizationMember> {
        let member = sqlx::query_as::<_, OrganizationMember>(
            r#"
            INSERT INTO organization_members (id, org_id, user_id, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(org_id, user_id) DO UPDATE SET role = excluded.role
            RETURNING id, org_id, user_id, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(member)
    }
}
