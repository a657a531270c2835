// src/services/user_service.rs
//! Profile, settings and organization operations for the signed-in user

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::core::{AppError, AppResult, Database};
use crate::models::{
    ActivityLog, MemberRole, NewActivity, Organization, OrganizationPatch, User, UserSettings,
    UserSettingsUpdate, WorkingHoursSettings,
};
use crate::repositories::{ActivityRepository, OrganizationRepository, UserRepository};

pub const DEFAULT_ACTIVITY_LIMIT: i64 = 50;
const MAX_ACTIVITY_LIMIT: i64 = 500;

/// Public view of a user together with their role in the current organization
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub current_org_id: Option<Uuid>,
    pub role: Option<MemberRole>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPage {
    pub items: Vec<ActivityLog>,
    pub total: usize,
}

#[derive(Clone)]
pub struct UserService {
    database: Database,
}

impl UserService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn profile(&self, user: &User) -> AppResult<UserProfile> {
        let role = match user.current_org_id {
            Some(org_id) => {
                UserRepository::new(self.database.pool())
                    .membership_role(user.id, org_id)
                    .await?
            }
            None => None,
        };

        Ok(UserProfile {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
            is_verified: user.is_verified,
            current_org_id: user.current_org_id,
            role,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        })
    }

    pub async fn update_profile(
        &self,
        user: &User,
        full_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> AppResult<UserProfile> {
        let updated = UserRepository::new(self.database.pool())
            .update_profile(user.id, full_name, avatar_url)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;
        self.profile(&updated).await
    }

    pub fn settings(user: &User) -> UserSettings {
        UserSettings {
            language_preference: user.language_preference.clone(),
            timezone: user.timezone.clone(),
            email_preferences: user
                .email_preferences
                .as_ref()
                .map(|prefs| prefs.0.clone())
                .unwrap_or_else(|| json!({})),
        }
    }

    /// Apply only the keys present in the patch
    pub async fn update_settings(
        &self,
        user: &User,
        update: &UserSettingsUpdate,
    ) -> AppResult<UserSettings> {
        if let Some(language) = &update.language_preference {
            if language.trim().is_empty() {
                return Err(AppError::InvalidInput(
                    "language_preference must not be empty".into(),
                ));
            }
        }
        if let Some(prefs) = &update.email_preferences {
            if !prefs.is_object() {
                return Err(AppError::InvalidInput(
                    "email_preferences must be an object".into(),
                ));
            }
        }

        let updated = UserRepository::new(self.database.pool())
            .update_settings(user.id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))?;
        Ok(Self::settings(&updated))
    }

    /// Stored working hours, or the default Monday-Friday 09:00-17:00 week
    pub fn working_hours(user: &User) -> WorkingHoursSettings {
        user.working_hours
            .as_ref()
            .map(|hours| hours.0.clone())
            .unwrap_or_default()
    }

    pub async fn update_working_hours(
        &self,
        user: &User,
        hours: WorkingHoursSettings,
    ) -> AppResult<WorkingHoursSettings> {
        let hours = hours.normalized();
        hours.validate().map_err(AppError::InvalidInput)?;

        let updated = UserRepository::new(self.database.pool())
            .update_working_hours(user.id, &hours)
            .await?;
        if !updated {
            return Err(AppError::NotFound("User".into()));
        }
        Ok(hours)
    }

    pub async fn activity(&self, user: &User, limit: Option<i64>) -> AppResult<ActivityPage> {
        let limit = limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT);
        let items = ActivityRepository::new(self.database.pool())
            .list_for_actor(user.id, limit)
            .await?;
        Ok(ActivityPage {
            total: items.len(),
            items,
        })
    }

    pub async fn get_organization(&self, org_id: Option<Uuid>) -> AppResult<Organization> {
        let org_id = org_id.ok_or_else(|| AppError::NotFound("Organization".into()))?;
        OrganizationRepository::new(self.database.pool())
            .find_by_id(org_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization".into()))
    }

    /// Only owners and admins may change the organization profile
    pub async fn update_organization(
        &self,
        org_id: Option<Uuid>,
        actor: &User,
        patch: &OrganizationPatch,
    ) -> AppResult<Organization> {
        let org = self.get_organization(org_id).await?;
        let pool = self.database.pool();

        let role = UserRepository::new(pool)
            .membership_role(actor.id, org.id)
            .await?;
        if !role.map(|r| r.can_manage_organization()).unwrap_or(false) {
            return Err(AppError::Forbidden(
                "Only owners and admins can update the organization".into(),
            ));
        }
        if patch.is_empty() {
            return Ok(org);
        }
        if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::InvalidInput("Organization name must not be empty".into()));
        }

        let updated = OrganizationRepository::new(pool)
            .update(org.id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization".into()))?;

        let fields = patch.changed_fields();
        ActivityRepository::new(pool)
            .record(
                &NewActivity::new(actor.id, "organization.updated", "organization")
                    .with_org(org.id)
                    .with_entity(org.id)
                    .with_description(format!("Updated organization profile: {}", fields.join(", ")))
                    .with_meta(json!({ "fields": fields })),
            )
            .await?;

        info!("Organization {} updated by {}", org.id, actor.email);
        Ok(updated)
    }
}
