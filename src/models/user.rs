// src/models/user.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

use super::WorkingHoursSettings;

text_enum! {
    /// Role of a user inside one organization
    MemberRole {
        Owner => "owner",
        Admin => "admin",
        Member => "member",
    }
}

impl MemberRole {
    pub fn can_manage_organization(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub current_org_id: Option<Uuid>,
    pub language_preference: String,
    pub timezone: String,
    pub email_preferences: Option<Json<Value>>,
    pub working_hours: Option<Json<WorkingHoursSettings>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
    /// What the organization sells; fed to post relevance analysis
    pub product_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial organization update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
    pub product_description: Option<String>,
}

impl OrganizationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.website.is_none()
            && self.industry.is_none()
            && self.size.is_none()
            && self.description.is_none()
            && self.product_description.is_none()
    }

    /// Names of the fields this patch touches, for the activity log
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.website.is_some() {
            fields.push("website");
        }
        if self.industry.is_some() {
            fields.push("industry");
        }
        if self.size.is_some() {
            fields.push("size");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.product_description.is_some() {
            fields.push("product_description");
        }
        fields
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrganizationMember {
    pub id: Uuid,
    pub org_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub org_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: Option<String>,
    pub meta_data: Option<Json<Value>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Activity entry about to be recorded
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub org_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: Option<String>,
    pub meta_data: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewActivity {
    pub fn new(actor_id: Uuid, action: &str, entity_type: &str) -> Self {
        Self {
            org_id: None,
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: None,
            description: None,
            meta_data: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    pub fn with_entity(mut self, entity_id: Uuid) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_meta(mut self, meta_data: Value) -> Self {
        self.meta_data = Some(meta_data);
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}
