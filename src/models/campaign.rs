// src/models/campaign.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

text_enum! {
    CampaignStatus {
        Draft => "draft",
        Active => "active",
        Running => "running",
        Paused => "paused",
        Completed => "completed",
    }
}

text_enum! {
    /// Outreach channel. `social` is LinkedIn.
    CampaignType {
        Social => "social",
        Email => "email",
        AiCall => "ai_call",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub campaign_type: CampaignType,
    pub status: CampaignStatus,
    pub leads_count: i64,
    pub qualified_leads_count: i64,
    pub contacted_count: i64,
    pub replied_count: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub last_resumed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Apply a status transition and the timestamps that go with it
    pub fn transition(&mut self, status: CampaignStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;

        match status {
            CampaignStatus::Active => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
                self.paused_at = None;
                self.last_resumed_at = Some(now);
            }
            CampaignStatus::Paused => self.paused_at = Some(now),
            CampaignStatus::Completed => self.completed_at = Some(now),
            CampaignStatus::Draft | CampaignStatus::Running => {}
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    #[serde(rename = "type")]
    pub campaign_type: CampaignType,
    #[serde(default)]
    pub status: Option<CampaignStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CampaignStats {
    pub campaign_id: Uuid,
    pub leads_count: i64,
    pub qualified_leads_count: i64,
    pub contacted_count: i64,
    pub replied_count: i64,
    pub status: CampaignStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Campaign> for CampaignStats {
    fn from(campaign: &Campaign) -> Self {
        Self {
            campaign_id: campaign.id,
            leads_count: campaign.leads_count,
            qualified_leads_count: campaign.qualified_leads_count,
            contacted_count: campaign.contacted_count,
            replied_count: campaign.replied_count,
            status: campaign.status,
            started_at: campaign.started_at,
            completed_at: campaign.completed_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelCounts {
    pub linkedin: i64,
    pub email: i64,
    pub ai_call: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GlobalCampaignStats {
    pub active_campaigns: i64,
    pub total_contacted: i64,
    pub avg_reply_rate: f64,
    pub meetings_booked: i64,
    pub total_leads: i64,
    pub channels: ChannelCounts,
}

impl GlobalCampaignStats {
    /// Replied over contacted as a percentage, one decimal
    pub fn reply_rate(replied: i64, contacted: i64) -> f64 {
        if contacted > 0 {
            (replied as f64 / contacted as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        }
    }

    /// Rough estimate until meetings are tracked: 30% of replies
    pub fn estimated_meetings(replied: i64) -> i64 {
        replied * 3 / 10
    }
}
