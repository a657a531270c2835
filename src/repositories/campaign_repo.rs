// src/repositories/campaign_repo.rs
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Campaign, CampaignStats, CampaignStatus, CampaignType, ChannelCounts, GlobalCampaignStats,
    NewCampaign,
};

const CAMPAIGN_COLUMNS: &str = "id, org_id, name, campaign_type, status, leads_count, \
     qualified_leads_count, contacted_count, replied_count, started_at, paused_at, \
     last_resumed_at, completed_at, created_at, updated_at";

pub struct CampaignRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CampaignRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, org_id: Uuid, campaign: &NewCampaign) -> Result<Campaign> {
        let now = Utc::now();
        let created = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            INSERT INTO campaigns (id, org_id, name, campaign_type, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(campaign.name.trim())
        .bind(campaign.campaign_type)
        .bind(campaign.status.unwrap_or(CampaignStatus::Draft))
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        info!("Created campaign {} for org {}", created.id, org_id);
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Campaign>> {
        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {} FROM campaigns WHERE id = ?",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(campaign)
    }

    pub async fn list(&self, org_id: Uuid, status: Option<CampaignStatus>) -> Result<Vec<Campaign>> {
        let campaigns = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            SELECT {} FROM campaigns
            WHERE org_id = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC
            "#,
            CAMPAIGN_COLUMNS
        ))
        .bind(org_id)
        .bind(status)
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        Ok(campaigns)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update campaign status with the matching lifecycle timestamps
    pub async fn update_status(&self, id: Uuid, status: CampaignStatus) -> Result<Option<Campaign>> {
        let Some(mut campaign) = self.get(id).await? else {
            return Ok(None);
        };

        campaign.transition(status, Utc::now());

        sqlx::query(
            r#"
            UPDATE campaigns
            SET status = ?, started_at = ?, paused_at = ?, last_resumed_at = ?,
                completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(campaign.status)
        .bind(campaign.started_at)
        .bind(campaign.paused_at)
        .bind(campaign.last_resumed_at)
        .bind(campaign.completed_at)
        .bind(campaign.updated_at)
        .bind(id)
        .execute(self.pool)
        .await?;

        info!("Campaign {} moved to {}", id, status);
        Ok(Some(campaign))
    }

    /// Increment leads count for a campaign
    pub async fn increment_leads_count(&self, id: Uuid, count: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE campaigns SET leads_count = leads_count + ?, updated_at = ? WHERE id = ?",
        )
        .bind(count)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All active campaigns for an organization
    pub async fn get_active(&self, org_id: Uuid) -> Result<Vec<Campaign>> {
        self.list(org_id, Some(CampaignStatus::Active)).await
    }

    pub async fn get_stats(&self, id: Uuid) -> Result<Option<CampaignStats>> {
        Ok(self.get(id).await?.as_ref().map(CampaignStats::from))
    }

    /// Count campaigns, optionally narrowed by status and channel
    pub async fn count(
        &self,
        org_id: Uuid,
        status: Option<CampaignStatus>,
        campaign_type: Option<CampaignType>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM campaigns
            WHERE org_id = ?
              AND (? IS NULL OR status = ?)
              AND (? IS NULL OR campaign_type = ?)
            "#,
        )
        .bind(org_id)
        .bind(status)
        .bind(status)
        .bind(campaign_type)
        .bind(campaign_type)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_by_status(&self, org_id: Uuid, status: CampaignStatus) -> Result<i64> {
        self.count(org_id, Some(status), None).await
    }

    /// Aggregated stats across all campaigns of the organization
    pub async fn get_global_stats(&self, org_id: Uuid) -> Result<GlobalCampaignStats> {
        let active_campaigns = self.count_by_status(org_id, CampaignStatus::Active).await?;

        let (contacted, replied, total_leads) =
            sqlx::query_as::<_, (Option<i64>, Option<i64>, Option<i64>)>(
                r#"
                SELECT SUM(contacted_count), SUM(replied_count), SUM(leads_count)
                FROM campaigns
                WHERE org_id = ?
                "#,
            )
            .bind(org_id)
            .fetch_one(self.pool)
            .await?;

        let contacted = contacted.unwrap_or(0);
        let replied = replied.unwrap_or(0);

        Ok(GlobalCampaignStats {
            active_campaigns,
            total_contacted: contacted,
            avg_reply_rate: GlobalCampaignStats::reply_rate(replied, contacted),
            meetings_booked: GlobalCampaignStats::estimated_meetings(replied),
            total_leads: total_leads.unwrap_or(0),
            channels: ChannelCounts {
                linkedin: self.live_channel_count(org_id, CampaignType::Social).await?,
                email: self.live_channel_count(org_id, CampaignType::Email).await?,
                ai_call: self.live_channel_count(org_id, CampaignType::AiCall).await?,
            },
        })
    }

    /// Active plus running campaigns on one channel
    async fn live_channel_count(&self, org_id: Uuid, campaign_type: CampaignType) -> Result<i64> {
        let active = self
            .count(org_id, Some(CampaignStatus::Active), Some(campaign_type))
            .await?;
        let running = self
            .count(org_id, Some(CampaignStatus::Running), Some(campaign_type))
            .await?;
        Ok(active + running)
    }
}
