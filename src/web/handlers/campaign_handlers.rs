// src/web/handlers/campaign_handlers.rs
use crate::auth::AuthenticatedUser;
use crate::core::{AppError, AppResult, Database};
use crate::models::{
    Campaign, CampaignStats, CampaignStatus, GlobalCampaignStats, NewActivity, NewCampaign,
};
use crate::repositories::{ActivityRepository, CampaignRepository};
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// Load a campaign of the caller's organization; other organizations' campaigns read as missing
async fn owned_campaign(
    repo: &CampaignRepository<'_>,
    auth: &AuthenticatedUser,
    id: Uuid,
) -> AppResult<Campaign> {
    let org_id = auth.org_id()?;
    match repo.get(id).await? {
        Some(campaign) if campaign.org_id == org_id => Ok(campaign),
        _ => Err(AppError::NotFound("Campaign".into())),
    }
}

pub async fn list_campaigns_handler(
    status: Option<&str>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Vec<Campaign>>> {
    let org_id = auth.org_id()?;
    let status = status
        .map(|s| s.parse::<CampaignStatus>())
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let repo = CampaignRepository::new(database.pool());
    let campaigns = match status {
        Some(CampaignStatus::Active) => repo.get_active(org_id).await?,
        other => repo.list(org_id, other).await?,
    };

    Ok(Json(DataResponse::success(
        format!("{} campaigns", campaigns.len()),
        campaigns,
        None,
    )))
}

pub async fn create_campaign_handler(
    request: Json<StandardRequest<NewCampaign>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Campaign>> {
    let conversation_id = request.conversation_id();
    let org_id = auth.org_id()?;

    if request.data.name.trim().is_empty() {
        return Err(ApiError::from(AppError::InvalidInput(
            "Campaign name must not be empty".into(),
        ))
        .with_conversation(conversation_id));
    }

    let campaign = CampaignRepository::new(database.pool())
        .create(org_id, &request.data)
        .await?;

    ActivityRepository::new(database.pool())
        .record(
            &NewActivity::new(auth.id(), "campaign.created", "campaign")
                .with_org(org_id)
                .with_entity(campaign.id)
                .with_description(format!("Created campaign {}", campaign.name))
                .with_meta(json!({ "type": campaign.campaign_type })),
        )
        .await?;

    Ok(Json(DataResponse::success(
        format!("Campaign '{}' created", campaign.name),
        campaign,
        conversation_id,
    )))
}

pub async fn get_campaign_handler(
    id: Uuid,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Campaign>> {
    let repo = CampaignRepository::new(database.pool());
    let campaign = owned_campaign(&repo, &auth, id).await?;

    Ok(Json(DataResponse::success(
        "Campaign".to_string(),
        campaign,
        None,
    )))
}

pub async fn delete_campaign_handler(
    id: Uuid,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<ActionResponse> {
    let repo = CampaignRepository::new(database.pool());
    let campaign = owned_campaign(&repo, &auth, id).await?;

    if !repo.delete(campaign.id).await? {
        return Err(AppError::NotFound("Campaign".into()).into());
    }

    ActivityRepository::new(database.pool())
        .record(
            &NewActivity::new(auth.id(), "campaign.deleted", "campaign")
                .with_org(campaign.org_id)
                .with_entity(campaign.id)
                .with_description(format!("Deleted campaign {}", campaign.name)),
        )
        .await?;

    info!("Campaign {} deleted by {}", campaign.id, auth.email());
    Ok(Json(ActionResponse::success(
        format!("Campaign '{}' deleted", campaign.name),
        "campaign_deleted".to_string(),
        None,
    )))
}

pub async fn update_campaign_status_handler(
    id: Uuid,
    request: Json<StandardRequest<CampaignStatusRequest>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Campaign>> {
    let conversation_id = request.conversation_id();
    let repo = CampaignRepository::new(database.pool());
    let campaign = owned_campaign(&repo, &auth, id)
        .await
        .map_err(|e| ApiError::from(e).with_conversation(conversation_id.clone()))?;

    let status = request.data.status;
    let updated = repo
        .update_status(campaign.id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Campaign".into()))?;

    ActivityRepository::new(database.pool())
        .record(
            &NewActivity::new(auth.id(), "campaign.status_changed", "campaign")
                .with_org(campaign.org_id)
                .with_entity(campaign.id)
                .with_meta(json!({ "from": campaign.status, "to": status })),
        )
        .await?;

    Ok(Json(DataResponse::success(
        format!("Campaign is now {}", status),
        updated,
        conversation_id,
    )))
}

pub async fn campaign_stats_handler(
    id: Uuid,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<CampaignStats>> {
    let repo = CampaignRepository::new(database.pool());
    let campaign = owned_campaign(&repo, &auth, id).await?;
    let stats = repo
        .get_stats(campaign.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Campaign".into()))?;

    Ok(Json(DataResponse::success(
        "Campaign stats".to_string(),
        stats,
        None,
    )))
}

pub async fn global_stats_handler(
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<GlobalCampaignStats>> {
    let org_id = auth.org_id()?;
    let stats = CampaignRepository::new(database.pool())
        .get_global_stats(org_id)
        .await?;

    Ok(Json(DataResponse::success(
        "Campaign overview".to_string(),
        stats,
        None,
    )))
}

pub async fn add_leads_handler(
    id: Uuid,
    request: Json<StandardRequest<AddLeadsRequest>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<CampaignStats>> {
    let conversation_id = request.conversation_id();
    let count = request.data.count;
    if count < 1 {
        return Err(ApiError::from(AppError::InvalidInput(
            "count must be at least 1".into(),
        ))
        .with_conversation(conversation_id));
    }

    let repo = CampaignRepository::new(database.pool());
    let campaign = owned_campaign(&repo, &auth, id).await?;
    if !repo.increment_leads_count(campaign.id, count).await? {
        return Err(AppError::NotFound("Campaign".into()).into());
    }

    let stats = repo
        .get_stats(campaign.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Campaign".into()))?;

    Ok(Json(DataResponse::success(
        format!("Added {} leads", count),
        stats,
        conversation_id,
    )))
}
