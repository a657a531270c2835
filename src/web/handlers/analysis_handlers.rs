// src/web/handlers/analysis_handlers.rs
use crate::core::config_manager::ServiceConfig;
use crate::core::{AppError, AppResult, Database};
use crate::models::PostStatus;
use crate::repositories::{OrganizationRepository, PersonaRepository};
use crate::services::analysis::{AnalysisResults, MAX_RESULTS_LIMIT, MAX_URLS_PER_BATCH};
use crate::services::apify::{ActorRun, WebhookPayload, RUN_FAILED};
use crate::services::AnalysisService;
use crate::web::types::*;

use rocket::serde::json::{Json, Value};
use rocket::State;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_RESULTS_LIMIT: i64 = 20;

fn parse_uuid(value: &str, field: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::InvalidInput(format!("{} is not a valid UUID", field)))
}

/// Webhooks carry the shared secret as a query parameter when one is configured
fn verify_webhook_secret(config: &ServiceConfig, provided: Option<&str>) -> AppResult<()> {
    match &config.webhook_secret {
        Some(expected) if provided != Some(expected.as_str()) => {
            warn!("Rejected webhook call with a missing or wrong secret");
            Err(AppError::Unauthorized)
        }
        _ => Ok(()),
    }
}

pub async fn start_analysis_handler(
    request: Json<AnalyzeRequest>,
    analysis: &State<AnalysisService>,
    database: &State<Database>,
) -> ApiResult<DataResponse<AnalysisStarted>> {
    let request = request.into_inner();

    if request.post_urls.len() > MAX_URLS_PER_BATCH {
        return Err(AppError::InvalidInput(format!(
            "Max {} URLs allowed per batch",
            MAX_URLS_PER_BATCH
        ))
        .into());
    }
    if request.post_urls.is_empty() || request.post_urls.iter().any(|u| u.trim().is_empty()) {
        return Err(AppError::InvalidInput("post_urls must contain non-empty URLs".into()).into());
    }

    let org_id = parse_uuid(&request.org_id, "org_id")?;
    let persona_id = request
        .persona_id
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(|p| parse_uuid(p, "persona_id"))
        .transpose()?;

    let pool = database.pool();
    if OrganizationRepository::new(pool).find_by_id(org_id).await?.is_none() {
        return Err(AppError::NotFound("Organization".into()).into());
    }
    if let Some(persona_id) = persona_id {
        if PersonaRepository::new(pool).find(org_id, persona_id).await?.is_none() {
            return Err(AppError::NotFound("Persona".into()).into());
        }
    }

    if let Some(reason) = analysis.scraper_unavailable_reason() {
        return Err(AppError::Upstream(reason.to_string()).into());
    }

    let ids = analysis
        .analyze_posts(&request.post_urls, org_id, persona_id)
        .await?;

    info!("Analysis started for {} posts of org {}", ids.len(), org_id);
    Ok(Json(DataResponse::success(
        format!("Analysis started for {} posts", ids.len()),
        AnalysisStarted {
            status: "started".to_string(),
            count: ids.len(),
            ids,
        },
        None,
    )))
}

pub async fn analysis_results_handler(
    org_id: Option<&str>,
    limit: Option<i64>,
    status: Option<&str>,
    analysis: &State<AnalysisService>,
) -> ApiResult<DataResponse<AnalysisResults>> {
    let org_id = org_id.ok_or_else(|| AppError::InvalidInput("org_id is required".into()))?;
    let org_id = parse_uuid(org_id, "org_id")?;

    let limit = limit.unwrap_or(DEFAULT_RESULTS_LIMIT);
    if !(1..=MAX_RESULTS_LIMIT).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_RESULTS_LIMIT
        ))
        .into());
    }

    let status = status
        .map(|s| s.parse::<PostStatus>())
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let results = analysis.results(org_id, status, limit).await?;
    Ok(Json(DataResponse::success(
        format!("{} analyzed posts", results.total),
        results,
        None,
    )))
}

pub async fn analysis_webhook_handler(
    secret: Option<&str>,
    payload: Json<Value>,
    config: &State<ServiceConfig>,
    analysis: &State<AnalysisService>,
) -> ApiResult<WebhookAck> {
    verify_webhook_secret(config, secret)?;

    let payload = WebhookPayload::from_value(&payload);
    info!(
        "Received analysis webhook: event={:?} run={:?} dataset={:?}",
        payload.event_type,
        payload.run_id(),
        payload.dataset_id()
    );

    let run_id = payload.run_id().map(str::to_string);
    if payload.should_fetch() {
        match (run_id, payload.dataset_id().map(str::to_string)) {
            (Some(run_id), Some(dataset_id)) => {
                let service = analysis.inner().clone();
                tokio::spawn(async move {
                    service.process_webhook(&dataset_id, &run_id).await;
                });
            }
            _ => warn!("Successful run webhook without a run id, ignoring"),
        }
    } else if payload.event_type.as_deref() == Some(RUN_FAILED) {
        if let Some(run_id) = run_id {
            let service = analysis.inner().clone();
            tokio::spawn(async move {
                if let Err(e) = service.handle_failed_run(&run_id).await {
                    error!("Failed to record failed run {}: {}", run_id, e);
                }
            });
        }
    }

    Ok(Json(WebhookAck::received()))
}

pub async fn trigger_scrape_handler(
    request: Json<ScrapeRequest>,
    config: &State<ServiceConfig>,
    analysis: &State<AnalysisService>,
) -> ApiResult<DataResponse<ActorRun>> {
    let request = request.into_inner();
    if request.actor_id.trim().is_empty() {
        return Err(AppError::InvalidInput("actor_id must not be empty".into()).into());
    }

    let apify = analysis.apify();
    if !apify.is_configured() {
        return Err(AppError::Upstream("APIFY_API_TOKEN is not configured".into()).into());
    }

    let run_input = if request.run_input.is_null() {
        json!({})
    } else {
        request.run_input
    };

    let webhook_url = config.apify_webhook_url()?;
    let run = apify
        .run_actor(&request.actor_id, &run_input, Some(&webhook_url))
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(DataResponse::success(
        format!("Actor run {} started", run.id),
        run,
        None,
    )))
}

pub async fn apify_webhook_handler(
    secret: Option<&str>,
    payload: Json<Value>,
    config: &State<ServiceConfig>,
    analysis: &State<AnalysisService>,
) -> ApiResult<WebhookAck> {
    verify_webhook_secret(config, secret)?;

    let payload = WebhookPayload::from_value(&payload);
    info!(
        "Received Apify webhook: event={:?} run={:?}",
        payload.event_type,
        payload.run_id()
    );

    if payload.should_fetch() {
        if let Some(dataset_id) = payload.dataset_id().map(str::to_string) {
            let run_id = payload.run_id().unwrap_or("unknown").to_string();
            let service = analysis.inner().clone();
            tokio::spawn(async move {
                match service.apify().get_dataset_items(&dataset_id).await {
                    Ok(items) => info!("Retrieved {} items from Apify run {}", items.len(), run_id),
                    Err(e) => error!("Failed to fetch dataset {} of run {}: {}", dataset_id, run_id, e),
                }
            });
        }
    }

    Ok(Json(WebhookAck::received()))
}
