// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;

use crate::auth::{AuthConfig, AuthenticatedUser, OptionalAuth};
use crate::core::config_manager::ServiceConfig;
use crate::core::{ConfigManager, Database};
use crate::models::{
    Campaign, CampaignStats, GlobalCampaignStats, NewCampaign, NewPersona, Organization,
    OrganizationPatch, Persona, UserSettings, UserSettingsUpdate, WorkingHoursSettings,
};
use crate::services::analysis::AnalysisResults;
use crate::services::apify::ActorRun;
use crate::services::user_service::{ActivityPage, UserProfile};
use crate::services::{AiAnalysisService, AnalysisService, ApifyService, UserService};
use anyhow::{Context, Result};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::{Json, Value};
use rocket::{
    catchers, delete, get, options, patch, post, put, routes, Build, Request, Response, Rocket,
    State,
};
use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};
use uuid::Uuid;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PATCH, PUT, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// User and organization routes

#[get("/health")]
pub async fn health(auth: OptionalAuth, database: &State<Database>) -> ApiResult<TextResponse> {
    handlers::health_handler(auth, database).await
}

#[get("/users/me")]
pub async fn get_profile(
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<UserProfile>> {
    handlers::get_profile_handler(auth, users).await
}

#[patch("/users/me", data = "<request>")]
pub async fn update_profile(
    request: Json<StandardRequest<UpdateProfileRequest>>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<UserProfile>> {
    handlers::update_profile_handler(request, auth, users).await
}

#[get("/users/me/settings")]
pub async fn get_settings(auth: AuthenticatedUser) -> Json<DataResponse<UserSettings>> {
    handlers::get_settings_handler(auth).await
}

#[patch("/users/me/settings", data = "<request>")]
pub async fn update_settings(
    request: Json<StandardRequest<UserSettingsUpdate>>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<UserSettings>> {
    handlers::update_settings_handler(request, auth, users).await
}

#[get("/users/me/working-hours")]
pub async fn get_working_hours(auth: AuthenticatedUser) -> Json<DataResponse<WorkingHoursSettings>> {
    handlers::get_working_hours_handler(auth).await
}

#[put("/users/me/working-hours", data = "<request>")]
pub async fn update_working_hours(
    request: Json<WorkingHoursSettings>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<WorkingHoursSettings>> {
    handlers::update_working_hours_handler(request, auth, users).await
}

#[get("/users/me/activity?<limit>")]
pub async fn get_activity(
    limit: Option<i64>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<ActivityPage>> {
    handlers::get_activity_handler(limit, auth, users).await
}

#[get("/org")]
pub async fn get_organization(
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<Organization>> {
    handlers::get_organization_handler(auth, users).await
}

#[patch("/org/profile", data = "<request>")]
pub async fn update_organization(
    request: Json<StandardRequest<OrganizationPatch>>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<Organization>> {
    handlers::update_organization_handler(request, auth, users).await
}

// Personas and campaigns

#[get("/personas")]
pub async fn list_personas(
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Vec<Persona>>> {
    handlers::list_personas_handler(auth, database).await
}

#[post("/personas", data = "<request>")]
pub async fn create_persona(
    request: Json<StandardRequest<NewPersona>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Persona>> {
    handlers::create_persona_handler(request, auth, database).await
}

#[get("/campaigns?<status>")]
pub async fn list_campaigns(
    status: Option<&str>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Vec<Campaign>>> {
    handlers::list_campaigns_handler(status, auth, database).await
}

#[post("/campaigns", data = "<request>")]
pub async fn create_campaign(
    request: Json<StandardRequest<NewCampaign>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Campaign>> {
    handlers::create_campaign_handler(request, auth, database).await
}

#[get("/campaigns/stats")]
pub async fn global_campaign_stats(
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<GlobalCampaignStats>> {
    handlers::global_stats_handler(auth, database).await
}

#[get("/campaigns/<id>")]
pub async fn get_campaign(
    id: Uuid,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Campaign>> {
    handlers::get_campaign_handler(id, auth, database).await
}

#[delete("/campaigns/<id>")]
pub async fn delete_campaign(
    id: Uuid,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<ActionResponse> {
    handlers::delete_campaign_handler(id, auth, database).await
}

#[patch("/campaigns/<id>/status", data = "<request>")]
pub async fn update_campaign_status(
    id: Uuid,
    request: Json<StandardRequest<CampaignStatusRequest>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Campaign>> {
    handlers::update_campaign_status_handler(id, request, auth, database).await
}

#[get("/campaigns/<id>/stats")]
pub async fn campaign_stats(
    id: Uuid,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<CampaignStats>> {
    handlers::campaign_stats_handler(id, auth, database).await
}

#[post("/campaigns/<id>/leads", data = "<request>")]
pub async fn add_campaign_leads(
    id: Uuid,
    request: Json<StandardRequest<AddLeadsRequest>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<CampaignStats>> {
    handlers::add_leads_handler(id, request, auth, database).await
}

// Ingest routes, called by the scraper or internal tooling

#[post("/analysis", data = "<request>")]
pub async fn start_analysis(
    request: Json<AnalyzeRequest>,
    analysis: &State<AnalysisService>,
    database: &State<Database>,
) -> ApiResult<DataResponse<AnalysisStarted>> {
    handlers::start_analysis_handler(request, analysis, database).await
}

#[get("/analysis/results?<org_id>&<limit>&<status>")]
pub async fn analysis_results(
    org_id: Option<&str>,
    limit: Option<i64>,
    status: Option<&str>,
    analysis: &State<AnalysisService>,
) -> ApiResult<DataResponse<AnalysisResults>> {
    handlers::analysis_results_handler(org_id, limit, status, analysis).await
}

#[post("/analysis/webhook?<secret>", data = "<payload>")]
pub async fn analysis_webhook(
    secret: Option<&str>,
    payload: Json<Value>,
    config: &State<ServiceConfig>,
    analysis: &State<AnalysisService>,
) -> ApiResult<WebhookAck> {
    handlers::analysis_webhook_handler(secret, payload, config, analysis).await
}

#[post("/apify/trigger", data = "<request>")]
pub async fn trigger_scrape(
    request: Json<ScrapeRequest>,
    config: &State<ServiceConfig>,
    analysis: &State<AnalysisService>,
) -> ApiResult<DataResponse<ActorRun>> {
    handlers::trigger_scrape_handler(request, config, analysis).await
}

#[post("/apify/webhook?<secret>", data = "<payload>")]
pub async fn apify_webhook(
    secret: Option<&str>,
    payload: Json<Value>,
    config: &State<ServiceConfig>,
    analysis: &State<AnalysisService>,
) -> ApiResult<WebhookAck> {
    handlers::apify_webhook_handler(secret, payload, config, analysis).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers

fn catcher_response(error: &str, code: &str, suggestions: &[&str]) -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        error.to_string(),
        code.to_string(),
        suggestions.iter().map(|s| s.to_string()).collect(),
        None,
    ))
}

#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    catcher_response(
        "Invalid request format",
        "BAD_REQUEST",
        &[
            "Check your request JSON format",
            "Verify all required fields are present",
        ],
    )
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<StandardErrorResponse> {
    catcher_response(
        "Authentication required",
        "UNAUTHORIZED",
        &["Send a valid bearer token in the Authorization header"],
    )
}

#[rocket::catch(404)]
pub fn not_found(req: &Request) -> Json<StandardErrorResponse> {
    catcher_response(
        &format!("No route for {} {}", req.method(), req.uri().path()),
        "NOT_FOUND",
        &["Check the endpoint path and method"],
    )
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    catcher_response(
        "Request body could not be parsed",
        "UNPROCESSABLE_ENTITY",
        &[
            "Check field names and types",
            "Enumerations use lowercase values, e.g. \"active\"",
        ],
    )
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    catcher_response(
        "Internal server error",
        "INTERNAL_ERROR",
        &[
            "Try again in a few moments",
            "Contact support if the problem persists",
        ],
    )
}

/// Assemble the application with its managed state, without launching it
pub fn build_rocket(
    config: &ConfigManager,
    database: Database,
    ai: Arc<AiAnalysisService>,
) -> Result<Rocket<Build>> {
    let apify = Arc::new(ApifyService::new(&config.service)?);
    let analysis = AnalysisService::new(database.clone(), ai, apify, config.service.clone());
    let users = UserService::new(database.clone());
    let auth_config = AuthConfig::new(&config.auth);

    let figment = rocket::Config::figment()
        .merge(("port", config.environment.port))
        .merge(("address", "0.0.0.0"));

    Ok(rocket::custom(figment)
        .attach(Cors)
        .manage(database)
        .manage(auth_config)
        .manage(config.service.clone())
        .manage(analysis)
        .manage(users)
        .register(
            "/",
            catchers![bad_request, unauthorized, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                health,
                get_profile,
                update_profile,
                get_settings,
                update_settings,
                get_working_hours,
                update_working_hours,
                get_activity,
                get_organization,
                update_organization,
                list_personas,
                create_persona,
                list_campaigns,
                create_campaign,
                global_campaign_stats,
                get_campaign,
                delete_campaign,
                update_campaign_status,
                campaign_stats,
                add_campaign_leads,
            ],
        )
        .mount(
            "/ingest",
            routes![
                start_analysis,
                analysis_results,
                analysis_webhook,
                trigger_scrape,
                apify_webhook,
            ],
        )
        .mount("/", routes![options]))
}

/// JSON lines to the log file plus readable output on stdout
fn init_tracing(config: &ConfigManager) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.environment.log_path)
        .with_context(|| {
            format!(
                "Failed to open log file {}",
                config.environment.log_path.display()
            )
        })?;

    Registry::default()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("leadscope=info,rocket::server=off")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(())
}

// Main server start function
pub async fn start_web_server(config: ConfigManager) -> Result<()> {
    config.ensure_directories().await?;
    init_tracing(&config)?;

    let database = match Database::connect(&config.environment.database_path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e);
        }
    };

    let ai = Arc::new(AiAnalysisService::new(&config.service)?);

    info!("Starting Leadscope API server ({})", config.environment.name);
    info!("Database: {}", config.environment.database_path.display());
    info!(
        "AI analysis: {}, scraper: {}",
        if config.service.ai_enabled() { "enabled" } else { "fallback rules" },
        if config.service.apify_enabled() { "enabled" } else { "not configured" }
    );

    let _rocket = build_rocket(&config, database, ai)?
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed: {}", e))?;

    Ok(())
}
