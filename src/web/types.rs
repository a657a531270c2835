// src/web/types.rs
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{Json, Value};
use rocket::serde::{Deserialize, Serialize};
use rocket::{Request, Response};
use tracing::{error, warn};
use uuid::Uuid;

use crate::core::AppError;
use crate::models::CampaignStatus;

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

// Request wrapper with conversation_id support
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

impl TextResponse {
    pub fn success(message: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
            conversation_id,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            conversation_id,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }
}

/// Error half of every handler result; renders the standard error envelope with its status
#[derive(Debug)]
pub struct ApiError {
    pub error: AppError,
    pub conversation_id: Option<String>,
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

impl ApiError {
    pub fn with_conversation(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    fn suggestions(&self) -> Vec<String> {
        let hints: &[&str] = match &self.error {
            AppError::NotFound(_) => &["Check the identifier", "List resources to find valid ids"],
            AppError::InvalidInput(_) => &["Check your request JSON format"],
            AppError::Unauthorized => &["Send a valid bearer token in the Authorization header"],
            AppError::Forbidden(_) => &["Ask an organization owner or admin"],
            AppError::Upstream(_) => &["Try again in a few moments", "Check the service configuration"],
            AppError::Database(_) | AppError::Internal(_) => &[
                "Try again in a few moments",
                "Contact support if the problem persists",
            ],
        };
        hints.iter().map(|h| h.to_string()).collect()
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            conversation_id: None,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal(error).into()
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = Status::from_code(self.error.status_code()).unwrap_or(Status::InternalServerError);
        if status.code >= 500 {
            error!("{} {} failed: {:#}", req.method(), req.uri(), self.error);
        } else {
            warn!("{} {} rejected: {}", req.method(), req.uri(), self.error);
        }

        let body = StandardErrorResponse::new(
            self.error.public_message(),
            self.error.error_code().to_string(),
            self.suggestions(),
            self.conversation_id,
        );

        Response::build_from(Json(body).respond_to(req)?)
            .status(status)
            .ok()
    }
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct CampaignStatusRequest {
    pub status: CampaignStatus,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AddLeadsRequest {
    #[serde(default = "default_lead_increment")]
    pub count: i64,
}

fn default_lead_increment() -> i64 {
    1
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalyzeRequest {
    pub post_urls: Vec<String>,
    pub org_id: String,
    #[serde(default)]
    pub persona_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AnalysisStarted {
    pub status: String,
    pub count: usize,
    pub ids: Vec<Uuid>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ScrapeRequest {
    pub actor_id: String,
    #[serde(default)]
    pub run_input: Value,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct WebhookAck {
    pub status: &'static str,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { status: "received" }
    }
}
