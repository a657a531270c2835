// src/web/handlers/system_handlers.rs
use crate::auth::OptionalAuth;
use crate::core::{AppError, Database};
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info};

pub async fn health_handler(auth: OptionalAuth, database: &State<Database>) -> ApiResult<TextResponse> {
    if let Some(user) = auth.user {
        info!("Health check by authenticated user: {}", user.email());
    } else {
        info!("Health check by anonymous user");
    }

    if let Err(e) = database.health_check().await {
        error!("Database health check failed: {}", e);
        return Err(AppError::Internal(e).into());
    }

    Ok(Json(TextResponse::success("OK".to_string(), None)))
}
