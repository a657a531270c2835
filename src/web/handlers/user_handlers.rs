// src/web/handlers/user_handlers.rs
use crate::auth::AuthenticatedUser;
use crate::models::{
    Organization, OrganizationPatch, UserSettings, UserSettingsUpdate, WorkingHoursSettings,
};
use crate::services::user_service::{ActivityPage, UserProfile};
use crate::services::UserService;
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

pub async fn get_profile_handler(
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<UserProfile>> {
    let profile = users.profile(auth.user()).await?;
    Ok(Json(DataResponse::success(
        "User profile".to_string(),
        profile,
        None,
    )))
}

pub async fn update_profile_handler(
    request: Json<StandardRequest<UpdateProfileRequest>>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<UserProfile>> {
    let conversation_id = request.conversation_id();
    let profile = users
        .update_profile(
            auth.user(),
            request.data.full_name.as_deref(),
            request.data.avatar_url.as_deref(),
        )
        .await
        .map_err(|e| ApiError::from(e).with_conversation(conversation_id.clone()))?;

    info!("User {} updated their profile", auth.email());
    Ok(Json(DataResponse::success(
        "Profile updated".to_string(),
        profile,
        conversation_id,
    )))
}

pub async fn get_settings_handler(auth: AuthenticatedUser) -> Json<DataResponse<UserSettings>> {
    Json(DataResponse::success(
        "User settings".to_string(),
        UserService::settings(auth.user()),
        None,
    ))
}

pub async fn update_settings_handler(
    request: Json<StandardRequest<UserSettingsUpdate>>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<UserSettings>> {
    let conversation_id = request.conversation_id();
    let settings = users
        .update_settings(auth.user(), &request.data)
        .await
        .map_err(|e| ApiError::from(e).with_conversation(conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Settings updated".to_string(),
        settings,
        conversation_id,
    )))
}

pub async fn get_working_hours_handler(
    auth: AuthenticatedUser,
) -> Json<DataResponse<WorkingHoursSettings>> {
    Json(DataResponse::success(
        "Working hours".to_string(),
        UserService::working_hours(auth.user()),
        None,
    ))
}

pub async fn update_working_hours_handler(
    request: Json<WorkingHoursSettings>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<WorkingHoursSettings>> {
    let hours = users
        .update_working_hours(auth.user(), request.into_inner())
        .await?;

    Ok(Json(DataResponse::success(
        "Working hours updated".to_string(),
        hours,
        None,
    )))
}

pub async fn get_activity_handler(
    limit: Option<i64>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<ActivityPage>> {
    let page = users.activity(auth.user(), limit).await?;
    Ok(Json(DataResponse::success(
        format!("{} activity entries", page.total),
        page,
        None,
    )))
}

pub async fn get_organization_handler(
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<Organization>> {
    let org = users.get_organization(auth.user().current_org_id).await?;
    Ok(Json(DataResponse::success(
        "Organization".to_string(),
        org,
        None,
    )))
}

pub async fn update_organization_handler(
    request: Json<StandardRequest<OrganizationPatch>>,
    auth: AuthenticatedUser,
    users: &State<UserService>,
) -> ApiResult<DataResponse<Organization>> {
    let conversation_id = request.conversation_id();
    let org = users
        .update_organization(auth.user().current_org_id, auth.user(), &request.data)
        .await
        .map_err(|e| ApiError::from(e).with_conversation(conversation_id.clone()))?;

    Ok(Json(DataResponse::success(
        "Organization updated".to_string(),
        org,
        conversation_id,
    )))
}
