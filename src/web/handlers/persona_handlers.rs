// src/web/handlers/persona_handlers.rs
use crate::auth::AuthenticatedUser;
use crate::core::{AppError, Database};
use crate::models::{NewActivity, NewPersona, Persona};
use crate::repositories::{ActivityRepository, PersonaRepository};
use crate::web::types::*;

use rocket::serde::json::Json;
use rocket::State;
use tracing::info;

pub async fn list_personas_handler(
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Vec<Persona>>> {
    let org_id = auth.org_id()?;
    let personas = PersonaRepository::new(database.pool()).list(org_id).await?;

    Ok(Json(DataResponse::success(
        format!("{} personas", personas.len()),
        personas,
        None,
    )))
}

pub async fn create_persona_handler(
    request: Json<StandardRequest<NewPersona>>,
    auth: AuthenticatedUser,
    database: &State<Database>,
) -> ApiResult<DataResponse<Persona>> {
    let conversation_id = request.conversation_id();
    let org_id = auth.org_id()?;

    if request.data.name.trim().is_empty() {
        return Err(ApiError::from(AppError::InvalidInput(
            "Persona name must not be empty".into(),
        ))
        .with_conversation(conversation_id));
    }

    let persona = PersonaRepository::new(database.pool())
        .create(org_id, &request.data)
        .await?;

    ActivityRepository::new(database.pool())
        .record(
            &NewActivity::new(auth.id(), "persona.created", "persona")
                .with_org(org_id)
                .with_entity(persona.id)
                .with_description(format!("Created persona {}", persona.name)),
        )
        .await?;

    info!("Persona {} created by {}", persona.id, auth.email());
    Ok(Json(DataResponse::success(
        format!("Persona '{}' created", persona.name),
        persona,
        conversation_id,
    )))
}
