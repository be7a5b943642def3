// handlers/protected/pets.rs - /api/getPetList, /api/addPet, /api/updatePet, /api/deletePet

use std::collections::HashMap;

use axum::extract::{rejection::JsonRejection, Extension, Json, State};
use chrono::Utc;
use serde::Deserialize;

use crate::database::models::{Pet, PetInput};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PetBody {
    pub pet: Option<PetInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePetBody {
    pub pet_id: Option<i64>,
}

/// GET /api/getPetList - pets owned by the caller
pub async fn get_pet_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<Pet>> {
    let pets = state.pets().list_for_owner(&user.caller_id).await?;
    tracing::debug!(caller = %user.caller_id, count = pets.len(), "Listed pets");
    Ok(ApiResponse::data(pets))
}

/// POST /api/addPet
pub async fn add_pet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<PetBody>, JsonRejection>,
) -> ApiResult<Pet> {
    let Json(body) = body?;
    let input = body
        .pet
        .ok_or_else(|| ApiError::bad_request("Request body must contain 'pet'"))?;

    let pet = state
        .pets()
        .insert(&user.caller_id, input, Utc::now().timestamp())
        .await?;
    tracing::info!(caller = %user.caller_id, pet_id = pet.id, "Added pet");
    Ok(ApiResponse::data(pet))
}

/// POST /api/updatePet - `pet.id` selects the row, the rest overwrites it
pub async fn update_pet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<PetBody>, JsonRejection>,
) -> ApiResult<Pet> {
    let Json(body) = body?;
    let input = body
        .pet
        .ok_or_else(|| ApiError::bad_request("Request body must contain 'pet'"))?;
    let id = require_id(input.id)?;

    let pet = state
        .pets()
        .update(&user.caller_id, id, input, Utc::now().timestamp())
        .await?;
    tracing::info!(caller = %user.caller_id, pet_id = id, "Updated pet");
    Ok(ApiResponse::data(pet))
}

/// POST /api/deletePet - detaches the pet from the caller
pub async fn delete_pet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<DeletePetBody>, JsonRejection>,
) -> ApiResult<bool> {
    let Json(body) = body?;
    let id = require_id(body.pet_id)?;
    state.pets().soft_delete(&user.caller_id, id).await?;
    tracing::info!(caller = %user.caller_id, pet_id = id, "Released pet");
    Ok(ApiResponse::data(true))
}

fn require_id(id: Option<i64>) -> Result<i64, ApiError> {
    match id {
        Some(id) if id > 0 => Ok(id),
        _ => {
            let mut field_errors = HashMap::new();
            field_errors.insert("id".to_string(), "A positive pet id is required".to_string());
            Err(ApiError::validation_error("Missing pet id", Some(field_errors)))
        }
    }
}
