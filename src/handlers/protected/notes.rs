// handlers/protected/notes.rs - /api/getNoteList, /api/addNote, /api/deleteNote

use axum::extract::{rejection::JsonRejection, Extension, Json, State};
use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;

use crate::auth::CallerId;
use crate::database::models::{Note, NoteInput};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::oss::{ContentClass, OssClient, UploadScope};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NoteBody {
    pub note: Option<NoteInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNoteBody {
    pub note_id: Option<i64>,
}

/// GET /api/getNoteList - caller's notes, newest first
pub async fn get_note_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<Note>> {
    let notes = state.notes().list_for_owner(&user.caller_id).await?;
    Ok(ApiResponse::data(notes))
}

/// POST /api/addNote
pub async fn add_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<NoteBody>, JsonRejection>,
) -> ApiResult<Note> {
    let Json(body) = body?;
    let input = body
        .note
        .ok_or_else(|| ApiError::bad_request("Request body must contain 'note'"))?;

    let note = state
        .notes()
        .insert(&user.caller_id, input, Utc::now().timestamp())
        .await?;
    tracing::info!(caller = %user.caller_id, note_id = note.id, images = note.images.len(), "Added note");
    Ok(ApiResponse::data(note))
}

/// POST /api/deleteNote - removes the note and, best effort, its images
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<DeleteNoteBody>, JsonRejection>,
) -> ApiResult<bool> {
    let Json(body) = body?;
    let id = match body.note_id {
        Some(id) if id > 0 => id,
        _ => return Err(ApiError::bad_request("A positive noteId is required")),
    };

    let notes = state.notes();
    let note = notes
        .find_owned(&user.caller_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("note {}", id)))?;

    delete_images(&state.oss, &user.caller_id, &note.images).await;
    notes.delete_owned(&user.caller_id, id).await?;

    tracing::info!(caller = %user.caller_id, note_id = id, "Deleted note");
    Ok(ApiResponse::data(true))
}

/// Deletes the caller's note images. Failures are logged and never block the
/// note deletion.
async fn delete_images(oss: &OssClient, caller: &CallerId, images: &[String]) {
    let keys = deletable_keys(oss, caller, images);
    let results = join_all(keys.iter().map(|key| oss.delete_object(key))).await;

    for (key, result) in keys.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Failed to delete note image");
        }
    }
}

/// Keys under the caller's own note prefix; anything else stays untouched.
fn deletable_keys(oss: &OssClient, caller: &CallerId, images: &[String]) -> Vec<String> {
    let prefix = UploadScope::for_caller(caller, ContentClass::NoteImage).directory_prefix;

    images
        .iter()
        .filter_map(|url| match oss.object_key_from_url(url) {
            Some(key) if key.starts_with(&prefix) && !key.contains("..") => Some(key),
            _ => {
                tracing::warn!(caller = %caller, url = %url, "Skipping image outside caller prefix");
                None
            }
        })
        .collect()
}
