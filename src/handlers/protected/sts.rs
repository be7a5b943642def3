// handlers/protected/sts.rs - GET /sts/stsPetAvatar, GET /sts/stsPetNote

use axum::extract::{Extension, State};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::oss::{ContentClass, UploadGrant};
use crate::state::AppState;

/// GET /sts/stsPetAvatar - upload grant for `pet-avatar/<caller>/`, 1 MiB
pub async fn sts_pet_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<UploadGrant> {
    issue(&state, &user, ContentClass::Avatar).await
}

/// GET /sts/stsPetNote - upload grant for `pet-note/<caller>/`, 2 MiB
pub async fn sts_pet_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<UploadGrant> {
    issue(&state, &user, ContentClass::NoteImage).await
}

async fn issue(state: &AppState, user: &AuthUser, class: ContentClass) -> ApiResult<UploadGrant> {
    let grant = state.authorizer.issue(&user.caller_id, class).await?;
    Ok(ApiResponse::sts(grant))
}
