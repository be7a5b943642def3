use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, CallerId};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller extracted from the bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub caller_id: CallerId,
}

/// JWT authentication middleware that validates tokens and injects `AuthUser`.
/// Requests rejected here never reach a handler.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller_id = {
        let header = credential_header(request.headers())?;
        state.verifier.verify_header(header)?
    };

    tracing::debug!(caller = %caller_id, path = %request.uri().path(), "Authenticated request");
    request.extensions_mut().insert(AuthUser { caller_id });

    Ok(next.run(request).await)
}

/// Raw credential header. The mobile client sends `Authentication`; standard
/// clients send `Authorization`.
fn credential_header(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get("authorization")
        .or_else(|| headers.get("authentication"))
        .ok_or(AuthError::MissingCredential)?;

    value.to_str().map_err(|_| AuthError::InvalidCredentialFormat)
}
