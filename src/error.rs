// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::oss::GrantError;

/// HTTP API error with appropriate status codes and client-friendly messages.
/// Bodies never carry grant fields, so a failed upload authorization cannot
/// leak a partial signature or credential.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),
    InvalidCredentialFormat(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (provider answered, but not with what we need)
    BadGateway(String),

    // 503 Service Unavailable (provider or database unreachable; retryable)
    UpstreamUnavailable(String),
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::InvalidCredentialFormat(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::BadGateway(_) => 502,
            ApiError::UpstreamUnavailable(_) => 503,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::InvalidCredentialFormat(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::UpstreamUnavailable(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError {
                message,
                field_errors,
            } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::InvalidCredentialFormat(_) => "INVALID_CREDENTIAL_FORMAT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

/// Body extraction failures (syntax, wrong content type, wrong field types)
/// use the same error envelope as everything else.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_json(rejection.body_text())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential | AuthError::InvalidCredentialFormat => {
                ApiError::InvalidCredentialFormat(err.to_string())
            }
            AuthError::Unauthorized(reason) => {
                tracing::debug!("Token rejected: {}", reason);
                ApiError::unauthorized("Invalid or expired token")
            }
            AuthError::InvalidKey(msg) => {
                tracing::error!("Token verification key unusable: {}", msg);
                ApiError::internal_server_error("Authentication is misconfigured")
            }
        }
    }
}

impl From<GrantError> for ApiError {
    fn from(err: GrantError) -> Self {
        use crate::oss::StsError;

        match err {
            GrantError::Sts(StsError::Unavailable(msg)) => {
                tracing::error!("STS unavailable: {}", msg);
                ApiError::UpstreamUnavailable(
                    "Upload authorization temporarily unavailable".to_string(),
                )
            }
            GrantError::Sts(e) => {
                tracing::error!("STS exchange failed: {}", e);
                ApiError::BadGateway("Upload authorization failed".to_string())
            }
            GrantError::Sign(e) => {
                tracing::error!("Policy signing failed: {}", e);
                ApiError::internal_server_error("Upload authorization failed")
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)
            | DatabaseError::Sqlx(sqlx::Error::Io(_)) => {
                tracing::error!("Database unreachable: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oss::{SignError, StsError};

    #[test]
    fn auth_errors_map_to_401_with_distinct_codes() {
        let e: ApiError = AuthError::InvalidCredentialFormat.into();
        assert_eq!(e.status_code(), 401);
        assert_eq!(e.error_code(), "INVALID_CREDENTIAL_FORMAT");

        let e: ApiError = AuthError::Unauthorized("bad signature".into()).into();
        assert_eq!(e.status_code(), 401);
        assert_eq!(e.error_code(), "UNAUTHORIZED");
        // Verification detail stays in the logs
        assert!(!e.message().contains("signature"));
    }

    #[test]
    fn sts_failures_are_5xx() {
        let e: ApiError = GrantError::Sts(StsError::Unavailable("timeout".into())).into();
        assert_eq!(e.status_code(), 503);
        assert_eq!(e.error_code(), "UPSTREAM_UNAVAILABLE");

        let e: ApiError = GrantError::Sts(StsError::Rejected {
            code: "NoPermission".into(),
            message: "denied".into(),
        })
        .into();
        assert_eq!(e.status_code(), 502);

        let e: ApiError = GrantError::Sign(SignError::Serialize("boom".into())).into();
        assert_eq!(e.status_code(), 500);
    }

    #[test]
    fn error_body_has_no_grant_fields() {
        let body = ApiError::UpstreamUnavailable("down".into()).to_json();
        assert_eq!(body["error"], true);
        assert!(body.get("signature").is_none());
        assert!(body.get("sts").is_none());
    }

    #[test]
    fn validation_error_includes_field_errors() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "This field is required".to_string());
        let body = ApiError::validation_error("Missing required fields", Some(fields)).to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["name"], "This field is required");
    }
}
