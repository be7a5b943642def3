//! Temporary credential exchange against Aliyun STS (`AssumeRole`).
//!
//! Every upload grant gets its own exchange. Nothing returned from here is
//! cached or shared between requests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use super::signer::{hmac_sha1_base64, SignError};
use crate::config::{StorageConfig, StsConfig};

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const API_VERSION: &str = "2015-04-01";

#[derive(Debug, Error)]
pub enum StsError {
    #[error("STS unreachable: {0}")]
    Unavailable(String),

    #[error("STS rejected AssumeRole ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("unexpected STS response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Sign(#[from] SignError),
}

/// Short-lived credential scoped to the upload role.
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredential {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for TemporaryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredential")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("security_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub duration_secs: u64,
}

/// Seam between the grant flow and the provider; tests substitute a spy.
#[async_trait]
pub trait CredentialBroker: Send + Sync {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredential, StsError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    credentials: CredentialsBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialsBody {
    access_key_id: String,
    access_key_secret: String,
    security_token: String,
    expiration: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// STS client holding the long-lived service identity.
pub struct AliyunStsClient {
    http: reqwest::Client,
    endpoint: String,
    access_key_id: String,
    access_key_secret: String,
}

impl AliyunStsClient {
    pub fn new(sts: &StsConfig, storage: &StorageConfig) -> Result<Self, StsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(sts.timeout_secs))
            .build()
            .map_err(|e| StsError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: sts.endpoint.clone(),
            access_key_id: storage.access_key_id.clone(),
            access_key_secret: storage.access_key_secret.clone(),
        })
    }

    /// Request parameters including `Signature`, for a fixed nonce and time.
    fn signed_params(
        &self,
        request: &AssumeRoleRequest,
        nonce: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>, StsError> {
        let mut params: Vec<(String, String)> = vec![
            ("AccessKeyId".into(), self.access_key_id.clone()),
            ("Action".into(), "AssumeRole".into()),
            ("DurationSeconds".into(), request.duration_secs.to_string()),
            ("Format".into(), "JSON".into()),
            ("RoleArn".into(), request.role_arn.clone()),
            ("RoleSessionName".into(), request.session_name.clone()),
            ("SignatureMethod".into(), "HMAC-SHA1".into()),
            ("SignatureNonce".into(), nonce.to_string()),
            ("SignatureVersion".into(), "1.0".into()),
            (
                "Timestamp".into(),
                timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("Version".into(), API_VERSION.into()),
        ];
        params.sort();

        let string_to_sign = string_to_sign("POST", &params);
        let key = format!("{}&", self.access_key_secret);
        let signature = hmac_sha1_base64(key.as_bytes(), string_to_sign.as_bytes())?;
        params.push(("Signature".into(), signature));
        Ok(params)
    }
}

#[async_trait]
impl CredentialBroker for AliyunStsClient {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredential, StsError> {
        let nonce = Uuid::new_v4().to_string();
        let params = self.signed_params(request, &nonce, Utc::now())?;

        let response = self
            .http
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| StsError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StsError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
            return Err(match (status.is_server_error(), parsed) {
                (true, Some(err)) => {
                    StsError::Unavailable(format!("{} {}: {}", status, err.code, err.message))
                }
                (true, None) => StsError::Unavailable(status.to_string()),
                (false, Some(err)) => StsError::Rejected {
                    code: err.code,
                    message: err.message,
                },
                (false, None) => StsError::InvalidResponse(format!("HTTP {}", status)),
            });
        }

        let parsed: AssumeRoleResponse =
            serde_json::from_str(&body).map_err(|e| StsError::InvalidResponse(e.to_string()))?;
        let creds = parsed.credentials;

        tracing::debug!(
            access_key_id = %creds.access_key_id,
            expires_at = %creds.expiration,
            "Assumed upload role"
        );

        Ok(TemporaryCredential {
            access_key_id: creds.access_key_id,
            access_key_secret: creds.access_key_secret,
            security_token: creds.security_token,
            expires_at: creds.expiration,
        })
    }
}

pub(crate) fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, RFC3986).to_string()
}

/// `METHOD&%2F&<percent-encoded canonical query>`; `params` must be sorted.
fn string_to_sign(method: &str, params: &[(String, String)]) -> String {
    let canonical = params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}&{}&{}", method, percent_encode("/"), percent_encode(&canonical))
}
