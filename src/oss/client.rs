use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::signer::{hmac_sha1_base64, SignError};
use super::sts::percent_encode;
use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum OssError {
    #[error("OSS request failed: {0}")]
    Transport(String),

    #[error("OSS answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Sign(#[from] SignError),
}

/// Object operations performed with the service identity. Uploads never go
/// through here; clients post directly with a grant.
pub struct OssClient {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    endpoint_domain: String,
    access_key_id: String,
    access_key_secret: String,
}

impl OssClient {
    pub fn new(config: &StorageConfig) -> Result<Self, OssError> {
        let base_url = format!(
            "https://{}.{}.{}",
            config.bucket, config.region, config.endpoint_domain
        );
        Self::with_base_url(config, base_url)
    }

    /// Same client against an explicit base URL (local emulators, tests).
    pub fn with_base_url(config: &StorageConfig, base_url: String) -> Result<Self, OssError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OssError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            endpoint_domain: config.endpoint_domain.clone(),
            access_key_id: config.access_key_id.clone(),
            access_key_secret: config.access_key_secret.clone(),
        })
    }

    /// Object key from a stored object URL, e.g.
    /// `https://b.oss-cn-hangzhou.aliyuncs.com/pet-note/42/a.jpg` → `pet-note/42/a.jpg`.
    pub fn object_key_from_url(&self, object_url: &str) -> Option<String> {
        let marker = format!(".{}/", self.endpoint_domain);
        let (_, rest) = object_url.split_once(&marker)?;
        let path = rest.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        if path.is_empty() {
            return None;
        }
        Some(path.to_string())
    }

    /// `Authorization` header value for a header-signed request.
    fn authorization(&self, verb: &str, date: &str, key: &str) -> Result<String, OssError> {
        let string_to_sign = format!("{}\n\n\n{}\n/{}/{}", verb, date, self.bucket, key);
        let signature = hmac_sha1_base64(
            self.access_key_secret.as_bytes(),
            string_to_sign.as_bytes(),
        )?;
        Ok(format!("OSS {}:{}", self.access_key_id, signature))
    }

    pub async fn delete_object(&self, key: &str) -> Result<(), OssError> {
        self.delete_object_at(key, Utc::now()).await
    }

    async fn delete_object_at(&self, key: &str, at: DateTime<Utc>) -> Result<(), OssError> {
        let date = at.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let authorization = self.authorization("DELETE", &date, key)?;
        let encoded_key = key
            .split('/')
            .map(percent_encode)
            .collect::<Vec<_>>()
            .join("/");

        let response = self
            .http
            .delete(format!("{}/{}", self.base_url, encoded_key))
            .header("Date", date)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| OssError::Transport(e.to_string()))?;

        let status = response.status();
        // OSS answers 204 for both deleted and already-absent objects
        if status.is_success() {
            tracing::info!(key = %key, "Deleted object");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(OssError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
