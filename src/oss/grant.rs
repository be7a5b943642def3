use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use super::policy::{ContentClass, PolicyDocument, UploadScope};
use super::signer::{sign_policy, SignError, SignedPolicy};
use super::sts::{AssumeRoleRequest, CredentialBroker, StsError, TemporaryCredential};
use crate::auth::CallerId;
use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum GrantError {
    #[error(transparent)]
    Sts(#[from] StsError),

    #[error(transparent)]
    Sign(#[from] SignError),
}

/// Everything a client needs for one direct PostObject upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadGrant {
    /// Unix seconds, as a string for the mobile client.
    pub expire: String,
    pub policy: String,
    pub signature: String,
    pub accessid: String,
    #[serde(rename = "stsToken")]
    pub sts_token: String,
    pub host: String,
    pub dir: String,
}

impl UploadGrant {
    pub fn assemble(
        expiration: DateTime<Utc>,
        signed: SignedPolicy,
        credential: &TemporaryCredential,
        host: String,
        scope: &UploadScope,
    ) -> Self {
        Self {
            expire: expiration.timestamp().to_string(),
            policy: signed.policy,
            signature: signed.signature,
            accessid: credential.access_key_id.clone(),
            sts_token: credential.security_token.clone(),
            host,
            dir: scope.directory_prefix.clone(),
        }
    }
}

/// Issues upload grants: scope, exchange, sign, assemble.
pub struct UploadAuthorizer {
    broker: Arc<dyn CredentialBroker>,
    bucket: String,
    host: String,
    role_arn: String,
    session_name: String,
    ttl_secs: u64,
}

impl UploadAuthorizer {
    pub fn new(config: &AppConfig, broker: Arc<dyn CredentialBroker>) -> Self {
        Self {
            broker,
            bucket: config.storage.bucket.clone(),
            host: config.upload_host(),
            role_arn: config.sts.role_arn.clone(),
            session_name: config.sts.session_name.clone(),
            ttl_secs: config.sts.policy_ttl_secs,
        }
    }

    pub async fn issue(
        &self,
        caller: &CallerId,
        content_class: ContentClass,
    ) -> Result<UploadGrant, GrantError> {
        let scope = UploadScope::for_caller(caller, content_class);

        let credential = self
            .broker
            .assume_role(&AssumeRoleRequest {
                role_arn: self.role_arn.clone(),
                session_name: self.session_name.clone(),
                duration_secs: self.ttl_secs,
            })
            .await?;

        let now = Utc::now();
        if credential.expires_at <= now {
            return Err(StsError::InvalidResponse(format!(
                "credential already expired at {}",
                credential.expires_at
            ))
            .into());
        }

        let policy = PolicyDocument::build(
            &scope,
            &self.bucket,
            now,
            Duration::seconds(self.ttl_secs as i64),
            credential.expires_at,
        );
        let signed = sign_policy(&policy, &credential)?;

        tracing::info!(
            caller = %caller,
            dir = %scope.directory_prefix,
            max_bytes = scope.max_object_bytes,
            expires_at = %policy.expiration,
            "Issued upload grant"
        );

        Ok(UploadGrant::assemble(
            policy.expiration,
            signed,
            &credential,
            self.host.clone(),
            &scope,
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Broker double that records requests and answers with a fixed result.
    pub(crate) struct SpyBroker {
        pub calls: AtomicUsize,
        pub last_request: Mutex<Option<AssumeRoleRequest>>,
        pub fail: bool,
        pub lifetime_secs: Option<i64>,
    }

    impl SpyBroker {
        pub(crate) fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
                fail: false,
                lifetime_secs: None,
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }

        pub(crate) fn expiring_in(secs: i64) -> Self {
            Self {
                lifetime_secs: Some(secs),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl CredentialBroker for SpyBroker {
        async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<TemporaryCredential, StsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if self.fail {
                return Err(StsError::Unavailable("simulated outage".into()));
            }
            Ok(TemporaryCredential {
                access_key_id: "STS.tmp-id".into(),
                access_key_secret: "tmp-secret".into(),
                security_token: "tmp-token".into(),
                expires_at: Utc::now()
                    + Duration::seconds(
                        self.lifetime_secs.unwrap_or(request.duration_secs as i64),
                    ),
            })
        }
    }

    fn config() -> AppConfig {
        let vars = crate::config::tests::complete_vars();
        AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap()
    }

    fn decode_policy(grant: &UploadGrant) -> Value {
        let raw = STANDARD.decode(&grant.policy).unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    #[tokio::test]
    async fn avatar_grant_for_caller_42() {
        let broker = Arc::new(SpyBroker::ok());
        let authorizer = UploadAuthorizer::new(&config(), broker.clone());
        let caller = CallerId::parse("42").unwrap();

        let before = Utc::now().timestamp();
        let grant = authorizer.issue(&caller, ContentClass::Avatar).await.unwrap();

        assert_eq!(grant.dir, "pet-avatar/42/");
        assert_eq!(grant.accessid, "STS.tmp-id");
        assert_eq!(grant.sts_token, "tmp-token");
        assert_eq!(grant.host, "https://pet-journal.oss-cn-hangzhou.aliyuncs.com");

        let policy = decode_policy(&grant);
        let conditions = policy["conditions"].as_array().unwrap();
        assert!(conditions.contains(&json!(["content-length-range", 0, 1048576])));
        assert!(conditions.contains(&json!(["starts-with", "$key", "pet-avatar/42/"])));
        assert!(conditions.contains(&json!({ "bucket": "pet-journal" })));

        let expire: i64 = grant.expire.parse().unwrap();
        assert!(expire > before);
        assert!(expire <= Utc::now().timestamp() + 3000 + 2);
    }

    #[tokio::test]
    async fn note_grant_uses_note_dir_and_ceiling() {
        let broker = Arc::new(SpyBroker::ok());
        let authorizer = UploadAuthorizer::new(&config(), broker.clone());
        let caller = CallerId::parse("u-9").unwrap();

        let grant = authorizer.issue(&caller, ContentClass::NoteImage).await.unwrap();
        assert_eq!(grant.dir, "pet-note/u-9/");
        let policy = decode_policy(&grant);
        assert_eq!(policy["conditions"][0], json!(["content-length-range", 0, 2097152]));
    }

    #[tokio::test]
    async fn exchange_requests_role_for_policy_ttl() {
        let broker = Arc::new(SpyBroker::ok());
        let authorizer = UploadAuthorizer::new(&config(), broker.clone());
        authorizer
            .issue(&CallerId::parse("1").unwrap(), ContentClass::Avatar)
            .await
            .unwrap();

        let request = broker.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.role_arn, "acs:ram::1234:role/uploader");
        assert_eq!(request.session_name, "pet-journal");
        assert_eq!(request.duration_secs, 3000);
    }

    #[tokio::test]
    async fn every_grant_performs_a_fresh_exchange() {
        let broker = Arc::new(SpyBroker::ok());
        let authorizer = UploadAuthorizer::new(&config(), broker.clone());
        let caller = CallerId::parse("1").unwrap();
        authorizer.issue(&caller, ContentClass::Avatar).await.unwrap();
        authorizer.issue(&caller, ContentClass::Avatar).await.unwrap();
        assert_eq!(broker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exchange_failure_yields_no_grant() {
        let broker = Arc::new(SpyBroker::failing());
        let authorizer = UploadAuthorizer::new(&config(), broker.clone());
        let result = authorizer
            .issue(&CallerId::parse("42").unwrap(), ContentClass::Avatar)
            .await;
        assert!(matches!(result, Err(GrantError::Sts(StsError::Unavailable(_)))));
    }

    #[tokio::test]
    async fn already_expired_credential_yields_no_grant() {
        let broker = Arc::new(SpyBroker::expiring_in(-60));
        let authorizer = UploadAuthorizer::new(&config(), broker.clone());
        let result = authorizer
            .issue(&CallerId::parse("42").unwrap(), ContentClass::Avatar)
            .await;
        assert!(matches!(result, Err(GrantError::Sts(StsError::InvalidResponse(_)))));
        assert_eq!(broker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_lived_credential_caps_expire() {
        let broker = Arc::new(SpyBroker::expiring_in(120));
        let authorizer = UploadAuthorizer::new(&config(), broker.clone());
        let grant = authorizer
            .issue(&CallerId::parse("42").unwrap(), ContentClass::Avatar)
            .await
            .unwrap();
        let expire: i64 = grant.expire.parse().unwrap();
        assert!(expire > Utc::now().timestamp());
        assert!(expire <= Utc::now().timestamp() + 121);
    }

    #[test]
    fn grant_serializes_with_client_field_names() {
        let grant = UploadGrant {
            expire: "1".into(),
            policy: "p".into(),
            signature: "s".into(),
            accessid: "a".into(),
            sts_token: "t".into(),
            host: "h".into(),
            dir: "d/".into(),
        };
        let value = serde_json::to_value(&grant).unwrap();
        assert_eq!(value["stsToken"], "t");
        assert_eq!(value["accessid"], "a");
        assert!(value.get("sts_token").is_none());
    }
}
