use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

use super::policy::PolicyDocument;
use super::sts::TemporaryCredential;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("policy serialization failed: {0}")]
    Serialize(String),

    #[error("signing key rejected: {0}")]
    Key(String),
}

/// Base64 policy plus its signature, as posted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPolicy {
    pub policy: String,
    pub signature: String,
}

/// `base64(HMAC-SHA1(key, message))`, the primitive behind every Aliyun v1 signature.
pub fn hmac_sha1_base64(key: &[u8], message: &[u8]) -> Result<String, SignError> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|e| SignError::Key(e.to_string()))?;
    mac.update(message);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Sign a PostObject policy with the temporary credential's secret.
pub fn sign_policy(
    policy: &PolicyDocument,
    credential: &TemporaryCredential,
) -> Result<SignedPolicy, SignError> {
    let json = serde_json::to_string(policy).map_err(|e| SignError::Serialize(e.to_string()))?;
    let encoded = STANDARD.encode(json.as_bytes());
    let signature = hmac_sha1_base64(
        credential.access_key_secret.as_bytes(),
        encoded.as_bytes(),
    )?;

    Ok(SignedPolicy {
        policy: encoded,
        signature,
    })
}
