use std::fmt;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::SecurityConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredential,

    #[error("Authorization header must be '<scheme> <token>'")]
    InvalidCredentialFormat,

    #[error("Invalid token: {0}")]
    Unauthorized(String),

    #[error("Invalid verification key: {0}")]
    InvalidKey(String),
}

/// Verified caller identity. Only `[A-Za-z0-9_-]`, never empty, so it can be
/// substituted into an object key prefix without escaping the caller namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(String);

impl CallerId {
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        if raw.is_empty() {
            return Err(AuthError::Unauthorized("empty userId claim".to_string()));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AuthError::Unauthorized(
                "userId claim contains unsupported characters".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token payload issued by the login service. `userId` arrives as a number or
/// a string depending on the issuer version.
/// `exp` is validated by `jsonwebtoken` itself.
#[derive(Debug, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Value,
}

impl Claims {
    pub fn caller_id(&self) -> Result<CallerId, AuthError> {
        match &self.user_id {
            Value::String(s) => CallerId::parse(s),
            Value::Number(n) if n.is_u64() || n.is_i64() => CallerId::parse(&n.to_string()),
            _ => Err(AuthError::Unauthorized(
                "userId claim must be a string or integer".to_string(),
            )),
        }
    }
}

/// Split `"<scheme> <token>"`. The scheme itself is not checked; the token
/// signature is what carries trust.
pub fn split_credential(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::InvalidCredentialFormat)?;
    let token = token.trim();
    if scheme.is_empty() || token.is_empty() || token.contains(' ') {
        return Err(AuthError::InvalidCredentialFormat);
    }
    Ok(token)
}

/// Verifies bearer tokens against the issuer's public key.
pub struct IdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AuthError> {
        let algorithm: Algorithm = config
            .jwt_algorithm
            .parse()
            .map_err(|e: jsonwebtoken::errors::Error| AuthError::InvalidKey(e.to_string()))?;
        Self::new(config.jwt_public_key.as_bytes(), algorithm)
    }

    pub fn new(public_key_pem: &[u8], algorithm: Algorithm) -> Result<Self, AuthError> {
        let key = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(public_key_pem),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(public_key_pem),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(public_key_pem),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Err(AuthError::InvalidKey(
                    "symmetric algorithms are not accepted".to_string(),
                ))
            }
        }
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        let mut validation = Validation::new(algorithm);
        // Issuer tokens historically omit `exp`; when present it is still checked.
        validation.required_spec_claims.clear();
        validation.validate_exp = true;

        Ok(Self { key, validation })
    }

    /// Full check of a raw header value.
    pub fn verify_header(&self, header: &str) -> Result<CallerId, AuthError> {
        let token = split_credential(header)?;
        self.verify_token(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<CallerId, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::Unauthorized(e.to_string()))?;
        data.claims.caller_id()
    }
}
