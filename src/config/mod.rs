use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Lower and upper bounds Aliyun STS accepts for `DurationSeconds`.
pub const MIN_POLICY_TTL_SECS: u64 = 900;
pub const MAX_POLICY_TTL_SECS: u64 = 43_200;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub sts: StsConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Service identity and bucket location for Aliyun OSS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    #[serde(skip_serializing)]
    pub access_key_secret: String,
    pub endpoint_domain: String,
    /// Request timeout for object operations the service performs itself.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StsConfig {
    pub role_arn: String,
    pub endpoint: String,
    pub session_name: String,
    pub timeout_secs: u64,
    pub policy_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_public_key: String,
    pub jwt_algorithm: String,
}

impl AppConfig {
    /// Load from the process environment and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable source. Tests use this with a map so
    /// they never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup)?;

        config.validate()?;
        Ok(config)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Server overrides
        if let Some(v) = var("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = var("SECURITY_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Database overrides
        if let Some(v) = var("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = var("DB_PORT") {
            self.database.port = parse_var("DB_PORT", &v)?;
        }
        if let Some(v) = var("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = var("DB_NAME") {
            self.database.database = v;
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse_var("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }

        // Storage overrides
        if let Some(v) = var("OSS_REGION") {
            self.storage.region = v;
        }
        if let Some(v) = var("OSS_BUCKET") {
            self.storage.bucket = v;
        }
        if let Some(v) = var("OSS_ACCESS_KEY_ID") {
            self.storage.access_key_id = v;
        }
        if let Some(v) = var("OSS_ACCESS_KEY_SECRET") {
            self.storage.access_key_secret = v;
        }
        if let Some(v) = var("OSS_ENDPOINT_DOMAIN") {
            self.storage.endpoint_domain = v;
        }
        if let Some(v) = var("OSS_TIMEOUT_SECS") {
            self.storage.timeout_secs = parse_var("OSS_TIMEOUT_SECS", &v)?;
        }

        // STS overrides
        if let Some(v) = var("STS_ROLE_ARN") {
            self.sts.role_arn = v;
        }
        if let Some(v) = var("STS_ENDPOINT") {
            self.sts.endpoint = v;
        }
        if let Some(v) = var("STS_SESSION_NAME") {
            self.sts.session_name = v;
        }
        if let Some(v) = var("STS_TIMEOUT_SECS") {
            self.sts.timeout_secs = parse_var("STS_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("UPLOAD_POLICY_TTL_SECS") {
            self.sts.policy_ttl_secs = parse_var("UPLOAD_POLICY_TTL_SECS", &v)?;
        }

        // Security overrides
        if let Some(v) = var("JWT_PUBLIC_KEY") {
            // Single-line env files carry the PEM with literal "\n"
            self.security.jwt_public_key = v.replace("\\n", "\n");
        } else if let Some(path) = var("JWT_PUBLIC_KEY_FILE") {
            self.security.jwt_public_key =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Invalid {
                    key: "JWT_PUBLIC_KEY_FILE",
                    reason: format!("{}: {}", path, e),
                })?;
        }
        if let Some(v) = var("JWT_ALGORITHM") {
            self.security.jwt_algorithm = v;
        }

        Ok(self)
    }

    /// Startup checks. Anything missing here would otherwise surface as a
    /// per-request failure of the upload flow.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("DB_HOST", &self.database.host),
            ("DB_USER", &self.database.user),
            ("DB_NAME", &self.database.database),
            ("OSS_REGION", &self.storage.region),
            ("OSS_BUCKET", &self.storage.bucket),
            ("OSS_ACCESS_KEY_ID", &self.storage.access_key_id),
            ("OSS_ACCESS_KEY_SECRET", &self.storage.access_key_secret),
            ("STS_ROLE_ARN", &self.sts.role_arn),
            ("JWT_PUBLIC_KEY", &self.security.jwt_public_key),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(key));
            }
        }

        if !(MIN_POLICY_TTL_SECS..=MAX_POLICY_TTL_SECS).contains(&self.sts.policy_ttl_secs) {
            return Err(ConfigError::Invalid {
                key: "UPLOAD_POLICY_TTL_SECS",
                reason: format!(
                    "{} is outside {}..={}",
                    self.sts.policy_ttl_secs, MIN_POLICY_TTL_SECS, MAX_POLICY_TTL_SECS
                ),
            });
        }
        if self.sts.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "STS_TIMEOUT_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.storage.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "OSS_TIMEOUT_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if url::Url::parse(&self.sts.endpoint).is_err() {
            return Err(ConfigError::Invalid {
                key: "STS_ENDPOINT",
                reason: format!("'{}' is not a URL", self.sts.endpoint),
            });
        }
        if self.security.jwt_algorithm.parse::<jsonwebtoken::Algorithm>().is_err() {
            return Err(ConfigError::Invalid {
                key: "JWT_ALGORITHM",
                reason: format!("unknown algorithm '{}'", self.security.jwt_algorithm),
            });
        }

        Ok(())
    }

    /// Public upload host clients post to, e.g. `https://bucket.oss-cn-hangzhou.aliyuncs.com`.
    pub fn upload_host(&self) -> String {
        format!(
            "https://{}.{}.{}",
            self.storage.bucket, self.storage.region, self.storage.endpoint_domain
        )
    }

    fn base() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 9000,
                cors_origins: Vec::new(),
            },
            database: DatabaseConfig {
                host: "localhost".to_string(),
                port: 3306,
                user: String::new(),
                password: String::new(),
                database: String::new(),
                max_connections: 10,
                connection_timeout: 30,
            },
            storage: StorageConfig {
                region: String::new(),
                bucket: String::new(),
                access_key_id: String::new(),
                access_key_secret: String::new(),
                endpoint_domain: "aliyuncs.com".to_string(),
                timeout_secs: 10,
            },
            sts: StsConfig {
                role_arn: String::new(),
                endpoint: "https://sts.aliyuncs.com".to_string(),
                session_name: "pet-journal".to_string(),
                timeout_secs: 5,
                policy_ttl_secs: 3000,
            },
            security: SecurityConfig {
                jwt_public_key: String::new(),
                jwt_algorithm: "RS256".to_string(),
            },
        }
    }

    fn development() -> Self {
        Self::base()
    }

    fn staging() -> Self {
        let mut config = Self::base();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.server.cors_origins = vec!["https://staging.petjournal.app".to_string()];
        config
    }

    fn production() -> Self {
        let mut config = Self::base();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.sts.timeout_secs = 3;
        config.server.cors_origins = vec!["https://petjournal.app".to_string()];
        config
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("cannot parse '{}'", value),
    })
}
