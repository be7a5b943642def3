use std::sync::Arc;

use sqlx::MySqlPool;

use crate::auth::{AuthError, IdentityVerifier};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, NoteRepository, PetRepository};
use crate::oss::{AliyunStsClient, CredentialBroker, OssClient, OssError, StsError, UploadAuthorizer};

/// Read-only dependencies shared by all handlers. Nothing in here holds
/// temporary credentials.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Arc<IdentityVerifier>,
    pub authorizer: Arc<UploadAuthorizer>,
    pub oss: Arc<OssClient>,
    pub pool: MySqlPool,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Sts(#[from] StsError),
    #[error(transparent)]
    Oss(#[from] OssError),
}

impl AppState {
    /// Production wiring: Aliyun STS broker, lazy MySQL pool.
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        let broker = Arc::new(AliyunStsClient::new(&config.sts, &config.storage)?);
        let oss = OssClient::new(&config.storage)?;
        let pool = DatabaseManager::connect_lazy(&config.database);
        Self::with_parts(config, broker, oss, pool)
    }

    pub fn with_parts(
        config: AppConfig,
        broker: Arc<dyn CredentialBroker>,
        oss: OssClient,
        pool: MySqlPool,
    ) -> Result<Self, StateError> {
        let verifier = IdentityVerifier::from_config(&config.security)?;
        let authorizer = UploadAuthorizer::new(&config, broker);

        Ok(Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            authorizer: Arc::new(authorizer),
            oss: Arc::new(oss),
            pool,
        })
    }

    pub fn pets(&self) -> PetRepository {
        PetRepository::new(self.pool.clone())
    }

    pub fn notes(&self) -> NoteRepository {
        NoteRepository::new(self.pool.clone())
    }
}
