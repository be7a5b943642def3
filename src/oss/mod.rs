//! Aliyun OSS: upload grants for direct client uploads, plus the few object
//! operations the service performs itself.

pub mod client;
pub mod grant;
pub mod policy;
pub mod signer;
pub mod sts;

pub use client::{OssClient, OssError};
pub use grant::{GrantError, UploadAuthorizer, UploadGrant};
pub use policy::{ContentClass, PolicyDocument, UploadScope};
pub use signer::{sign_policy, SignError, SignedPolicy};
pub use sts::{AliyunStsClient, AssumeRoleRequest, CredentialBroker, StsError, TemporaryCredential};
