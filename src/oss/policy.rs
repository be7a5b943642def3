use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::auth::CallerId;

/// Kinds of object a client may upload directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Avatar,
    NoteImage,
}

impl ContentClass {
    pub fn base_dir(self) -> &'static str {
        match self {
            ContentClass::Avatar => "pet-avatar",
            ContentClass::NoteImage => "pet-note",
        }
    }

    pub fn max_object_bytes(self) -> u64 {
        match self {
            ContentClass::Avatar => 1024 * 1024,
            ContentClass::NoteImage => 2 * 1024 * 1024,
        }
    }
}

/// Where and how large one caller's upload may be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadScope {
    pub directory_prefix: String,
    pub max_object_bytes: u64,
    pub content_class: ContentClass,
}

impl UploadScope {
    /// The prefix is built from the verified identity only; there is no way
    /// to pass request input into it.
    pub fn for_caller(caller: &CallerId, content_class: ContentClass) -> Self {
        Self {
            directory_prefix: format!("{}/{}/", content_class.base_dir(), caller),
            max_object_bytes: content_class.max_object_bytes(),
            content_class,
        }
    }
}

/// A single server-enforced upload condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    ContentLengthRange { min: u64, max: u64 },
    KeyStartsWith(String),
    Bucket(String),
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::ContentLengthRange { min, max } => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element("content-length-range")?;
                seq.serialize_element(min)?;
                seq.serialize_element(max)?;
                seq.end()
            }
            Condition::KeyStartsWith(prefix) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element("starts-with")?;
                seq.serialize_element("$key")?;
                seq.serialize_element(prefix)?;
                seq.end()
            }
            Condition::Bucket(bucket) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("bucket", bucket)?;
                map.end()
            }
        }
    }
}

/// OSS PostObject policy. Field order is part of the signed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDocument {
    #[serde(serialize_with = "serialize_expiration")]
    pub expiration: DateTime<Utc>,
    pub conditions: Vec<Condition>,
}

fn serialize_expiration<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl PolicyDocument {
    /// Build the policy for `scope` in `bucket`, expiring `ttl` after `now`
    /// but never after `not_after`.
    pub fn build(
        scope: &UploadScope,
        bucket: &str,
        now: DateTime<Utc>,
        ttl: Duration,
        not_after: DateTime<Utc>,
    ) -> Self {
        let expiration = (now + ttl).min(not_after);

        Self {
            expiration,
            conditions: vec![
                Condition::ContentLengthRange {
                    min: 0,
                    max: scope.max_object_bytes,
                },
                Condition::KeyStartsWith(scope.directory_prefix.clone()),
                Condition::Bucket(bucket.to_string()),
            ],
        }
    }
}
