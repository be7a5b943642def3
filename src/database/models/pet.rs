use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row of the `pet` table. Column names are camelCase, as the mobile client
/// reads them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
#[sqlx(rename_all = "camelCase")]
pub struct Pet {
    pub id: i64,
    pub owner_id: String,
    pub last_owner_id: Option<String>,
    pub name: Option<String>,
    pub family: Option<String>,
    pub gender: Option<String>,
    pub birth_time: Option<i64>,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub create_time: i64,
    pub update_time: Option<i64>,
}

/// Client-editable pet fields. Ownership and timestamps are never taken from
/// the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetInput {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub family: Option<String>,
    pub gender: Option<String>,
    pub birth_time: Option<i64>,
    pub avatar: Option<String>,
    pub description: Option<String>,
}
