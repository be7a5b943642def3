use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Row of the `note` table; `images` and `pets` are JSON columns.
#[derive(Debug, Clone, FromRow)]
#[sqlx(rename_all = "camelCase")]
pub struct NoteRow {
    pub id: i64,
    pub owner_id: String,
    pub content: Option<String>,
    #[sqlx(rename = "type")]
    pub kind: Option<String>,
    pub images: Json<Vec<String>>,
    pub pets: Json<Vec<i64>>,
    pub note_time: Option<i64>,
    pub create_time: i64,
}

/// Note as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub owner_id: String,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub images: Vec<String>,
    pub pets: Vec<i64>,
    pub note_time: Option<i64>,
    pub create_time: i64,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            content: row.content,
            kind: row.kind,
            images: row.images.0,
            pets: row.pets.0,
            note_time: row.note_time,
            create_time: row.create_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub pets: Vec<i64>,
    pub note_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_defaults_missing_lists() {
        let input: NoteInput = serde_json::from_value(json!({
            "content": "First walk",
            "type": "daily",
            "noteTime": 1700000000
        }))
        .unwrap();
        assert_eq!(input.kind.as_deref(), Some("daily"));
        assert!(input.images.is_empty());
        assert!(input.pets.is_empty());
    }

    #[test]
    fn note_serializes_type_field() {
        let note = Note::from(NoteRow {
            id: 5,
            owner_id: "42".into(),
            content: None,
            kind: Some("vet".into()),
            images: Json(vec!["u".into()]),
            pets: Json(vec![1, 2]),
            note_time: Some(10),
            create_time: 11,
        });
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["type"], "vet");
        assert_eq!(value["pets"], json!([1, 2]));
        assert_eq!(value["noteTime"], 10);
    }
}
