use sqlx::types::Json;
use sqlx::MySqlPool;

use crate::auth::CallerId;
use crate::database::manager::DatabaseError;
use crate::database::models::{Note, NoteInput, NoteRow, Pet, PetInput};

// Fixed column lists; table and column names are never built from input.
const PET_COLUMNS: &str = "id, ownerId, lastOwnerId, name, family, gender, birthTime, \
                           avatar, description, createTime, updateTime";
const NOTE_COLUMNS: &str = "id, ownerId, content, type, images, pets, noteTime, createTime";

/// Owner id written on soft-deleted pets.
const ORPHAN_OWNER: &str = "0";

pub struct PetRepository {
    pool: MySqlPool,
}

impl PetRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_owner(&self, owner: &CallerId) -> Result<Vec<Pet>, DatabaseError> {
        let sql = format!("SELECT {} FROM pet WHERE ownerId = ?", PET_COLUMNS);
        let pets = sqlx::query_as::<_, Pet>(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(pets)
    }

    pub async fn find_owned(&self, owner: &CallerId, id: i64) -> Result<Pet, DatabaseError> {
        let sql = format!("SELECT {} FROM pet WHERE id = ? AND ownerId = ?", PET_COLUMNS);
        sqlx::query_as::<_, Pet>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("pet {}", id)))
    }

    pub async fn insert(
        &self,
        owner: &CallerId,
        input: PetInput,
        now: i64,
    ) -> Result<Pet, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO pet (ownerId, name, family, gender, birthTime, avatar, description, createTime) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner.as_str())
        .bind(&input.name)
        .bind(&input.family)
        .bind(&input.gender)
        .bind(input.birth_time)
        .bind(&input.avatar)
        .bind(&input.description)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Pet {
            id: result.last_insert_id() as i64,
            owner_id: owner.to_string(),
            last_owner_id: None,
            name: input.name,
            family: input.family,
            gender: input.gender,
            birth_time: input.birth_time,
            avatar: input.avatar,
            description: input.description,
            create_time: now,
            update_time: None,
        })
    }

    /// Overwrite the editable fields of an owned pet.
    pub async fn update(
        &self,
        owner: &CallerId,
        id: i64,
        input: PetInput,
        now: i64,
    ) -> Result<Pet, DatabaseError> {
        let result = sqlx::query(
            "UPDATE pet SET name = ?, family = ?, gender = ?, birthTime = ?, avatar = ?, \
             description = ?, updateTime = ? WHERE id = ? AND ownerId = ?",
        )
        .bind(&input.name)
        .bind(&input.family)
        .bind(&input.gender)
        .bind(input.birth_time)
        .bind(&input.avatar)
        .bind(&input.description)
        .bind(now)
        .bind(id)
        .bind(owner.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("pet {}", id)));
        }
        self.find_owned(owner, id).await
    }

    /// Pets are never removed; they are detached from the owner, who is kept
    /// in `lastOwnerId`.
    pub async fn soft_delete(&self, owner: &CallerId, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE pet SET lastOwnerId = ?, ownerId = ? WHERE id = ? AND ownerId = ?",
        )
        .bind(owner.as_str())
        .bind(ORPHAN_OWNER)
        .bind(id)
        .bind(owner.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("pet {}", id)));
        }
        Ok(())
    }
}

pub struct NoteRepository {
    pool: MySqlPool,
}

impl NoteRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Newest first by `noteTime`.
    pub async fn list_for_owner(&self, owner: &CallerId) -> Result<Vec<Note>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM note WHERE ownerId = ? ORDER BY noteTime DESC",
            NOTE_COLUMNS
        );
        let rows = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Note::from).collect())
    }

    pub async fn find_owned(&self, owner: &CallerId, id: i64) -> Result<Option<Note>, DatabaseError> {
        let sql = format!("SELECT {} FROM note WHERE id = ? AND ownerId = ?", NOTE_COLUMNS);
        let row = sqlx::query_as::<_, NoteRow>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Note::from))
    }

    pub async fn insert(
        &self,
        owner: &CallerId,
        input: NoteInput,
        now: i64,
    ) -> Result<Note, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO note (ownerId, content, type, images, pets, noteTime, createTime) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(owner.as_str())
        .bind(&input.content)
        .bind(&input.kind)
        .bind(Json(&input.images))
        .bind(Json(&input.pets))
        .bind(input.note_time)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Note {
            id: result.last_insert_id() as i64,
            owner_id: owner.to_string(),
            content: input.content,
            kind: input.kind,
            images: input.images,
            pets: input.pets,
            note_time: input.note_time,
            create_time: now,
        })
    }

    pub async fn delete_owned(&self, owner: &CallerId, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM note WHERE id = ? AND ownerId = ?")
            .bind(id)
            .bind(owner.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("note {}", id)));
        }
        Ok(())
    }
}
