use sqlx::sqlite::SqliteRow;

use leadflow_core::domain::lead::{LeadId, LeadServiceId, TenantId};
use leadflow_core::domain::note::{LeadNote, NoteId};

use super::codec::{get, get_json, get_timestamp, get_uuid, timestamp, to_json};
use super::{NoteRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNoteRepository {
    pool: DbPool,
}

impl SqlNoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_note(row: &SqliteRow) -> Result<LeadNote, RepositoryError> {
    Ok(LeadNote {
        id: NoteId(get_uuid(row, "id")?),
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        lead_id: LeadId(get_uuid(row, "lead_id")?),
        lead_service_id: LeadServiceId(get_uuid(row, "lead_service_id")?),
        body: get(row, "body")?,
        author: get_json(row, "author")?,
        is_fallback: get(row, "is_fallback")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait::async_trait]
impl NoteRepository for SqlNoteRepository {
    async fn save(&self, note: LeadNote) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lead_note (id, tenant_id, lead_id, lead_service_id, body, author,
                                    is_fallback, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(note.id.0.to_string())
        .bind(note.tenant_id.0.to_string())
        .bind(note.lead_id.0.to_string())
        .bind(note.lead_service_id.0.to_string())
        .bind(&note.body)
        .bind(to_json(&note.author)?)
        .bind(note.is_fallback)
        .bind(timestamp(&note.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<LeadNote>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, lead_id, lead_service_id, body, author, is_fallback, created_at
             FROM lead_note
             WHERE tenant_id = ? AND lead_service_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(tenant_id.0.to_string())
        .bind(lead_service_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_note).collect()
    }
}
