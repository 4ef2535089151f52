use sqlx::sqlite::SqliteRow;

use leadflow_core::domain::lead::{LeadId, LeadServiceId, TenantId};
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};

use super::codec::{get, get_enum, get_json, get_timestamp, get_uuid, timestamp, to_json};
use super::{RepositoryError, TimelineRepository};
use crate::DbPool;

pub struct SqlTimelineRepository {
    pool: DbPool,
}

impl SqlTimelineRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_event(row: &SqliteRow) -> Result<TimelineEvent, RepositoryError> {
    Ok(TimelineEvent {
        id: get_uuid(row, "id")?,
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        lead_id: LeadId(get_uuid(row, "lead_id")?),
        lead_service_id: LeadServiceId(get_uuid(row, "lead_service_id")?),
        kind: get_enum(row, "kind", TimelineEventKind::parse)?,
        actor: get_json(row, "actor")?,
        summary: get(row, "summary")?,
        metadata: get_json(row, "metadata")?,
        occurred_at: get_timestamp(row, "occurred_at")?,
    })
}

#[async_trait::async_trait]
impl TimelineRepository for SqlTimelineRepository {
    async fn append(&self, event: TimelineEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO timeline_event (id, tenant_id, lead_id, lead_service_id, kind, actor,
                                         summary, metadata, occurred_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(event.tenant_id.0.to_string())
        .bind(event.lead_id.0.to_string())
        .bind(event.lead_service_id.0.to_string())
        .bind(event.kind.as_str())
        .bind(to_json(&event.actor)?)
        .bind(&event.summary)
        .bind(to_json(&event.metadata)?)
        .bind(timestamp(&event.occurred_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<TimelineEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, tenant_id, lead_id, lead_service_id, kind, actor, summary, metadata,
                    occurred_at
             FROM timeline_event
             WHERE tenant_id = ? AND lead_service_id = ?
             ORDER BY occurred_at ASC, rowid ASC",
        )
        .bind(tenant_id.0.to_string())
        .bind(lead_service_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }
}
