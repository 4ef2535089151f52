use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use leadflow_core::domain::lead::{Lead, LeadId, LeadService, LeadServiceId, TenantId};
use leadflow_core::domain::stage::{LeadServiceStatus, PipelineStage};
use leadflow_core::normalize::LenientEnum;

use super::codec::{get, get_enum, get_json, get_timestamp, get_uuid, timestamp, to_json};
use super::{LeadRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLeadRepository {
    pool: DbPool,
}

impl SqlLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn update_column(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        statement: &'static str,
        value: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(statement)
            .bind(value)
            .bind(timestamp(&Utc::now()))
            .bind(id.0.to_string())
            .bind(tenant_id.0.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "lead_service", id: id.to_string() });
        }
        Ok(())
    }
}

fn row_to_lead(row: &SqliteRow) -> Result<Lead, RepositoryError> {
    Ok(Lead {
        id: LeadId(get_uuid(row, "id")?),
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        consumer_name: get(row, "consumer_name")?,
        phone: get(row, "phone")?,
        email: get(row, "email")?,
        zip_code: get(row, "zip_code")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn row_to_service(row: &SqliteRow) -> Result<LeadService, RepositoryError> {
    Ok(LeadService {
        id: LeadServiceId(get_uuid(row, "id")?),
        lead_id: LeadId(get_uuid(row, "lead_id")?),
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        service_type: get(row, "service_type")?,
        stage: get_enum(row, "stage", PipelineStage::parse)?,
        status: get_enum(row, "status", <LeadServiceStatus as LenientEnum>::parse)?,
        consumer_note: get(row, "consumer_note")?,
        customer_preferences: get_json(row, "customer_preferences")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

#[async_trait::async_trait]
impl LeadRepository for SqlLeadRepository {
    async fn find_lead(
        &self,
        tenant_id: &TenantId,
        id: &LeadId,
    ) -> Result<Option<Lead>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, consumer_name, phone, email, zip_code, created_at
             FROM lead WHERE id = ? AND tenant_id = ?",
        )
        .bind(id.0.to_string())
        .bind(tenant_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_lead).transpose()
    }

    async fn save_lead(&self, lead: Lead) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lead (id, tenant_id, consumer_name, phone, email, zip_code, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 consumer_name = excluded.consumer_name,
                 phone = excluded.phone,
                 email = excluded.email,
                 zip_code = excluded.zip_code",
        )
        .bind(lead.id.0.to_string())
        .bind(lead.tenant_id.0.to_string())
        .bind(&lead.consumer_name)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(&lead.zip_code)
        .bind(timestamp(&lead.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_service(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
    ) -> Result<Option<LeadService>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, lead_id, tenant_id, service_type, stage, status, consumer_note,
                    customer_preferences, updated_at
             FROM lead_service WHERE id = ? AND tenant_id = ?",
        )
        .bind(id.0.to_string())
        .bind(tenant_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_service).transpose()
    }

    async fn save_service(&self, service: LeadService) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO lead_service (id, lead_id, tenant_id, service_type, stage, status,
                                       consumer_note, customer_preferences, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 service_type = excluded.service_type,
                 stage = excluded.stage,
                 status = excluded.status,
                 consumer_note = excluded.consumer_note,
                 customer_preferences = excluded.customer_preferences,
                 updated_at = excluded.updated_at",
        )
        .bind(service.id.0.to_string())
        .bind(service.lead_id.0.to_string())
        .bind(service.tenant_id.0.to_string())
        .bind(&service.service_type)
        .bind(service.stage.as_str())
        .bind(service.status.as_str())
        .bind(&service.consumer_note)
        .bind(to_json(&service.customer_preferences)?)
        .bind(timestamp(&service.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_stage(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        stage: PipelineStage,
    ) -> Result<(), RepositoryError> {
        self.update_column(
            tenant_id,
            id,
            "UPDATE lead_service SET stage = ?, updated_at = ? WHERE id = ? AND tenant_id = ?",
            stage.as_str(),
        )
        .await
    }

    async fn update_status(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        status: LeadServiceStatus,
    ) -> Result<(), RepositoryError> {
        self.update_column(
            tenant_id,
            id,
            "UPDATE lead_service SET status = ?, updated_at = ? WHERE id = ? AND tenant_id = ?",
            status.as_str(),
        )
        .await
    }

    async fn update_service_type(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        service_type: &str,
    ) -> Result<(), RepositoryError> {
        self.update_column(
            tenant_id,
            id,
            "UPDATE lead_service SET service_type = ?, updated_at = ? WHERE id = ? AND tenant_id = ?",
            service_type,
        )
        .await
    }
}
