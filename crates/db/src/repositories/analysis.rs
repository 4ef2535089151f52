use sqlx::sqlite::SqliteRow;

use leadflow_core::domain::analysis::{
    AiAnalysis, AnalysisId, ContactChannel, LeadQuality, RecommendedAction, Urgency,
};
use leadflow_core::domain::lead::{LeadId, LeadServiceId, TenantId};
use leadflow_core::normalize::LenientEnum;

use super::codec::{get, get_enum, get_json, get_timestamp, get_uuid, timestamp, to_json};
use super::{AnalysisRepository, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, tenant_id, lead_id, lead_service_id, urgency,
        urgency_reason, lead_quality, recommended_action, missing_information,
        preferred_channel, suggested_message, summary, is_fallback, created_at
 FROM ai_analysis
 WHERE tenant_id = ? AND lead_service_id = ?";

pub struct SqlAnalysisRepository {
    pool: DbPool,
}

impl SqlAnalysisRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_analysis(row: &SqliteRow) -> Result<AiAnalysis, RepositoryError> {
    Ok(AiAnalysis {
        id: AnalysisId(get_uuid(row, "id")?),
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        lead_id: LeadId(get_uuid(row, "lead_id")?),
        lead_service_id: LeadServiceId(get_uuid(row, "lead_service_id")?),
        urgency: get_enum(row, "urgency", <Urgency as LenientEnum>::parse)?,
        urgency_reason: get(row, "urgency_reason")?,
        lead_quality: get_enum(row, "lead_quality", <LeadQuality as LenientEnum>::parse)?,
        recommended_action: get_enum(
            row,
            "recommended_action",
            <RecommendedAction as LenientEnum>::parse,
        )?,
        missing_information: get_json(row, "missing_information")?,
        preferred_channel: get_enum(
            row,
            "preferred_channel",
            <ContactChannel as LenientEnum>::parse,
        )?,
        suggested_message: get(row, "suggested_message")?,
        summary: get(row, "summary")?,
        is_fallback: get(row, "is_fallback")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait::async_trait]
impl AnalysisRepository for SqlAnalysisRepository {
    async fn save(&self, analysis: AiAnalysis) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO ai_analysis (id, tenant_id, lead_id, lead_service_id, urgency,
                                      urgency_reason, lead_quality, recommended_action,
                                      missing_information, preferred_channel, suggested_message,
                                      summary, is_fallback, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(analysis.id.0.to_string())
        .bind(analysis.tenant_id.0.to_string())
        .bind(analysis.lead_id.0.to_string())
        .bind(analysis.lead_service_id.0.to_string())
        .bind(analysis.urgency.as_str())
        .bind(&analysis.urgency_reason)
        .bind(analysis.lead_quality.as_str())
        .bind(analysis.recommended_action.as_str())
        .bind(to_json(&analysis.missing_information)?)
        .bind(analysis.preferred_channel.as_str())
        .bind(&analysis.suggested_message)
        .bind(&analysis.summary)
        .bind(analysis.is_fallback)
        .bind(timestamp(&analysis.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Option<AiAnalysis>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC LIMIT 1"))
            .bind(tenant_id.0.to_string())
            .bind(lead_service_id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_analysis).transpose()
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<AiAnalysis>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC, rowid ASC"))
            .bind(tenant_id.0.to_string())
            .bind(lead_service_id.0.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_analysis).collect()
    }
}
