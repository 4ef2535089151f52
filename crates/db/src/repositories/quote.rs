use chrono::{Datelike, Utc};
use sqlx::sqlite::SqliteRow;

use leadflow_core::domain::lead::{LeadId, LeadServiceId, TenantId};
use leadflow_core::domain::quote::{DiscountType, PricingMode, Quote, QuoteId};
use leadflow_core::normalize::LenientEnum;

use super::codec::{get, get_enum, get_json, get_timestamp, get_uuid, timestamp, to_json};
use super::{format_quote_number, QuoteRepository, RepositoryError};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, tenant_id, lead_id, lead_service_id, number,
        pricing_mode, discount_type, discount_value, items, totals, notes, created_at
 FROM quote";

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_quote(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    Ok(Quote {
        id: QuoteId(get_uuid(row, "id")?),
        number: get(row, "number")?,
        tenant_id: TenantId(get_uuid(row, "tenant_id")?),
        lead_id: LeadId(get_uuid(row, "lead_id")?),
        lead_service_id: LeadServiceId(get_uuid(row, "lead_service_id")?),
        pricing_mode: get_enum(row, "pricing_mode", <PricingMode as LenientEnum>::parse)?,
        discount_type: get_enum(row, "discount_type", DiscountType::parse)?,
        discount_value: get(row, "discount_value")?,
        items: get_json(row, "items")?,
        totals: get_json(row, "totals")?,
        notes: get(row, "notes")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ? AND tenant_id = ?"))
            .bind(id.0.to_string())
            .bind(tenant_id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_quote).transpose()
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote (id, tenant_id, lead_id, lead_service_id, number, pricing_mode,
                                discount_type, discount_value, items, totals, subtotal_cents,
                                discount_amount_cents, vat_total_cents, total_cents, notes,
                                created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 pricing_mode = excluded.pricing_mode,
                 discount_type = excluded.discount_type,
                 discount_value = excluded.discount_value,
                 items = excluded.items,
                 totals = excluded.totals,
                 subtotal_cents = excluded.subtotal_cents,
                 discount_amount_cents = excluded.discount_amount_cents,
                 vat_total_cents = excluded.vat_total_cents,
                 total_cents = excluded.total_cents,
                 notes = excluded.notes",
        )
        .bind(quote.id.0.to_string())
        .bind(quote.tenant_id.0.to_string())
        .bind(quote.lead_id.0.to_string())
        .bind(quote.lead_service_id.0.to_string())
        .bind(&quote.number)
        .bind(quote.pricing_mode.as_str())
        .bind(quote.discount_type.as_str())
        .bind(quote.discount_value)
        .bind(to_json(&quote.items)?)
        .bind(to_json(&quote.totals)?)
        .bind(quote.totals.subtotal_cents)
        .bind(quote.totals.discount_amount_cents)
        .bind(quote.totals.vat_total_cents)
        .bind(quote.totals.total_cents)
        .bind(&quote.notes)
        .bind(timestamp(&quote.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE tenant_id = ? AND lead_service_id = ?
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(tenant_id.0.to_string())
        .bind(lead_service_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_quote).collect()
    }

    async fn next_number(&self, tenant_id: &TenantId) -> Result<String, RepositoryError> {
        let sequence: i64 = sqlx::query_scalar(
            "INSERT INTO quote_number_sequence (tenant_id, last_value) VALUES (?, 1)
             ON CONFLICT(tenant_id) DO UPDATE SET last_value = last_value + 1
             RETURNING last_value",
        )
        .bind(tenant_id.0.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(format_quote_number(Utc::now().year(), sequence))
    }
}
