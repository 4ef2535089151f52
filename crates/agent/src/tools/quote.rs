use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use leadflow_core::calc::{apply_catalog_prices, calculate_quote_totals};
use leadflow_core::domain::product::ProductId;
use leadflow_core::domain::quote::{DiscountType, PricingMode, Quote, QuoteId, QuoteItem};
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};
use leadflow_core::normalize::LenientEnum;

use super::{parse_args, success, Tool, ToolName, ToolSpec};
use crate::context::RunScope;
use crate::error::ToolError;
use crate::services::PipelineServices;

#[derive(Debug, Deserialize)]
struct DraftItemArgs {
    description: String,
    /// Models send quantities as numbers or strings; both are kept as exact decimal text.
    quantity: Value,
    #[serde(alias = "unitPriceCents")]
    unit_price_cents: i64,
    #[serde(alias = "taxRateBps", alias = "vat_rate_bps")]
    tax_rate_bps: i64,
    #[serde(default, alias = "isOptional")]
    is_optional: bool,
    #[serde(default, alias = "isSelected")]
    is_selected: Option<bool>,
    #[serde(default, alias = "catalogProductId", alias = "product_id")]
    catalog_product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DraftQuoteArgs {
    items: Vec<DraftItemArgs>,
    #[serde(default, alias = "pricingMode")]
    pricing_mode: Option<String>,
    #[serde(default, alias = "discountType")]
    discount_type: Option<String>,
    #[serde(default, alias = "discountValue")]
    discount_value: i64,
    #[serde(default)]
    notes: Option<String>,
}

fn quantity_text(raw: &Value) -> Result<String, ToolError> {
    match raw {
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(ToolError::invalid_arguments(
            ToolName::DraftQuote.as_str(),
            format!("quantity must be a number or decimal string, got {other}"),
        )),
    }
}

impl DraftItemArgs {
    fn into_item(self) -> Result<QuoteItem, ToolError> {
        Ok(QuoteItem {
            quantity: quantity_text(&self.quantity)?,
            description: self.description,
            unit_price_cents: self.unit_price_cents,
            tax_rate_bps: self.tax_rate_bps,
            is_optional: self.is_optional,
            is_selected: self.is_selected.unwrap_or(true),
            catalog_product_id: self
                .catalog_product_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .map(ProductId),
        })
    }
}

/// Drafts a quote. Catalog prices are resolved on the backend and override whatever the
/// model estimated for a catalog line.
pub struct DraftQuoteTool {
    services: Arc<PipelineServices>,
}

impl DraftQuoteTool {
    pub fn new(services: Arc<PipelineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for DraftQuoteTool {
    fn name(&self) -> ToolName {
        ToolName::DraftQuote
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Draft a quote for the lead service. Prices in cents, VAT in basis \
                          points (2100 = 21%). Set catalog_product_id for catalog products; \
                          the catalog price is applied automatically.",
            input_schema: json!({
                "type": "object",
                "required": ["items"],
                "properties": {
                    "items": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "required": ["description", "quantity", "unit_price_cents",
                                         "tax_rate_bps"],
                            "properties": {
                                "description": { "type": "string" },
                                "quantity": { "type": ["string", "number"] },
                                "unit_price_cents": { "type": "integer", "minimum": 0 },
                                "tax_rate_bps": { "type": "integer", "minimum": 0,
                                                  "maximum": 10000 },
                                "is_optional": { "type": "boolean" },
                                "is_selected": { "type": "boolean" },
                                "catalog_product_id": { "type": "string" }
                            }
                        }
                    },
                    "pricing_mode": { "type": "string", "enum": ["exclusive", "inclusive"] },
                    "discount_type": { "type": "string", "enum": ["percentage", "fixed"] },
                    "discount_value": { "type": "integer", "minimum": 0 },
                    "notes": { "type": "string" }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: DraftQuoteArgs = parse_args(self.name(), input)?;
        if args.items.is_empty() {
            return Err(ToolError::ValidationFailed("a quote needs at least one item".to_string()));
        }

        let pricing_mode = args
            .pricing_mode
            .as_deref()
            .map(PricingMode::normalize)
            .unwrap_or(PricingMode::Exclusive);
        let discount_type = match args.discount_type.as_deref() {
            None => DiscountType::Percentage,
            Some(raw) => DiscountType::parse(raw).ok_or_else(|| ToolError::InvalidEnum {
                kind: "discount_type",
                raw: raw.to_string(),
            })?,
        };

        let mut items = args
            .items
            .into_iter()
            .map(DraftItemArgs::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        let mut prices = BTreeMap::new();
        for product_id in items.iter().filter_map(|item| item.catalog_product_id.as_ref()) {
            if prices.contains_key(product_id) {
                continue;
            }
            if let Some(price) =
                self.services.catalog.find_price(&context.tenant_id, product_id).await?
            {
                prices.insert(product_id.clone(), price);
            }
        }
        let overrides = apply_catalog_prices(&mut items, &prices);
        let totals =
            calculate_quote_totals(&items, pricing_mode, discount_type, args.discount_value)?;

        let quote = Quote {
            id: QuoteId::new(),
            number: self.services.quotes.next_number(&context.tenant_id).await?,
            tenant_id: context.tenant_id,
            lead_id: context.lead_id,
            lead_service_id: context.lead_service_id,
            pricing_mode,
            discount_type,
            discount_value: args.discount_value,
            items,
            totals,
            notes: args.notes.filter(|notes| !notes.trim().is_empty()),
            created_at: Utc::now(),
        };
        let (quote_id, quote_number, total_cents, item_count) =
            (quote.id, quote.number.clone(), quote.totals.total_cents, quote.items.len());

        self.services.quotes.save(quote).await?;
        scope.tracker().record_quote(quote_id);
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::QuoteDrafted,
                    context.actor.clone(),
                    format!("Quote {quote_number} drafted"),
                )
                .with_metadata("quote_id", quote_id.to_string())
                .with_metadata("quote_number", quote_number.clone())
                .with_metadata("total_cents", total_cents.to_string())
                .with_metadata("price_overrides", overrides.len().to_string()),
            )
            .await?;

        info!(
            event_name = "estimator.quote_drafted",
            lead_service_id = %context.lead_service_id,
            quote_id = %quote_id,
            total_cents,
            price_overrides = overrides.len(),
            "quote drafted"
        );

        Ok(success(json!({
            "quote_id": quote_id,
            "quote_number": quote_number,
            "item_count": item_count,
            "total_cents": total_cents,
            "price_overrides": overrides,
        })))
    }
}
