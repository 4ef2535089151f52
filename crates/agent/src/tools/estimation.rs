use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use leadflow_core::calc::{calculate, calculate_estimate, CalculatorOperation, EstimateInput};
use leadflow_core::calc::CalcError;
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};
use leadflow_db::repositories::ProductSearch;

use super::{parse_args, success, Tool, ToolName, ToolSpec};
use crate::context::RunScope;
use crate::error::ToolError;
use crate::services::PipelineServices;

const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default, alias = "catalogOnly", alias = "use_catalog")]
    catalog_only: Option<bool>,
    #[serde(default, alias = "minScore")]
    min_score: Option<f64>,
}

pub struct SearchProductMaterialsTool {
    services: Arc<PipelineServices>,
}

impl SearchProductMaterialsTool {
    pub fn new(services: Arc<PipelineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for SearchProductMaterialsTool {
    fn name(&self) -> ToolName {
        ToolName::SearchProductMaterials
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Search the product and material catalog. Prices are in cents, VAT in \
                          basis points. Use the returned id as catalog_product_id in DraftQuote.",
            input_schema: json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_SEARCH_LIMIT },
                    "catalog_only": { "type": "boolean" },
                    "min_score": { "type": "number", "minimum": 0, "maximum": 1 }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: SearchArgs = parse_args(self.name(), input)?;
        if args.query.trim().is_empty() {
            return Err(ToolError::invalid_arguments(self.name().as_str(), "query is empty"));
        }

        let settings = &self.services.settings;
        let search = ProductSearch {
            tenant_id: context.tenant_id,
            query: args.query.trim().to_string(),
            limit: args.limit.unwrap_or(settings.product_search_limit).clamp(1, MAX_SEARCH_LIMIT),
            min_score: args.min_score.unwrap_or(settings.product_min_score).clamp(0.0, 1.0),
            catalog_only: args.catalog_only.unwrap_or(false),
        };
        let products = self.services.catalog.search(&search).await?;

        Ok(success(json!({
            "count": products.len(),
            "products": products,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct CalculatorArgs {
    operation: String,
    a: Decimal,
    #[serde(default)]
    b: Option<Decimal>,
}

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> ToolName {
        ToolName::Calculator
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Exact arithmetic. Use for every computation, never calculate in your \
                          head. ceil_divide gives the number of b-sized units needed to cover a.",
            input_schema: json!({
                "type": "object",
                "required": ["operation", "a"],
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["add", "subtract", "multiply", "divide", "ceil_divide",
                                 "ceil", "floor", "round", "percentage"]
                    },
                    "a": { "type": ["number", "string"] },
                    "b": { "type": ["number", "string"] }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        scope.context()?;
        let args: CalculatorArgs = parse_args(self.name(), input)?;
        let operation = CalculatorOperation::parse(&args.operation)
            .ok_or_else(|| CalcError::UnknownOperation(args.operation.clone()))?;
        let outcome = calculate(operation, args.a, args.b)?;
        Ok(success(json!(outcome)))
    }
}

pub struct CalculateEstimateTool;

#[async_trait]
impl Tool for CalculateEstimateTool {
    fn name(&self) -> ToolName {
        ToolName::CalculateEstimate
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Compute a low/high planning estimate from materials, labor hours and \
                          hourly rates. Pass unit prices and quantities separately.",
            input_schema: json!({
                "type": "object",
                "required": ["labor_hours_low", "labor_hours_high", "hourly_rate_low",
                             "hourly_rate_high"],
                "properties": {
                    "material_items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["description", "unit_price", "quantity"],
                            "properties": {
                                "description": { "type": "string" },
                                "unit_price": { "type": ["number", "string"] },
                                "quantity": { "type": ["number", "string"] }
                            }
                        }
                    },
                    "labor_hours_low": { "type": ["number", "string"] },
                    "labor_hours_high": { "type": ["number", "string"] },
                    "hourly_rate_low": { "type": ["number", "string"] },
                    "hourly_rate_high": { "type": ["number", "string"] },
                    "extra_costs": { "type": ["number", "string"] }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        scope.context()?;
        let args: EstimateInput = parse_args(self.name(), input)?;
        let range = calculate_estimate(&args)?;
        Ok(success(json!(range)))
    }
}

#[derive(Debug, Deserialize)]
struct SaveEstimationArgs {
    summary: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default, alias = "priceRange")]
    price_range: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// Records the estimator's conclusion on the timeline.
pub struct SaveEstimationTool {
    services: Arc<PipelineServices>,
}

impl SaveEstimationTool {
    pub fn new(services: Arc<PipelineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for SaveEstimationTool {
    fn name(&self) -> ToolName {
        ToolName::SaveEstimation
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Save the estimation outcome. Mandatory: call after DraftQuote and \
                          before changing the stage.",
            input_schema: json!({
                "type": "object",
                "required": ["summary"],
                "properties": {
                    "summary": { "type": "string" },
                    "scope": { "type": "string", "enum": ["small", "medium", "large"] },
                    "price_range": { "type": "string" },
                    "notes": { "type": "string" }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: SaveEstimationArgs = parse_args(self.name(), input)?;
        if args.summary.trim().is_empty() {
            return Err(ToolError::invalid_arguments(self.name().as_str(), "summary is empty"));
        }

        let mut event = TimelineEvent::new(
            context.tenant_id,
            context.lead_id,
            context.lead_service_id,
            TimelineEventKind::EstimationSaved,
            context.actor.clone(),
            args.summary.trim(),
        );
        for (key, value) in
            [("scope", args.scope), ("price_range", args.price_range), ("notes", args.notes)]
        {
            if let Some(value) = value.filter(|value| !value.trim().is_empty()) {
                event = event.with_metadata(key, value);
            }
        }
        if let Some(quote_id) = scope.tracker().snapshot().last_quote_id {
            event = event.with_metadata("quote_id", quote_id.to_string());
        }

        let event_id = event.id;
        self.services.timeline.append(event).await?;

        info!(
            event_name = "estimator.estimation_saved",
            lead_service_id = %context.lead_service_id,
            "estimation saved"
        );
        Ok(success(json!({ "timeline_event_id": event_id })))
    }
}
