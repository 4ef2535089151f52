use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use leadflow_core::domain::partner::{PartnerId, PartnerQuery};
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};

use super::{parse_args, success, Tool, ToolName, ToolSpec};
use crate::context::RunScope;
use crate::error::ToolError;
use crate::services::PipelineServices;

const MAX_RADIUS_KM: u32 = 250;
const MAX_PARTNERS: usize = 25;

#[derive(Debug, Deserialize)]
struct FindPartnersArgs {
    #[serde(default, alias = "serviceType")]
    service_type: Option<String>,
    #[serde(default, alias = "zipCode", alias = "zip")]
    zip_code: Option<String>,
    #[serde(default, alias = "radiusKm")]
    radius_km: Option<u32>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default, alias = "excludePartnerIds")]
    exclude: Vec<Uuid>,
}

/// Looks up partners near the lead. Service type and zip code default to the lead's own.
pub struct FindMatchingPartnersTool {
    services: Arc<PipelineServices>,
}

impl FindMatchingPartnersTool {
    pub fn new(services: Arc<PipelineServices>) -> Self {
        Self { services }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

#[async_trait]
impl Tool for FindMatchingPartnersTool {
    fn name(&self) -> ToolName {
        ToolName::FindMatchingPartners
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Find partners that offer this service near the lead. Omit \
                          service_type and zip_code to use the lead's own values.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "service_type": { "type": "string" },
                    "zip_code": { "type": "string" },
                    "radius_km": { "type": "integer", "minimum": 1, "maximum": MAX_RADIUS_KM },
                    "limit": { "type": "integer", "minimum": 1, "maximum": MAX_PARTNERS },
                    "exclude": { "type": "array", "items": { "type": "string", "format": "uuid" } }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: FindPartnersArgs = parse_args(self.name(), input)?;

        let service_type = match non_empty(args.service_type) {
            Some(service_type) => service_type,
            None => self.services.load_service(&context).await?.service_type,
        };
        let zip_code = match non_empty(args.zip_code) {
            Some(zip_code) => zip_code,
            None => non_empty(self.services.load_lead(&context).await?.zip_code).ok_or_else(
                || ToolError::ValidationFailed("lead has no zip code; pass zip_code".to_string()),
            )?,
        };

        let settings = &self.services.settings;
        let query = PartnerQuery {
            tenant_id: context.tenant_id,
            service_type,
            zip_code,
            radius_km: args.radius_km.unwrap_or(settings.partner_radius_km).clamp(1, MAX_RADIUS_KM),
            exclude: args.exclude.into_iter().map(PartnerId).collect(),
            limit: args.limit.unwrap_or(settings.partner_limit).clamp(1, MAX_PARTNERS),
        };
        let matches = self.services.partners.find_matches(&query).await?;

        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::PartnerSearch,
                    context.actor.clone(),
                    format!("Found {} matching partner(s)", matches.len()),
                )
                .with_metadata("service_type", query.service_type.clone())
                .with_metadata("zip_code", query.zip_code.clone())
                .with_metadata("radius_km", query.radius_km.to_string())
                .with_metadata("match_count", matches.len().to_string()),
            )
            .await?;

        info!(
            event_name = "dispatcher.partners_found",
            lead_service_id = %context.lead_service_id,
            match_count = matches.len(),
            radius_km = query.radius_km,
            "partner search completed"
        );

        Ok(success(json!({
            "count": matches.len(),
            "partners": matches,
        })))
    }
}
