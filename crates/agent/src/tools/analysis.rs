use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use leadflow_core::domain::analysis::{
    AiAnalysis, AnalysisId, ContactChannel, LeadQuality, RecommendedAction, Urgency,
};
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};
use leadflow_core::normalize::LenientEnum;

use super::{parse_args, success, Tool, ToolName, ToolSpec};
use crate::context::RunScope;
use crate::error::ToolError;
use crate::services::PipelineServices;

#[derive(Debug, Deserialize)]
struct SaveAnalysisArgs {
    urgency: String,
    #[serde(default, alias = "urgencyReason")]
    urgency_reason: Option<String>,
    #[serde(alias = "quality", alias = "leadQuality")]
    lead_quality: String,
    #[serde(alias = "recommendedAction", alias = "action")]
    recommended_action: String,
    #[serde(default, alias = "missingInformation")]
    missing_information: Vec<String>,
    #[serde(default, alias = "channel", alias = "preferredChannel")]
    preferred_channel: Option<String>,
    #[serde(default, alias = "message", alias = "suggestedMessage")]
    suggested_message: String,
    summary: String,
}

pub struct SaveAnalysisTool {
    services: Arc<PipelineServices>,
}

impl SaveAnalysisTool {
    pub fn new(services: Arc<PipelineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for SaveAnalysisTool {
    fn name(&self) -> ToolName {
        ToolName::SaveAnalysis
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Save the triage analysis for the current lead service. Call exactly \
                          once per run, before any stage change.",
            input_schema: json!({
                "type": "object",
                "required": ["urgency", "lead_quality", "recommended_action", "summary"],
                "properties": {
                    "urgency": { "type": "string", "enum": ["High", "Medium", "Low", "Unknown"] },
                    "urgency_reason": { "type": "string" },
                    "lead_quality": {
                        "type": "string",
                        "enum": ["Junk", "Low", "Potential", "High", "Urgent"]
                    },
                    "recommended_action": {
                        "type": "string",
                        "enum": ["Reject", "RequestInfo", "ScheduleSurvey", "CallImmediately"]
                    },
                    "missing_information": { "type": "array", "items": { "type": "string" } },
                    "preferred_channel": { "type": "string", "enum": ["WhatsApp", "Email"] },
                    "suggested_message": { "type": "string" },
                    "summary": { "type": "string" }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: SaveAnalysisArgs = parse_args(self.name(), input)?;

        let preferred_channel = match args.preferred_channel.as_deref() {
            Some(raw) if !raw.trim().is_empty() => ContactChannel::normalize(raw),
            _ => ContactChannel::preferred_for(&self.services.load_lead(&context).await?),
        };

        let analysis = AiAnalysis {
            id: AnalysisId::new(),
            tenant_id: context.tenant_id,
            lead_id: context.lead_id,
            lead_service_id: context.lead_service_id,
            urgency: Urgency::normalize(&args.urgency),
            urgency_reason: args.urgency_reason.filter(|reason| !reason.trim().is_empty()),
            lead_quality: LeadQuality::normalize(&args.lead_quality),
            recommended_action: RecommendedAction::normalize(&args.recommended_action),
            missing_information: args
                .missing_information
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
            preferred_channel,
            suggested_message: args.suggested_message,
            summary: args.summary,
            is_fallback: false,
            created_at: Utc::now(),
        };

        self.services.analyses.save(analysis.clone()).await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::AnalysisCreated,
                    context.actor.clone(),
                    analysis.summary.clone(),
                )
                .with_metadata("analysis_id", analysis.id.to_string())
                .with_metadata("lead_quality", analysis.lead_quality.as_str())
                .with_metadata("recommended_action", analysis.recommended_action.as_str()),
            )
            .await?;
        scope.tracker().record_analysis(analysis.id);

        info!(
            event_name = "gatekeeper.analysis_saved",
            lead_service_id = %context.lead_service_id,
            analysis_id = %analysis.id,
            lead_quality = analysis.lead_quality.as_str(),
            "analysis saved"
        );

        Ok(success(json!({
            "analysis_id": analysis.id,
            "urgency": analysis.urgency,
            "lead_quality": analysis.lead_quality,
            "recommended_action": analysis.recommended_action,
            "preferred_channel": analysis.preferred_channel,
        })))
    }
}
