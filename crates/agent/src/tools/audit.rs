use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use leadflow_core::domain::stage::PipelineStage;
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};
use leadflow_core::events::PipelineEvent;

use super::{parse_args, success, Tool, ToolName, ToolSpec};
use crate::context::RunScope;
use crate::error::ToolError;
use crate::services::PipelineServices;
use crate::stage_machine::StageMachine;

pub const AUDIT_FAILED_REASON: &str = "Audit failed: intake is incomplete";

#[derive(Debug, Deserialize)]
struct AuditArgs {
    passed: bool,
    #[serde(default, alias = "missingItems")]
    missing: Vec<String>,
    #[serde(default)]
    summary: String,
}

/// Records the auditor's verdict. A failed audit hands the service to a human.
pub struct SubmitAuditResultTool {
    services: Arc<PipelineServices>,
    machine: StageMachine,
}

impl SubmitAuditResultTool {
    pub fn new(services: Arc<PipelineServices>, machine: StageMachine) -> Self {
        Self { services, machine }
    }
}

#[async_trait]
impl Tool for SubmitAuditResultTool {
    fn name(&self) -> ToolName {
        ToolName::SubmitAuditResult
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Submit the audit verdict. List every missing item when the audit \
                          does not pass.",
            input_schema: json!({
                "type": "object",
                "required": ["passed", "summary"],
                "properties": {
                    "passed": { "type": "boolean" },
                    "missing": { "type": "array", "items": { "type": "string" } },
                    "summary": { "type": "string" }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: AuditArgs = parse_args(self.name(), input)?;
        let missing: Vec<String> = args
            .missing
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        let summary = if args.summary.trim().is_empty() {
            if args.passed { "Audit passed".to_string() } else { "Audit failed".to_string() }
        } else {
            args.summary.trim().to_string()
        };

        let mut event = TimelineEvent::new(
            context.tenant_id,
            context.lead_id,
            context.lead_service_id,
            TimelineEventKind::AuditResult,
            context.actor.clone(),
            summary,
        )
        .with_metadata("passed", args.passed.to_string());
        if !missing.is_empty() {
            event = event.with_metadata("missing", missing.join(", "));
        }
        self.services.timeline.append(event).await?;

        self.services.publish(PipelineEvent::AuditCompleted {
            tenant_id: context.tenant_id,
            lead_id: context.lead_id,
            lead_service_id: context.lead_service_id,
            passed: args.passed,
            missing: missing.clone(),
        });

        let stage = if args.passed {
            None
        } else {
            let outcome = self
                .machine
                .transition_to(&context, PipelineStage::ManualIntervention, AUDIT_FAILED_REASON)
                .await?;
            Some(outcome.new_stage)
        };

        info!(
            event_name = "auditor.result_submitted",
            lead_service_id = %context.lead_service_id,
            passed = args.passed,
            missing_count = missing.len(),
            "audit result submitted"
        );

        Ok(success(json!({
            "passed": args.passed,
            "missing": missing,
            "stage": stage,
        })))
    }
}
