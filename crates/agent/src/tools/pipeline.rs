use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, success, Tool, ToolName, ToolSpec};
use crate::context::RunScope;
use crate::error::ToolError;
use crate::stage_machine::StageMachine;

/// Service-type corrections below this stated confidence are refused outright.
pub const MIN_SERVICE_TYPE_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct StageArgs {
    stage: String,
    #[serde(default)]
    reason: String,
}

pub struct UpdatePipelineStageTool {
    machine: StageMachine,
}

impl UpdatePipelineStageTool {
    pub fn new(machine: StageMachine) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl Tool for UpdatePipelineStageTool {
    fn name(&self) -> ToolName {
        ToolName::UpdatePipelineStage
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Move the lead service to another pipeline stage. Give a short reason.",
            input_schema: json!({
                "type": "object",
                "required": ["stage", "reason"],
                "properties": {
                    "stage": {
                        "type": "string",
                        "enum": ["Triage", "Nurturing", "Estimation", "Fulfillment",
                                 "ManualIntervention", "Completed", "Lost"]
                    },
                    "reason": { "type": "string" }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: StageArgs = parse_args(self.name(), input)?;
        let outcome = self.machine.transition(&context, &args.stage, &args.reason).await?;
        Ok(success(json!(outcome)))
    }
}

#[derive(Debug, Deserialize)]
struct StatusArgs {
    status: String,
    #[serde(default)]
    reason: String,
}

pub struct UpdateLeadServiceStatusTool {
    machine: StageMachine,
}

impl UpdateLeadServiceStatusTool {
    pub fn new(machine: StageMachine) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl Tool for UpdateLeadServiceStatusTool {
    fn name(&self) -> ToolName {
        ToolName::UpdateLeadServiceStatus
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Update the lead service status, e.g. after a call was scheduled.",
            input_schema: json!({
                "type": "object",
                "required": ["status"],
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["New", "Pending", "InProgress", "Scheduled", "Disqualified",
                                 "Closed"]
                    },
                    "reason": { "type": "string" }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: StatusArgs = parse_args(self.name(), input)?;
        let outcome = self.machine.update_status(&context, &args.status, &args.reason).await?;
        Ok(success(json!(outcome)))
    }
}

#[derive(Debug, Deserialize)]
struct ServiceTypeArgs {
    #[serde(alias = "serviceType", alias = "service")]
    service_type: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct UpdateLeadServiceTypeTool {
    machine: StageMachine,
}

impl UpdateLeadServiceTypeTool {
    pub fn new(machine: StageMachine) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl Tool for UpdateLeadServiceTypeTool {
    fn name(&self) -> ToolName {
        ToolName::UpdateLeadServiceType
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Correct the service type while the lead is still in Triage. Only \
                          call when you are confident the consumer picked the wrong service.",
            input_schema: json!({
                "type": "object",
                "required": ["service_type", "reason"],
                "properties": {
                    "service_type": { "type": "string" },
                    "reason": { "type": "string" },
                    "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: ServiceTypeArgs = parse_args(self.name(), input)?;

        if let Some(confidence) = args.confidence {
            if confidence < MIN_SERVICE_TYPE_CONFIDENCE {
                return Err(ToolError::ValidationFailed(format!(
                    "confidence {confidence} is below {MIN_SERVICE_TYPE_CONFIDENCE}; service type \
                     left unchanged"
                )));
            }
        }

        let outcome =
            self.machine.update_service_type(&context, &args.service_type, &args.reason).await?;
        Ok(success(json!(outcome)))
    }
}
