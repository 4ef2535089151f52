//! Model-facing tools.
//!
//! The model proposes tool calls; a [`ToolSession`] validates and dispatches them against
//! the run's [`RunScope`]. A tool is only marked as called in the tracker when it succeeds,
//! so a failed mandatory call still triggers retry and fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use leadflow_core::normalize::fold_label;

use crate::context::RunScope;
use crate::error::ToolError;

pub mod analysis;
pub mod audit;
pub mod dispatch;
pub mod estimation;
pub mod notes;
pub mod pipeline;
pub mod quote;

pub use analysis::SaveAnalysisTool;
pub use audit::SubmitAuditResultTool;
pub use dispatch::FindMatchingPartnersTool;
pub use estimation::{
    CalculateEstimateTool, CalculatorTool, SaveEstimationTool, SearchProductMaterialsTool,
};
pub use notes::SaveNoteTool;
pub use pipeline::{UpdateLeadServiceStatusTool, UpdateLeadServiceTypeTool, UpdatePipelineStageTool};
pub use quote::DraftQuoteTool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ToolName {
    SaveAnalysis,
    UpdatePipelineStage,
    UpdateLeadServiceType,
    UpdateLeadServiceStatus,
    SearchProductMaterials,
    Calculator,
    CalculateEstimate,
    DraftQuote,
    SaveEstimation,
    FindMatchingPartners,
    SubmitAuditResult,
    SaveNote,
}

impl ToolName {
    pub const ALL: [ToolName; 12] = [
        Self::SaveAnalysis,
        Self::UpdatePipelineStage,
        Self::UpdateLeadServiceType,
        Self::UpdateLeadServiceStatus,
        Self::SearchProductMaterials,
        Self::Calculator,
        Self::CalculateEstimate,
        Self::DraftQuote,
        Self::SaveEstimation,
        Self::FindMatchingPartners,
        Self::SubmitAuditResult,
        Self::SaveNote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaveAnalysis => "SaveAnalysis",
            Self::UpdatePipelineStage => "UpdatePipelineStage",
            Self::UpdateLeadServiceType => "UpdateLeadServiceType",
            Self::UpdateLeadServiceStatus => "UpdateLeadServiceStatus",
            Self::SearchProductMaterials => "SearchProductMaterials",
            Self::Calculator => "Calculator",
            Self::CalculateEstimate => "CalculateEstimate",
            Self::DraftQuote => "DraftQuote",
            Self::SaveEstimation => "SaveEstimation",
            Self::FindMatchingPartners => "FindMatchingPartners",
            Self::SubmitAuditResult => "SubmitAuditResult",
            Self::SaveNote => "SaveNote",
        }
    }

    /// Accepts the canonical name in any casing, e.g. `save_analysis`.
    pub fn parse(raw: &str) -> Option<Self> {
        let folded = fold_label(raw);
        Self::ALL.into_iter().find(|tool| fold_label(tool.as_str()) == folded)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the model is told about a tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    pub input_schema: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;
    fn spec(&self) -> ToolSpec;
    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError>;
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    pub fn names(&self) -> Vec<ToolName> {
        self.tools.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn session<'a>(&'a self, scope: &'a RunScope) -> ToolSession<'a> {
        ToolSession { registry: self, scope }
    }
}

/// The registry bound to one run. This is the only handle the model gets.
pub struct ToolSession<'a> {
    registry: &'a ToolRegistry,
    scope: &'a RunScope,
}

impl ToolSession<'_> {
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }

    /// Dispatches one call and always answers with JSON: the tool's result, or a
    /// `{success: false, error, message}` payload.
    pub async fn call(&self, name: &str, input: Value) -> Value {
        match self.dispatch(name, input).await {
            Ok(output) => output,
            Err(error) => {
                warn!(
                    event_name = "tool.call_failed",
                    tool = name,
                    error_code = error.error_code(),
                    error = %error,
                    "tool call failed"
                );
                error.to_error_payload()
            }
        }
    }

    async fn dispatch(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let tool_name = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let tool = self
            .registry
            .tools
            .get(&tool_name)
            .ok_or_else(|| ToolError::NotAllowed { tool: tool_name.to_string() })?;

        let context = self.scope.context()?;
        let output = tool.execute(self.scope, input).await?;
        self.scope.tracker().mark(tool_name);

        debug!(
            event_name = "tool.call_succeeded",
            tool = %tool_name,
            lead_service_id = %context.lead_service_id,
            "tool call succeeded"
        );
        Ok(output)
    }
}

pub(crate) fn parse_args<T: DeserializeOwned>(tool: ToolName, input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input)
        .map_err(|error| ToolError::invalid_arguments(tool.as_str(), error.to_string()))
}

pub(crate) fn success(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), Value::Bool(true));
    }
    body
}
