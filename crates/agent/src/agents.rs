use serde::Serialize;

use leadflow_core::domain::lead::Actor;

use crate::tools::ToolName;

/// The per-stage agents. Each has a fixed tool set and a fixed list of mandatory tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Gatekeeper,
    Estimator,
    Dispatcher,
    Auditor,
    CallLog,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] =
        [Self::Gatekeeper, Self::Estimator, Self::Dispatcher, Self::Auditor, Self::CallLog];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gatekeeper => "gatekeeper",
            Self::Estimator => "estimator",
            Self::Dispatcher => "dispatcher",
            Self::Auditor => "auditor",
            Self::CallLog => "call_log",
        }
    }

    pub fn tools(&self) -> &'static [ToolName] {
        match self {
            Self::Gatekeeper => &[
                ToolName::SaveAnalysis,
                ToolName::UpdatePipelineStage,
                ToolName::UpdateLeadServiceType,
                ToolName::Calculator,
            ],
            Self::Estimator => &[
                ToolName::SearchProductMaterials,
                ToolName::Calculator,
                ToolName::CalculateEstimate,
                ToolName::DraftQuote,
                ToolName::SaveEstimation,
                ToolName::UpdatePipelineStage,
            ],
            Self::Dispatcher => &[ToolName::FindMatchingPartners, ToolName::UpdatePipelineStage],
            Self::Auditor => &[ToolName::SubmitAuditResult],
            Self::CallLog => &[
                ToolName::SaveNote,
                ToolName::UpdateLeadServiceStatus,
                ToolName::UpdatePipelineStage,
            ],
        }
    }

    /// Tools whose absence after a run triggers retry and then fallback.
    pub fn mandatory(&self) -> &'static [ToolName] {
        match self {
            Self::Gatekeeper => &[ToolName::SaveAnalysis, ToolName::UpdatePipelineStage],
            Self::Estimator => &[ToolName::SaveEstimation, ToolName::UpdatePipelineStage],
            Self::Dispatcher => &[ToolName::FindMatchingPartners, ToolName::UpdatePipelineStage],
            Self::Auditor => &[ToolName::SubmitAuditResult],
            Self::CallLog => &[ToolName::SaveNote],
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::agent(self.as_str())
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
