use serde::{Deserialize, Serialize};

use crate::domain::stage::{LeadServiceStatus, PipelineStage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransitionPlan {
    pub from: PipelineStage,
    pub to: PipelineStage,
    pub reason: String,
    /// False when the requested stage equals the current one; nothing is persisted then.
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangePlan {
    pub from: LeadServiceStatus,
    pub to: LeadServiceStatus,
    pub reason: String,
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisqualifyDecision {
    Disqualify { from_stage: PipelineStage, from_status: LeadServiceStatus },
    AlreadyTerminal { status: LeadServiceStatus },
    NotJunk,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntakeGateDecision {
    /// A quote was drafted or intake looks complete.
    Proceed,
    AlreadyNurturing,
    ForceNurturing { from: PipelineStage },
}
