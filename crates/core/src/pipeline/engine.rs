use tracing::debug;

use crate::domain::analysis::{AiAnalysis, LeadQuality};
use crate::domain::stage::{LeadServiceStatus, PipelineStage};
use crate::errors::DomainError;
use crate::normalize::LenientEnum;
use crate::pipeline::states::{
    DisqualifyDecision, IntakeGateDecision, StageTransitionPlan, StatusChangePlan,
};

pub const INSUFFICIENT_INTAKE_REASON: &str = "insufficient_intake";
pub const AUTO_DISQUALIFY_REASON: &str = "lead quality classified as junk";

/// Pure pipeline rules. Membership and recording are enforced here; the order in which
/// stages are visited is the caller's business, any stage may follow any other.
#[derive(Clone, Debug, Default)]
pub struct PipelineEngine;

impl PipelineEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn plan_stage_transition(
        &self,
        current: PipelineStage,
        requested: &str,
        reason: &str,
    ) -> Result<StageTransitionPlan, DomainError> {
        let to = PipelineStage::parse(requested)
            .ok_or_else(|| DomainError::InvalidStage { raw: requested.to_owned() })?;
        Ok(self.plan_to(current, to, reason))
    }

    pub fn plan_to(&self, current: PipelineStage, to: PipelineStage, reason: &str) -> StageTransitionPlan {
        let changed = current != to;
        if !changed {
            debug!(
                event_name = "pipeline.transition_noop",
                stage = %current,
                "requested stage equals current stage"
            );
        }
        StageTransitionPlan { from: current, to, reason: reason.trim().to_owned(), changed }
    }

    /// Unknown status labels fall back to `Pending` with a warning.
    pub fn plan_status_change(
        &self,
        current: LeadServiceStatus,
        requested: &str,
        reason: &str,
    ) -> StatusChangePlan {
        let to = LeadServiceStatus::normalize(requested);
        StatusChangePlan { from: current, to, reason: reason.trim().to_owned(), changed: current != to }
    }

    pub fn check_service_type_change(&self, stage: PipelineStage) -> Result<(), DomainError> {
        if stage == PipelineStage::Triage {
            Ok(())
        } else {
            Err(DomainError::ServiceTypeLocked { stage })
        }
    }

    pub fn junk_disqualification(
        &self,
        quality: LeadQuality,
        stage: PipelineStage,
        status: LeadServiceStatus,
    ) -> DisqualifyDecision {
        if quality != LeadQuality::Junk {
            return DisqualifyDecision::NotJunk;
        }
        if status.is_terminal() {
            return DisqualifyDecision::AlreadyTerminal { status };
        }
        DisqualifyDecision::Disqualify { from_stage: stage, from_status: status }
    }

    pub fn intake_gate(
        &self,
        draft_quote_called: bool,
        latest_analysis: Option<&AiAnalysis>,
        stage: PipelineStage,
    ) -> IntakeGateDecision {
        let needs_info = latest_analysis.is_some_and(AiAnalysis::needs_more_information);
        if draft_quote_called || !needs_info {
            return IntakeGateDecision::Proceed;
        }
        if stage == PipelineStage::Nurturing {
            return IntakeGateDecision::AlreadyNurturing;
        }
        IntakeGateDecision::ForceNurturing { from: stage }
    }
}
