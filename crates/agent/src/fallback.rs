//! Deterministic repair of runs that ended without their mandatory tool calls.
//!
//! [`after_run`] decides which recovery actions a finished run needs; the
//! [`FallbackHandler`] applies them. Applying never fails the caller: persistence errors
//! are logged and reported as not applied.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use leadflow_core::domain::analysis::{
    AiAnalysis, AnalysisId, ContactChannel, LeadQuality, RecommendedAction, Urgency,
};
use leadflow_core::domain::note::LeadNote;
use leadflow_core::domain::stage::PipelineStage;
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};
use leadflow_core::errors::ApplicationError;
use leadflow_core::pipeline::{IntakeGateDecision, PipelineEngine, INSUFFICIENT_INTAKE_REASON};

use crate::context::{RunContext, TrackerSnapshot};
use crate::services::PipelineServices;
use crate::stage_machine::StageMachine;
use crate::tools::ToolName;

pub const FALLBACK_ANALYSIS_SUMMARY: &str =
    "Automatic fallback: no analysis was saved during triage. More information is needed.";
pub const FALLBACK_ANALYSIS_MESSAGE: &str =
    "Thanks for your request! Could you share a few more details about the job, such as \
     photos, measurements and when you would like it done?";
const EMPTY_CALL_LOG_BODY: &str = "Call log could not be processed automatically.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    FallbackAnalysis,
    StageUpdateFallback,
    EstimationFallback,
    ForceManualIntervention { missing: ToolName },
    FallbackNote,
}

impl RecoveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FallbackAnalysis => "fallback_analysis",
            Self::StageUpdateFallback => "stage_update_fallback",
            Self::EstimationFallback => "estimation_fallback",
            Self::ForceManualIntervention { .. } => "force_manual_intervention",
            Self::FallbackNote => "fallback_note",
        }
    }
}

/// Recovery actions for every required tool the run did not call successfully.
pub fn after_run(required: &[ToolName], snapshot: &TrackerSnapshot) -> Vec<RecoveryAction> {
    snapshot
        .missing(required)
        .into_iter()
        .filter_map(|tool| match tool {
            ToolName::SaveAnalysis => Some(RecoveryAction::FallbackAnalysis),
            ToolName::UpdatePipelineStage => Some(RecoveryAction::StageUpdateFallback),
            ToolName::SaveEstimation => Some(RecoveryAction::EstimationFallback),
            ToolName::FindMatchingPartners | ToolName::SubmitAuditResult => {
                Some(RecoveryAction::ForceManualIntervention { missing: tool })
            }
            ToolName::SaveNote => Some(RecoveryAction::FallbackNote),
            _ => None,
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecoveryOutcome {
    pub action: RecoveryAction,
    pub applied: bool,
}

#[derive(Clone)]
pub struct FallbackHandler {
    services: Arc<PipelineServices>,
    machine: StageMachine,
    engine: PipelineEngine,
}

impl FallbackHandler {
    pub fn new(services: Arc<PipelineServices>, machine: StageMachine) -> Self {
        Self { services, machine, engine: PipelineEngine::new() }
    }

    /// `raw_input` is what the agent was asked to process; the call-log fallback keeps it.
    pub async fn apply(
        &self,
        context: &RunContext,
        actions: &[RecoveryAction],
        snapshot: &TrackerSnapshot,
        raw_input: &str,
    ) -> Vec<RecoveryOutcome> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            let result = match action {
                RecoveryAction::FallbackAnalysis => self.fallback_analysis(context).await,
                RecoveryAction::StageUpdateFallback => self.stage_update_fallback(context).await,
                RecoveryAction::EstimationFallback => {
                    self.estimation_fallback(context, snapshot).await
                }
                RecoveryAction::ForceManualIntervention { missing } => {
                    self.force_manual_intervention(context, *missing).await
                }
                RecoveryAction::FallbackNote => self.fallback_note(context, raw_input).await,
            };

            let applied = match result {
                Ok(()) => true,
                Err(failure) => {
                    error!(
                        event_name = "fallback.failed",
                        action = action.as_str(),
                        tenant_id = %context.tenant_id,
                        lead_service_id = %context.lead_service_id,
                        error = %failure,
                        "fallback could not be applied"
                    );
                    false
                }
            };
            outcomes.push(RecoveryOutcome { action: *action, applied });
        }
        outcomes
    }

    /// Forces `Nurturing` when the estimator skipped the quote because intake is
    /// incomplete. Returns `None` when the gate could not be evaluated.
    pub async fn apply_intake_gate(
        &self,
        context: &RunContext,
        draft_quote_called: bool,
    ) -> Option<IntakeGateDecision> {
        match self.intake_gate(context, draft_quote_called).await {
            Ok(decision) => Some(decision),
            Err(failure) => {
                error!(
                    event_name = "fallback.intake_gate_failed",
                    lead_service_id = %context.lead_service_id,
                    error = %failure,
                    "intake gate could not be applied"
                );
                None
            }
        }
    }

    async fn intake_gate(
        &self,
        context: &RunContext,
        draft_quote_called: bool,
    ) -> Result<IntakeGateDecision, ApplicationError> {
        let analysis = self
            .services
            .analyses
            .latest_for_service(&context.tenant_id, &context.lead_service_id)
            .await?;
        let service = self.services.load_service(context).await?;
        let decision =
            self.engine.intake_gate(draft_quote_called, analysis.as_ref(), service.stage);

        let IntakeGateDecision::ForceNurturing { from } = decision else {
            return Ok(decision);
        };

        self.machine
            .transition_to(context, PipelineStage::Nurturing, INSUFFICIENT_INTAKE_REASON)
            .await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::IntakeEscalation,
                    context.actor.clone(),
                    "Intake incomplete: moved to Nurturing instead of quoting",
                )
                .with_metadata("reason", INSUFFICIENT_INTAKE_REASON)
                .with_metadata("old_stage", from.as_str()),
            )
            .await?;

        warn!(
            event_name = "fallback.intake_escalated",
            lead_service_id = %context.lead_service_id,
            old_stage = %from,
            "insufficient intake; lead service moved to nurturing"
        );
        Ok(decision)
    }

    async fn fallback_analysis(&self, context: &RunContext) -> Result<(), ApplicationError> {
        let preferred_channel = match self.services.load_lead(context).await {
            Ok(lead) => ContactChannel::preferred_for(&lead),
            Err(failure) => {
                warn!(
                    event_name = "fallback.lead_unavailable",
                    lead_id = %context.lead_id,
                    error = %failure,
                    "lead could not be loaded; defaulting fallback channel to email"
                );
                ContactChannel::Email
            }
        };

        let analysis = AiAnalysis {
            id: AnalysisId::new(),
            tenant_id: context.tenant_id,
            lead_id: context.lead_id,
            lead_service_id: context.lead_service_id,
            urgency: Urgency::Unknown,
            urgency_reason: None,
            lead_quality: LeadQuality::Potential,
            recommended_action: RecommendedAction::RequestInfo,
            missing_information: Vec::new(),
            preferred_channel,
            suggested_message: FALLBACK_ANALYSIS_MESSAGE.to_string(),
            summary: FALLBACK_ANALYSIS_SUMMARY.to_string(),
            is_fallback: true,
            created_at: Utc::now(),
        };
        let analysis_id = analysis.id;

        self.services.analyses.save(analysis).await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::AnalysisFallback,
                    context.actor.clone(),
                    FALLBACK_ANALYSIS_SUMMARY,
                )
                .with_metadata("analysis_id", analysis_id.to_string())
                .with_metadata("missing_tool", ToolName::SaveAnalysis.as_str())
                .with_metadata("preferred_channel", preferred_channel.as_str()),
            )
            .await?;

        info!(
            event_name = "fallback.analysis_created",
            tenant_id = %context.tenant_id,
            lead_service_id = %context.lead_service_id,
            analysis_id = %analysis_id,
            preferred_channel = preferred_channel.as_str(),
            "fallback analysis created"
        );
        Ok(())
    }

    /// Records that no stage was reported. The stage itself is left where it is.
    async fn stage_update_fallback(&self, context: &RunContext) -> Result<(), ApplicationError> {
        let service = self.services.load_service(context).await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::StageUpdateFallback,
                    context.actor.clone(),
                    "No stage update was reported; stage left unchanged",
                )
                .with_metadata("missing_tool", ToolName::UpdatePipelineStage.as_str())
                .with_metadata("current_stage", service.stage.as_str()),
            )
            .await?;

        info!(
            event_name = "fallback.stage_update_recorded",
            lead_service_id = %context.lead_service_id,
            current_stage = %service.stage,
            "stage update fallback recorded"
        );
        Ok(())
    }

    async fn estimation_fallback(
        &self,
        context: &RunContext,
        snapshot: &TrackerSnapshot,
    ) -> Result<(), ApplicationError> {
        let mut event = TimelineEvent::new(
            context.tenant_id,
            context.lead_id,
            context.lead_service_id,
            TimelineEventKind::EstimationFallback,
            context.actor.clone(),
            "Estimation was not saved; review the service manually",
        )
        .with_metadata("missing_tool", ToolName::SaveEstimation.as_str());
        if let Some(quote_id) = snapshot.last_quote_id {
            event = event.with_metadata("quote_id", quote_id.to_string());
        }
        self.services.timeline.append(event).await?;

        info!(
            event_name = "fallback.estimation_recorded",
            lead_service_id = %context.lead_service_id,
            quote_drafted = snapshot.last_quote_id.is_some(),
            "estimation fallback recorded"
        );
        Ok(())
    }

    async fn force_manual_intervention(
        &self,
        context: &RunContext,
        missing: ToolName,
    ) -> Result<(), ApplicationError> {
        let (kind, summary) = match missing {
            ToolName::SubmitAuditResult => {
                (TimelineEventKind::AuditFallback, "Audit result missing; manual review needed")
            }
            _ => (TimelineEventKind::DispatchFallback, "No partner search ran; manual dispatch needed"),
        };
        let reason = format!("{missing} was not called");

        let outcome = self
            .machine
            .transition_to(context, PipelineStage::ManualIntervention, &reason)
            .await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    kind,
                    context.actor.clone(),
                    summary,
                )
                .with_metadata("missing_tool", missing.as_str())
                .with_metadata("old_stage", outcome.old_stage.as_str()),
            )
            .await?;

        warn!(
            event_name = "fallback.manual_intervention",
            lead_service_id = %context.lead_service_id,
            missing_tool = %missing,
            "lead service handed to manual intervention"
        );
        Ok(())
    }

    async fn fallback_note(&self, context: &RunContext, raw_input: &str) -> Result<(), ApplicationError> {
        let body = match raw_input.trim() {
            "" => EMPTY_CALL_LOG_BODY,
            raw => raw,
        };
        let mut note = LeadNote::new(
            context.tenant_id,
            context.lead_id,
            context.lead_service_id,
            body,
            context.actor.clone(),
        );
        note.is_fallback = true;
        let note_id = note.id;

        self.services.notes.save(note).await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::CallLogFallback,
                    context.actor.clone(),
                    "Call summary stored as a fallback note",
                )
                .with_metadata("note_id", note_id.0.to_string())
                .with_metadata("missing_tool", ToolName::SaveNote.as_str()),
            )
            .await?;

        info!(
            event_name = "fallback.note_created",
            lead_service_id = %context.lead_service_id,
            "call log stored as fallback note"
        );
        Ok(())
    }
}
