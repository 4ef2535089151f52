//! Authoritative stage, status and service-type mutations for a lead service.
//!
//! Legality comes from [`PipelineEngine`]; this layer persists the change, appends the
//! paired timeline event and publishes to the event bus. Publishing is best effort.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use leadflow_core::domain::lead::LeadService;
use leadflow_core::domain::stage::{LeadServiceStatus, PipelineStage};
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};
use leadflow_core::errors::ApplicationError;
use leadflow_core::events::PipelineEvent;
use leadflow_core::pipeline::{
    DisqualifyDecision, PipelineEngine, StageTransitionPlan, AUTO_DISQUALIFY_REASON,
};

use crate::context::RunContext;
use crate::services::PipelineServices;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub old_stage: PipelineStage,
    pub new_stage: PipelineStage,
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusOutcome {
    pub old_status: LeadServiceStatus,
    pub new_status: LeadServiceStatus,
    pub changed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceTypeOutcome {
    pub old_service_type: String,
    pub new_service_type: String,
    pub changed: bool,
}

#[derive(Clone)]
pub struct StageMachine {
    services: Arc<PipelineServices>,
    engine: PipelineEngine,
}

impl StageMachine {
    pub fn new(services: Arc<PipelineServices>) -> Self {
        Self { services, engine: PipelineEngine::new() }
    }

    /// An unknown stage is rejected before anything is written.
    pub async fn transition(
        &self,
        context: &RunContext,
        requested: &str,
        reason: &str,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let service = self.services.load_service(context).await?;
        let plan = self.engine.plan_stage_transition(service.stage, requested, reason)?;
        self.apply_transition(context, &service, plan).await
    }

    pub async fn transition_to(
        &self,
        context: &RunContext,
        target: PipelineStage,
        reason: &str,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let service = self.services.load_service(context).await?;
        let plan = self.engine.plan_to(service.stage, target, reason);
        self.apply_transition(context, &service, plan).await
    }

    async fn apply_transition(
        &self,
        context: &RunContext,
        service: &LeadService,
        plan: StageTransitionPlan,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let outcome =
            TransitionOutcome { old_stage: plan.from, new_stage: plan.to, changed: plan.changed };
        if !plan.changed {
            return Ok(outcome);
        }

        self.services.leads.update_stage(&context.tenant_id, &service.id, plan.to).await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    service.id,
                    TimelineEventKind::StageChange,
                    context.actor.clone(),
                    format!("Stage changed from {} to {}", plan.from, plan.to),
                )
                .with_metadata("old_stage", plan.from.as_str())
                .with_metadata("new_stage", plan.to.as_str())
                .with_metadata("reason", plan.reason.clone())
                .with_metadata("actor", context.actor.label()),
            )
            .await?;

        info!(
            event_name = "pipeline.stage_changed",
            tenant_id = %context.tenant_id,
            lead_service_id = %service.id,
            old_stage = %plan.from,
            new_stage = %plan.to,
            reason = %plan.reason,
            "lead service stage changed"
        );

        self.services.publish(PipelineEvent::StageChanged {
            tenant_id: context.tenant_id,
            lead_id: context.lead_id,
            lead_service_id: service.id,
            old_stage: plan.from,
            new_stage: plan.to,
            reason: plan.reason,
        });
        Ok(outcome)
    }

    pub async fn update_status(
        &self,
        context: &RunContext,
        requested: &str,
        reason: &str,
    ) -> Result<StatusOutcome, ApplicationError> {
        let service = self.services.load_service(context).await?;
        let plan = self.engine.plan_status_change(service.status, requested, reason);
        let outcome =
            StatusOutcome { old_status: plan.from, new_status: plan.to, changed: plan.changed };
        if !plan.changed {
            return Ok(outcome);
        }

        self.services.leads.update_status(&context.tenant_id, &service.id, plan.to).await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    service.id,
                    TimelineEventKind::StatusChange,
                    context.actor.clone(),
                    format!("Status changed from {} to {}", plan.from, plan.to),
                )
                .with_metadata("old_status", plan.from.as_str())
                .with_metadata("new_status", plan.to.as_str())
                .with_metadata("reason", plan.reason),
            )
            .await?;

        info!(
            event_name = "pipeline.status_changed",
            lead_service_id = %service.id,
            old_status = %plan.from,
            new_status = %plan.to,
            "lead service status changed"
        );
        Ok(outcome)
    }

    /// Only allowed while the service is still in triage.
    pub async fn update_service_type(
        &self,
        context: &RunContext,
        service_type: &str,
        reason: &str,
    ) -> Result<ServiceTypeOutcome, ApplicationError> {
        let service = self.services.load_service(context).await?;
        self.engine.check_service_type_change(service.stage)?;

        let new_service_type = service_type.trim().to_string();
        if new_service_type.is_empty() {
            return Err(ApplicationError::ValidationFailed(
                "service type must not be empty".to_string(),
            ));
        }

        let outcome = ServiceTypeOutcome {
            changed: new_service_type != service.service_type,
            old_service_type: service.service_type.clone(),
            new_service_type,
        };
        if !outcome.changed {
            return Ok(outcome);
        }

        self.services
            .leads
            .update_service_type(&context.tenant_id, &service.id, &outcome.new_service_type)
            .await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    service.id,
                    TimelineEventKind::ServiceTypeChange,
                    context.actor.clone(),
                    format!(
                        "Service type changed from {} to {}",
                        outcome.old_service_type, outcome.new_service_type
                    ),
                )
                .with_metadata("old_service_type", outcome.old_service_type.clone())
                .with_metadata("new_service_type", outcome.new_service_type.clone())
                .with_metadata("reason", reason.trim()),
            )
            .await?;
        Ok(outcome)
    }

    /// Moves a service whose latest analysis is junk to `Lost`/`Disqualified`. Re-entrant:
    /// does nothing once the status is terminal.
    pub async fn auto_disqualify_if_junk(
        &self,
        context: &RunContext,
    ) -> Result<DisqualifyDecision, ApplicationError> {
        let Some(analysis) = self
            .services
            .analyses
            .latest_for_service(&context.tenant_id, &context.lead_service_id)
            .await?
        else {
            return Ok(DisqualifyDecision::NotJunk);
        };

        let service = self.services.load_service(context).await?;
        let decision =
            self.engine.junk_disqualification(analysis.lead_quality, service.stage, service.status);
        let DisqualifyDecision::Disqualify { from_stage, from_status } = decision else {
            return Ok(decision);
        };

        if from_stage != PipelineStage::Lost {
            self.services
                .leads
                .update_stage(&context.tenant_id, &service.id, PipelineStage::Lost)
                .await?;
        }
        self.services
            .leads
            .update_status(&context.tenant_id, &service.id, LeadServiceStatus::Disqualified)
            .await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    service.id,
                    TimelineEventKind::AutoDisqualified,
                    context.actor.clone(),
                    AUTO_DISQUALIFY_REASON,
                )
                .with_metadata("analysis_id", analysis.id.to_string())
                .with_metadata("old_stage", from_stage.as_str())
                .with_metadata("new_stage", PipelineStage::Lost.as_str())
                .with_metadata("old_status", from_status.as_str())
                .with_metadata("new_status", LeadServiceStatus::Disqualified.as_str()),
            )
            .await?;

        info!(
            event_name = "pipeline.auto_disqualified",
            lead_service_id = %service.id,
            analysis_id = %analysis.id,
            "junk lead auto-disqualified"
        );

        self.services.publish(PipelineEvent::AutoDisqualified {
            tenant_id: context.tenant_id,
            lead_id: context.lead_id,
            lead_service_id: service.id,
            old_status: from_status,
            analysis_id: analysis.id,
        });
        Ok(decision)
    }
}
