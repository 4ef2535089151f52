use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::analysis::AnalysisId;
use crate::domain::lead::{LeadId, LeadServiceId, TenantId};
use crate::domain::stage::{LeadServiceStatus, PipelineStage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageChanged {
        tenant_id: TenantId,
        lead_id: LeadId,
        lead_service_id: LeadServiceId,
        old_stage: PipelineStage,
        new_stage: PipelineStage,
        reason: String,
    },
    AutoDisqualified {
        tenant_id: TenantId,
        lead_id: LeadId,
        lead_service_id: LeadServiceId,
        old_status: LeadServiceStatus,
        analysis_id: AnalysisId,
    },
    AuditCompleted {
        tenant_id: TenantId,
        lead_id: LeadId,
        lead_service_id: LeadServiceId,
        passed: bool,
        missing: Vec<String>,
    },
}

impl PipelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StageChanged { .. } => "stage_changed",
            Self::AutoDisqualified { .. } => "auto_disqualified",
            Self::AuditCompleted { .. } => "audit_completed",
        }
    }

    pub fn lead_service_id(&self) -> LeadServiceId {
        match self {
            Self::StageChanged { lead_service_id, .. }
            | Self::AutoDisqualified { lead_service_id, .. }
            | Self::AuditCompleted { lead_service_id, .. } => *lead_service_id,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("event bus publish failed: {0}")]
pub struct EventBusError(pub String);

/// Fire-and-forget notification sink. Callers log publish errors and carry on.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: PipelineEvent) -> Result<(), EventBusError>;
}

#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl InMemoryEventBus {
    pub fn events(&self) -> Vec<PipelineEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(&self, event: PipelineEvent) -> Result<(), EventBusError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
        Ok(())
    }
}

/// Publishes by emitting a structured log line; used when no broker is configured.
#[derive(Clone, Debug, Default)]
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn publish(&self, event: PipelineEvent) -> Result<(), EventBusError> {
        let payload =
            serde_json::to_string(&event).map_err(|error| EventBusError(error.to_string()))?;
        info!(
            event_name = "event_bus.published",
            bus_event = event.name(),
            lead_service_id = %event.lead_service_id(),
            payload = %payload,
            "pipeline event published"
        );
        Ok(())
    }
}
