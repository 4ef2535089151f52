use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{Actor, LeadId, LeadServiceId, TenantId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    StageChange,
    StageUpdateFallback,
    StatusChange,
    ServiceTypeChange,
    AnalysisCreated,
    AnalysisFallback,
    AutoDisqualified,
    QuoteDrafted,
    EstimationSaved,
    EstimationFallback,
    IntakeEscalation,
    PartnerSearch,
    DispatchFallback,
    AuditResult,
    AuditFallback,
    NoteAdded,
    CallLogFallback,
}

impl TimelineEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StageChange => "stage_change",
            Self::StageUpdateFallback => "stage_update_fallback",
            Self::StatusChange => "status_change",
            Self::ServiceTypeChange => "service_type_change",
            Self::AnalysisCreated => "analysis_created",
            Self::AnalysisFallback => "analysis_fallback",
            Self::AutoDisqualified => "auto_disqualified",
            Self::QuoteDrafted => "quote_drafted",
            Self::EstimationSaved => "estimation_saved",
            Self::EstimationFallback => "estimation_fallback",
            Self::IntakeEscalation => "intake_escalation",
            Self::PartnerSearch => "partner_search",
            Self::DispatchFallback => "dispatch_fallback",
            Self::AuditResult => "audit_result",
            Self::AuditFallback => "audit_fallback",
            Self::NoteAdded => "note_added",
            Self::CallLogFallback => "call_log_fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stage_change" => Some(Self::StageChange),
            "stage_update_fallback" => Some(Self::StageUpdateFallback),
            "status_change" => Some(Self::StatusChange),
            "service_type_change" => Some(Self::ServiceTypeChange),
            "analysis_created" => Some(Self::AnalysisCreated),
            "analysis_fallback" => Some(Self::AnalysisFallback),
            "auto_disqualified" => Some(Self::AutoDisqualified),
            "quote_drafted" => Some(Self::QuoteDrafted),
            "estimation_saved" => Some(Self::EstimationSaved),
            "estimation_fallback" => Some(Self::EstimationFallback),
            "intake_escalation" => Some(Self::IntakeEscalation),
            "partner_search" => Some(Self::PartnerSearch),
            "dispatch_fallback" => Some(Self::DispatchFallback),
            "audit_result" => Some(Self::AuditResult),
            "audit_fallback" => Some(Self::AuditFallback),
            "note_added" => Some(Self::NoteAdded),
            "call_log_fallback" => Some(Self::CallLogFallback),
            _ => None,
        }
    }

    /// Fallback kinds mark records the system synthesized because a mandated tool call
    /// never happened.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            Self::AnalysisFallback
                | Self::StageUpdateFallback
                | Self::EstimationFallback
                | Self::IntakeEscalation
                | Self::DispatchFallback
                | Self::AuditFallback
                | Self::CallLogFallback
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub lead_service_id: LeadServiceId,
    pub kind: TimelineEventKind,
    pub actor: Actor,
    pub summary: String,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl TimelineEvent {
    pub fn new(
        tenant_id: TenantId,
        lead_id: LeadId,
        lead_service_id: LeadServiceId,
        kind: TimelineEventKind,
        actor: Actor,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            lead_id,
            lead_service_id,
            kind,
            actor,
            summary: summary.into(),
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
