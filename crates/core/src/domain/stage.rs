use serde::{Deserialize, Serialize};

use crate::normalize::{fold_label, LenientEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineStage {
    Triage,
    Nurturing,
    Estimation,
    Fulfillment,
    ManualIntervention,
    Completed,
    Lost,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 7] = [
        Self::Triage,
        Self::Nurturing,
        Self::Estimation,
        Self::Fulfillment,
        Self::ManualIntervention,
        Self::Completed,
        Self::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triage => "Triage",
            Self::Nurturing => "Nurturing",
            Self::Estimation => "Estimation",
            Self::Fulfillment => "Fulfillment",
            Self::ManualIntervention => "ManualIntervention",
            Self::Completed => "Completed",
            Self::Lost => "Lost",
        }
    }

    /// Strict parse: canonical names and known synonyms only. Stage changes never fall back
    /// to a default, an unknown stage is rejected by the pipeline engine instead.
    pub fn parse(raw: &str) -> Option<Self> {
        match fold_label(raw).as_str() {
            "triage" | "intake" | "new" | "nieuw" => Some(Self::Triage),
            "nurturing" | "nurture" | "follow_up" | "opvolging" | "needs_info" => {
                Some(Self::Nurturing)
            }
            "estimation" | "estimate" | "quote" | "quoting" | "offerte" | "calculatie"
            | "ready_for_estimator" => Some(Self::Estimation),
            "fulfillment" | "fulfilment" | "dispatch" | "partner_matching" | "uitvoering"
            | "ready_for_partner" => Some(Self::Fulfillment),
            "manual_intervention" | "manual" | "escalated" | "geescaleerd" | "handmatig" => {
                Some(Self::ManualIntervention)
            }
            "completed" | "complete" | "done" | "afgerond" | "voltooid" => Some(Self::Completed),
            "lost" | "verloren" | "closed_lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadServiceStatus {
    New,
    Pending,
    InProgress,
    Scheduled,
    Disqualified,
    Closed,
}

impl LeadServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Scheduled => "Scheduled",
            Self::Disqualified => "Disqualified",
            Self::Closed => "Closed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disqualified | Self::Closed)
    }
}

impl std::fmt::Display for LeadServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LenientEnum for LeadServiceStatus {
    const KIND: &'static str = "lead_service_status";
    const FALLBACK: Self = Self::Pending;

    fn parse(raw: &str) -> Option<Self> {
        match fold_label(raw).as_str() {
            "new" | "nieuw" => Some(Self::New),
            "pending" | "open" | "wachtend" | "attempted_contact" => Some(Self::Pending),
            "in_progress" | "active" | "bezig" | "in_behandeling" => Some(Self::InProgress),
            "scheduled" | "appointment_scheduled" | "gepland" | "ingepland" => {
                Some(Self::Scheduled)
            }
            "disqualified" | "gediskwalificeerd" | "junk" | "spam" => Some(Self::Disqualified),
            "closed" | "gesloten" | "archived" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::normalize::LenientEnum;

    use super::{LeadServiceStatus, PipelineStage};

    #[test]
    fn canonical_stage_names_round_trip() {
        for stage in PipelineStage::ALL {
            assert_eq!(PipelineStage::parse(stage.as_str()), Some(stage));
        }
    }

    #[test]
    fn stage_synonyms_normalize_onto_the_fixed_set() {
        let cases = [
            ("manual", PipelineStage::ManualIntervention),
            ("Manual Intervention", PipelineStage::ManualIntervention),
            ("MANUAL_INTERVENTION", PipelineStage::ManualIntervention),
            ("offerte", PipelineStage::Estimation),
            ("Quote", PipelineStage::Estimation),
            ("nurture", PipelineStage::Nurturing),
            ("Geëscaleerd", PipelineStage::ManualIntervention),
            ("afgerond", PipelineStage::Completed),
            ("verloren", PipelineStage::Lost),
            ("dispatch", PipelineStage::Fulfillment),
        ];

        for (raw, expected) in cases {
            assert_eq!(PipelineStage::parse(raw), Some(expected), "input: {raw}");
        }
    }

    #[test]
    fn unknown_stage_is_rejected_not_defaulted() {
        assert_eq!(PipelineStage::parse("Invoicing"), None);
        assert_eq!(PipelineStage::parse(""), None);
    }

    #[test]
    fn status_normalization_defaults_to_pending() {
        assert_eq!(LeadServiceStatus::normalize("In behandeling"), LeadServiceStatus::InProgress);
        assert_eq!(LeadServiceStatus::normalize("gepland"), LeadServiceStatus::Scheduled);
        assert_eq!(LeadServiceStatus::normalize("who knows"), LeadServiceStatus::Pending);
    }

    #[test]
    fn only_disqualified_and_closed_are_terminal() {
        assert!(LeadServiceStatus::Disqualified.is_terminal());
        assert!(LeadServiceStatus::Closed.is_terminal());
        assert!(!LeadServiceStatus::Pending.is_terminal());
        assert!(!LeadServiceStatus::New.is_terminal());
    }
}
