use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{Lead, LeadId, LeadServiceId, TenantId};
use crate::normalize::{fold_label, LenientEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(pub Uuid);

impl AnalysisId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    High,
    Medium,
    Low,
    Unknown,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }
}

impl LenientEnum for Urgency {
    const KIND: &'static str = "urgency";
    const FALLBACK: Self = Self::Unknown;

    fn parse(raw: &str) -> Option<Self> {
        match fold_label(raw).as_str() {
            "high" | "urgent" | "hoog" | "spoed" | "dringend" => Some(Self::High),
            "medium" | "normal" | "gemiddeld" | "normaal" | "middel" => Some(Self::Medium),
            "low" | "laag" | "none" | "geen" => Some(Self::Low),
            "unknown" | "onbekend" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadQuality {
    Junk,
    Low,
    Potential,
    High,
    Urgent,
}

impl LeadQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Junk => "Junk",
            Self::Low => "Low",
            Self::Potential => "Potential",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

impl LenientEnum for LeadQuality {
    const KIND: &'static str = "lead_quality";
    const FALLBACK: Self = Self::Potential;

    fn parse(raw: &str) -> Option<Self> {
        match fold_label(raw).as_str() {
            "junk" | "spam" | "fake" | "onzin" | "nep" | "troll" => Some(Self::Junk),
            "low" | "low_quality" | "laag" | "zwak" => Some(Self::Low),
            "potential" | "medium" | "potentieel" | "gemiddeld" => Some(Self::Potential),
            "high" | "high_value" | "good" | "hoog" | "goed" => Some(Self::High),
            "urgent" | "spoed" | "dringend" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    Reject,
    RequestInfo,
    ScheduleSurvey,
    CallImmediately,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "Reject",
            Self::RequestInfo => "RequestInfo",
            Self::ScheduleSurvey => "ScheduleSurvey",
            Self::CallImmediately => "CallImmediately",
        }
    }
}

impl LenientEnum for RecommendedAction {
    const KIND: &'static str = "recommended_action";
    const FALLBACK: Self = Self::RequestInfo;

    fn parse(raw: &str) -> Option<Self> {
        match fold_label(raw).as_str() {
            "reject" | "decline" | "afwijzen" | "weigeren" => Some(Self::Reject),
            "request_info" | "ask_info" | "more_info" | "informatie_opvragen" | "info_opvragen"
            | "vraag_info" => Some(Self::RequestInfo),
            "schedule_survey" | "survey" | "schedule_visit" | "inmeting" | "schouw"
            | "inmeting_plannen" => Some(Self::ScheduleSurvey),
            "call_immediately" | "call" | "call_now" | "direct_bellen" | "bellen" => {
                Some(Self::CallImmediately)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactChannel {
    WhatsApp,
    Email,
}

impl ContactChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WhatsApp => "WhatsApp",
            Self::Email => "Email",
        }
    }

    /// Phone present means WhatsApp, otherwise email.
    pub fn preferred_for(lead: &Lead) -> Self {
        if lead.has_phone() {
            Self::WhatsApp
        } else {
            Self::Email
        }
    }
}

impl LenientEnum for ContactChannel {
    const KIND: &'static str = "contact_channel";
    const FALLBACK: Self = Self::Email;

    fn parse(raw: &str) -> Option<Self> {
        match fold_label(raw).as_str() {
            "whatsapp" | "whats_app" | "wa" | "app" | "sms" | "phone" | "telefoon" => {
                Some(Self::WhatsApp)
            }
            "email" | "e_mail" | "mail" => Some(Self::Email),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub id: AnalysisId,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub lead_service_id: LeadServiceId,
    pub urgency: Urgency,
    pub urgency_reason: Option<String>,
    pub lead_quality: LeadQuality,
    pub recommended_action: RecommendedAction,
    pub missing_information: Vec<String>,
    pub preferred_channel: ContactChannel,
    pub suggested_message: String,
    pub summary: String,
    pub is_fallback: bool,
    pub created_at: DateTime<Utc>,
}

impl AiAnalysis {
    pub fn needs_more_information(&self) -> bool {
        !self.missing_information.is_empty()
            || self.recommended_action == RecommendedAction::RequestInfo
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::lead::{Lead, LeadId, TenantId};
    use crate::normalize::LenientEnum;

    use super::{ContactChannel, LeadQuality, RecommendedAction, Urgency};

    #[test]
    fn urgency_accepts_english_and_dutch_labels() {
        assert_eq!(Urgency::normalize("High"), Urgency::High);
        assert_eq!(Urgency::normalize("spoed"), Urgency::High);
        assert_eq!(Urgency::normalize("Gemiddeld"), Urgency::Medium);
        assert_eq!(Urgency::normalize("laag"), Urgency::Low);
        assert_eq!(Urgency::normalize("tomorrow-ish"), Urgency::Unknown);
    }

    #[test]
    fn quality_maps_spam_synonyms_to_junk() {
        for raw in ["Junk", "spam", "onzin", "NEP"] {
            assert_eq!(LeadQuality::normalize(raw), LeadQuality::Junk, "input: {raw}");
        }
        assert_eq!(LeadQuality::normalize("goed"), LeadQuality::High);
        assert_eq!(LeadQuality::normalize("??"), LeadQuality::Potential);
    }

    #[test]
    fn recommended_action_defaults_to_request_info() {
        assert_eq!(RecommendedAction::normalize("ScheduleSurvey"), RecommendedAction::ScheduleSurvey);
        assert_eq!(RecommendedAction::normalize("inmeting plannen"), RecommendedAction::ScheduleSurvey);
        assert_eq!(RecommendedAction::normalize("Direct bellen"), RecommendedAction::CallImmediately);
        assert_eq!(RecommendedAction::normalize("Reject"), RecommendedAction::Reject);
        assert_eq!(RecommendedAction::normalize("think about it"), RecommendedAction::RequestInfo);
    }

    #[test]
    fn storage_labels_parse_back() {
        for urgency in [Urgency::High, Urgency::Medium, Urgency::Low, Urgency::Unknown] {
            assert_eq!(Urgency::parse(urgency.as_str()), Some(urgency));
        }
        for action in [
            RecommendedAction::Reject,
            RecommendedAction::RequestInfo,
            RecommendedAction::ScheduleSurvey,
            RecommendedAction::CallImmediately,
        ] {
            assert_eq!(RecommendedAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(LeadQuality::parse(LeadQuality::Potential.as_str()), Some(LeadQuality::Potential));
        assert_eq!(ContactChannel::parse(ContactChannel::WhatsApp.as_str()), Some(ContactChannel::WhatsApp));
    }

    #[test]
    fn channel_normalization_and_contact_derivation() {
        assert_eq!(ContactChannel::normalize("WhatsApp"), ContactChannel::WhatsApp);
        assert_eq!(ContactChannel::normalize("e-mail"), ContactChannel::Email);
        assert_eq!(ContactChannel::normalize("pigeon"), ContactChannel::Email);

        let mut lead = Lead {
            id: LeadId::new(),
            tenant_id: TenantId::new(),
            consumer_name: "Sanne".to_string(),
            phone: None,
            email: Some("sanne@example.nl".to_string()),
            zip_code: None,
            created_at: Utc::now(),
        };
        assert_eq!(ContactChannel::preferred_for(&lead), ContactChannel::Email);
        lead.phone = Some("0612345678".to_string());
        assert_eq!(ContactChannel::preferred_for(&lead), ContactChannel::WhatsApp);
    }
}
