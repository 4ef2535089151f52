use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::stage::{LeadServiceStatus, PipelineStage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadServiceId(pub Uuid);

macro_rules! uuid_id {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(TenantId);
uuid_id!(LeadId);
uuid_id!(LeadServiceId);

/// Who caused a mutation. Agents identify themselves by name; humans by user id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Agent(String),
    User(Uuid),
    System,
}

impl Actor {
    pub fn agent(name: impl Into<String>) -> Self {
        Self::Agent(name.into())
    }

    pub fn label(&self) -> String {
        match self {
            Self::Agent(name) => format!("agent:{name}"),
            Self::User(id) => format!("user:{id}"),
            Self::System => "system".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub tenant_id: TenantId,
    pub consumer_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().map(|phone| !phone.trim().is_empty()).unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeadService {
    pub id: LeadServiceId,
    pub lead_id: LeadId,
    pub tenant_id: TenantId,
    pub service_type: String,
    pub stage: PipelineStage,
    pub status: LeadServiceStatus,
    pub consumer_note: Option<String>,
    pub customer_preferences: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{Actor, Lead, LeadId, TenantId};

    #[test]
    fn blank_phone_does_not_count_as_contact_data() {
        let mut lead = Lead {
            id: LeadId::new(),
            tenant_id: TenantId::new(),
            consumer_name: "J. de Vries".to_string(),
            phone: Some("   ".to_string()),
            email: Some("jdv@example.nl".to_string()),
            zip_code: Some("1012AB".to_string()),
            created_at: Utc::now(),
        };
        assert!(!lead.has_phone());

        lead.phone = Some("+31612345678".to_string());
        assert!(lead.has_phone());
    }

    #[test]
    fn actor_labels_are_stable() {
        assert_eq!(Actor::agent("gatekeeper").label(), "agent:gatekeeper");
        assert_eq!(Actor::System.label(), "system");
        let id = Uuid::nil();
        assert_eq!(Actor::User(id).label(), format!("user:{id}"));
    }

    #[test]
    fn nil_ids_are_detectable() {
        assert!(TenantId(Uuid::nil()).is_nil());
        assert!(!TenantId::new().is_nil());
    }
}
