use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{Actor, LeadId, LeadServiceId, TenantId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadNote {
    pub id: NoteId,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub lead_service_id: LeadServiceId,
    pub body: String,
    pub author: Actor,
    pub is_fallback: bool,
    pub created_at: DateTime<Utc>,
}

impl LeadNote {
    pub fn new(
        tenant_id: TenantId,
        lead_id: LeadId,
        lead_service_id: LeadServiceId,
        body: impl Into<String>,
        author: Actor,
    ) -> Self {
        Self {
            id: NoteId(Uuid::new_v4()),
            tenant_id,
            lead_id,
            lead_service_id,
            body: body.into(),
            author,
            is_fallback: false,
            created_at: Utc::now(),
        }
    }
}
