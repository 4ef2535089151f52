use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::TenantId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartnerQuery {
    pub tenant_id: TenantId,
    pub service_type: String,
    pub zip_code: String,
    pub radius_km: u32,
    pub exclude: Vec<PartnerId>,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartnerMatch {
    pub partner_id: PartnerId,
    pub business_name: String,
    pub distance_km: f64,
    pub rating: Option<f64>,
    pub score: f64,
}
