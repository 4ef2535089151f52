use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calc::QuoteTotals;
use crate::domain::lead::{LeadId, LeadServiceId, TenantId};
use crate::domain::product::ProductId;
use crate::normalize::{fold_label, LenientEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub Uuid);

impl QuoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QuoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    Exclusive,
    Inclusive,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Inclusive => "inclusive",
        }
    }
}

impl LenientEnum for PricingMode {
    const KIND: &'static str = "pricing_mode";
    const FALLBACK: Self = Self::Exclusive;

    fn parse(raw: &str) -> Option<Self> {
        match fold_label(raw).as_str() {
            "exclusive" | "excl" | "ex_vat" | "exclusief" | "excl_btw" => Some(Self::Exclusive),
            "inclusive" | "incl" | "inc_vat" | "inclusief" | "incl_btw" => Some(Self::Inclusive),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Value in basis points of the pre-tax subtotal.
    Percentage,
    /// Value in minor currency units.
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim() == "%" {
            return Some(Self::Percentage);
        }
        match fold_label(raw).as_str() {
            "percentage" | "percent" | "pct" | "procent" => Some(Self::Percentage),
            "fixed" | "amount" | "flat" | "vast" | "bedrag" => Some(Self::Fixed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub description: String,
    /// Decimal string, parsed exactly; never a float.
    pub quantity: String,
    pub unit_price_cents: i64,
    pub tax_rate_bps: i64,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default = "default_selected")]
    pub is_selected: bool,
    #[serde(default)]
    pub catalog_product_id: Option<ProductId>,
}

fn default_selected() -> bool {
    true
}

impl QuoteItem {
    /// Optional items only count when the customer selected them.
    pub fn participates(&self) -> bool {
        !self.is_optional || self.is_selected
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub number: String,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub lead_service_id: LeadServiceId,
    pub pricing_mode: PricingMode,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub items: Vec<QuoteItem>,
    pub totals: QuoteTotals,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
