use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A catalog search hit. Prices are minor units, VAT in basis points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub title: String,
    pub unit: Option<String>,
    pub price_cents: i64,
    pub vat_rate_bps: i64,
    pub score: f64,
    pub from_catalog: bool,
}

/// The backend-resolved price for a catalog product. Always wins over a model estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPrice {
    pub unit_price_cents: i64,
    pub tax_rate_bps: i64,
}
