//! In-memory catalog and partner directory. Real deployments put a vector search and a
//! geo index behind the same traits; these keep the agents testable without either.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

use leadflow_core::domain::lead::TenantId;
use leadflow_core::domain::partner::{PartnerId, PartnerMatch, PartnerQuery};
use leadflow_core::domain::product::{CatalogPrice, CatalogProduct, ProductId};
use leadflow_core::normalize::fold_label;

use super::{PartnerDirectory, ProductCatalog, ProductSearch, RepositoryError};

const EARTH_RADIUS_KM: f64 = 6371.0;
const DISTANCE_WEIGHT: f64 = 0.6;
const RATING_WEIGHT: f64 = 0.4;
const NEUTRAL_RATING: f64 = 3.0;

#[derive(Default)]
pub struct InMemoryProductCatalog {
    products: RwLock<HashMap<TenantId, Vec<CatalogProduct>>>,
}

impl InMemoryProductCatalog {
    pub fn with_products(tenant_id: TenantId, products: Vec<CatalogProduct>) -> Self {
        Self { products: RwLock::new(HashMap::from([(tenant_id, products)])) }
    }

    pub async fn insert(&self, tenant_id: TenantId, product: CatalogProduct) {
        self.products.write().await.entry(tenant_id).or_default().push(product);
    }
}

fn tokens(text: &str) -> BTreeSet<String> {
    fold_label(text)
        .split('_')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Share of query tokens found in the title.
fn overlap_score(query: &BTreeSet<String>, title: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let title = tokens(title);
    let hits = query.iter().filter(|token| title.contains(*token)).count();
    hits as f64 / query.len() as f64
}

#[async_trait::async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn search(&self, search: &ProductSearch) -> Result<Vec<CatalogProduct>, RepositoryError> {
        let products = self.products.read().await;
        let Some(candidates) = products.get(&search.tenant_id) else {
            return Ok(Vec::new());
        };

        let query = tokens(&search.query);
        let mut hits: Vec<CatalogProduct> = candidates
            .iter()
            .filter(|product| !search.catalog_only || product.from_catalog)
            .filter_map(|product| {
                let score = overlap_score(&query, &product.title);
                (score >= search.min_score && score > 0.0)
                    .then(|| CatalogProduct { score, ..product.clone() })
            })
            .collect();

        hits.sort_by(|left, right| {
            right.score.total_cmp(&left.score).then_with(|| left.title.cmp(&right.title))
        });
        hits.truncate(search.limit);
        Ok(hits)
    }

    async fn find_price(
        &self,
        tenant_id: &TenantId,
        id: &ProductId,
    ) -> Result<Option<CatalogPrice>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .get(tenant_id)
            .and_then(|products| {
                products.iter().find(|product| product.from_catalog && product.id == *id)
            })
            .map(|product| CatalogPrice {
                unit_price_cents: product.price_cents,
                tax_rate_bps: product.vat_rate_bps,
            }))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirectoryPartner {
    pub partner_id: PartnerId,
    pub tenant_id: TenantId,
    pub business_name: String,
    pub service_types: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: Option<f64>,
}

impl DirectoryPartner {
    fn offers(&self, service_type: &str) -> bool {
        let wanted = fold_label(service_type);
        self.service_types.iter().any(|offered| fold_label(offered) == wanted)
    }
}

/// Partners plus the zip code centroids used to measure distance to a lead.
#[derive(Default)]
pub struct InMemoryPartnerDirectory {
    partners: RwLock<Vec<DirectoryPartner>>,
    zip_centroids: RwLock<HashMap<String, (f64, f64)>>,
}

impl InMemoryPartnerDirectory {
    pub async fn add_partner(&self, partner: DirectoryPartner) {
        self.partners.write().await.push(partner);
    }

    pub async fn add_zip_centroid(&self, zip_code: &str, latitude: f64, longitude: f64) {
        self.zip_centroids.write().await.insert(normalize_zip(zip_code), (latitude, longitude));
    }
}

fn normalize_zip(zip_code: &str) -> String {
    zip_code.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase()
}

fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let a = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

fn match_score(distance_km: f64, radius_km: f64, rating: Option<f64>) -> f64 {
    let closeness = if radius_km > 0.0 { 1.0 - (distance_km / radius_km).min(1.0) } else { 1.0 };
    let rating = rating.unwrap_or(NEUTRAL_RATING).clamp(0.0, 5.0) / 5.0;
    DISTANCE_WEIGHT * closeness + RATING_WEIGHT * rating
}

#[async_trait::async_trait]
impl PartnerDirectory for InMemoryPartnerDirectory {
    async fn find_matches(&self, query: &PartnerQuery) -> Result<Vec<PartnerMatch>, RepositoryError> {
        let origin = match self.zip_centroids.read().await.get(&normalize_zip(&query.zip_code)) {
            Some(origin) => *origin,
            None => {
                tracing::debug!(
                    event_name = "partners.unknown_zip",
                    zip_code = %query.zip_code,
                    "no centroid for zip code; no partners matched"
                );
                return Ok(Vec::new());
            }
        };

        let radius_km = f64::from(query.radius_km);
        let partners = self.partners.read().await;
        let mut matches: Vec<PartnerMatch> = partners
            .iter()
            .filter(|partner| partner.tenant_id == query.tenant_id)
            .filter(|partner| !query.exclude.contains(&partner.partner_id))
            .filter(|partner| partner.offers(&query.service_type))
            .filter_map(|partner| {
                let distance_km = haversine_km(origin, (partner.latitude, partner.longitude));
                (distance_km <= radius_km).then(|| PartnerMatch {
                    partner_id: partner.partner_id,
                    business_name: partner.business_name.clone(),
                    distance_km,
                    rating: partner.rating,
                    score: match_score(distance_km, radius_km, partner.rating),
                })
            })
            .collect();

        matches.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.distance_km.total_cmp(&right.distance_km))
        });
        matches.truncate(query.limit);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use leadflow_core::domain::lead::TenantId;
    use leadflow_core::domain::partner::{PartnerId, PartnerQuery};
    use leadflow_core::domain::product::{CatalogProduct, ProductId};

    use super::{DirectoryPartner, InMemoryPartnerDirectory, InMemoryProductCatalog};
    use crate::repositories::{PartnerDirectory, ProductCatalog, ProductSearch};

    fn product(id: &str, title: &str, from_catalog: bool) -> CatalogProduct {
        CatalogProduct {
            id: ProductId(id.to_string()),
            title: title.to_string(),
            unit: Some("stuk".to_string()),
            price_cents: 4_250,
            vat_rate_bps: 2_100,
            score: 0.0,
            from_catalog,
        }
    }

    #[tokio::test]
    async fn search_ranks_by_token_overlap_and_respects_filters() {
        let tenant_id = TenantId::new();
        let catalog = InMemoryProductCatalog::with_products(
            tenant_id,
            vec![
                product("p-1", "Dakpan keramisch rood", true),
                product("p-2", "Dakpan beton", false),
                product("p-3", "Regenpijp zink", true),
            ],
        );

        let search = |catalog_only| ProductSearch {
            tenant_id,
            query: "dakpan rood".to_string(),
            limit: 10,
            min_score: 0.4,
            catalog_only,
        };

        let hits = catalog.search(&search(false)).await.expect("search");
        let ids: Vec<_> = hits.iter().map(|hit| hit.id.0.as_str()).collect();
        assert_eq!(ids, vec!["p-1", "p-2"]);
        assert!((hits[0].score - 1.0).abs() < f64::EPSILON);

        let hits = catalog.search(&search(true)).await.expect("search");
        assert_eq!(hits.len(), 1);

        assert!(catalog
            .search(&ProductSearch { tenant_id: TenantId::new(), ..search(false) })
            .await
            .expect("search")
            .is_empty());
    }

    #[tokio::test]
    async fn find_price_only_resolves_catalog_products() {
        let tenant_id = TenantId::new();
        let catalog = InMemoryProductCatalog::default();
        catalog.insert(tenant_id, product("p-1", "Dakpan", true)).await;
        catalog.insert(tenant_id, product("p-2", "Dakpan", false)).await;

        let price = catalog
            .find_price(&tenant_id, &ProductId("p-1".to_string()))
            .await
            .expect("lookup")
            .expect("price");
        assert_eq!(price.unit_price_cents, 4_250);
        assert!(catalog
            .find_price(&tenant_id, &ProductId("p-2".to_string()))
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn partners_filter_by_service_radius_and_exclusions() {
        let tenant_id = TenantId::new();
        let directory = InMemoryPartnerDirectory::default();
        directory.add_zip_centroid("3511 AB", 52.0907, 5.1214).await;

        let near = PartnerId(Uuid::new_v4());
        let excluded = PartnerId(Uuid::new_v4());
        let far = PartnerId(Uuid::new_v4());
        for (partner_id, name, lat, lon) in [
            (near, "Dakwerken Utrecht", 52.10, 5.13),
            (excluded, "Dak & Co", 52.09, 5.12),
            (far, "Dakbedrijf Groningen", 53.22, 6.57),
        ] {
            directory
                .add_partner(DirectoryPartner {
                    partner_id,
                    tenant_id,
                    business_name: name.to_string(),
                    service_types: vec!["Dakreparatie".to_string()],
                    latitude: lat,
                    longitude: lon,
                    rating: Some(4.5),
                })
                .await;
        }

        let matches = directory
            .find_matches(&PartnerQuery {
                tenant_id,
                service_type: "dakreparatie".to_string(),
                zip_code: "3511ab".to_string(),
                radius_km: 30,
                exclude: vec![excluded],
                limit: 5,
            })
            .await
            .expect("matches");

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].partner_id, near);
        assert!(matches[0].distance_km < 5.0);
    }
}
