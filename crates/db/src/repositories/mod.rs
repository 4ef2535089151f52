use async_trait::async_trait;
use thiserror::Error;

use leadflow_core::domain::analysis::AiAnalysis;
use leadflow_core::domain::lead::{Lead, LeadId, LeadService, LeadServiceId, TenantId};
use leadflow_core::domain::note::LeadNote;
use leadflow_core::domain::partner::{PartnerMatch, PartnerQuery};
use leadflow_core::domain::product::{CatalogPrice, CatalogProduct, ProductId};
use leadflow_core::domain::quote::{Quote, QuoteId};
use leadflow_core::domain::stage::{LeadServiceStatus, PipelineStage};
use leadflow_core::domain::timeline::TimelineEvent;
use leadflow_core::errors::ApplicationError;

pub mod analysis;
pub mod catalog;
pub mod codec;
pub mod lead;
pub mod memory;
pub mod note;
pub mod quote;
pub mod timeline;

pub use analysis::SqlAnalysisRepository;
pub use catalog::{DirectoryPartner, InMemoryPartnerDirectory, InMemoryProductCatalog};
pub use lead::SqlLeadRepository;
pub use memory::{
    InMemoryAnalysisRepository, InMemoryLeadRepository, InMemoryNoteRepository,
    InMemoryQuoteRepository, InMemoryTimelineRepository,
};
pub use note::SqlNoteRepository;
pub use quote::SqlQuoteRepository;
pub use timeline::SqlTimelineRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// Lead and lead-service storage. Every call is scoped by tenant; a row that belongs to a
/// different tenant is reported as absent.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_lead(&self, tenant_id: &TenantId, id: &LeadId)
        -> Result<Option<Lead>, RepositoryError>;
    async fn save_lead(&self, lead: Lead) -> Result<(), RepositoryError>;

    async fn find_service(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
    ) -> Result<Option<LeadService>, RepositoryError>;
    async fn save_service(&self, service: LeadService) -> Result<(), RepositoryError>;

    async fn update_stage(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        stage: PipelineStage,
    ) -> Result<(), RepositoryError>;
    async fn update_status(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        status: LeadServiceStatus,
    ) -> Result<(), RepositoryError>;
    async fn update_service_type(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        service_type: &str,
    ) -> Result<(), RepositoryError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait TimelineRepository: Send + Sync {
    async fn append(&self, event: TimelineEvent) -> Result<(), RepositoryError>;
    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<TimelineEvent>, RepositoryError>;
}

#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn save(&self, analysis: AiAnalysis) -> Result<(), RepositoryError>;
    /// Newest record wins.
    async fn latest_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Option<AiAnalysis>, RepositoryError>;
    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<AiAnalysis>, RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: &TenantId, id: &QuoteId)
        -> Result<Option<Quote>, RepositoryError>;
    async fn save(&self, quote: Quote) -> Result<(), RepositoryError>;
    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<Quote>, RepositoryError>;
    /// Next human-facing quote number for the tenant, e.g. `Q-2026-0007`.
    async fn next_number(&self, tenant_id: &TenantId) -> Result<String, RepositoryError>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn save(&self, note: LeadNote) -> Result<(), RepositoryError>;
    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<LeadNote>, RepositoryError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductSearch {
    pub tenant_id: TenantId,
    pub query: String,
    pub limit: usize,
    pub min_score: f64,
    /// Restrict hits to the tenant's own catalog.
    pub catalog_only: bool,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn search(&self, search: &ProductSearch) -> Result<Vec<CatalogProduct>, RepositoryError>;
    async fn find_price(
        &self,
        tenant_id: &TenantId,
        id: &ProductId,
    ) -> Result<Option<CatalogPrice>, RepositoryError>;
}

#[async_trait]
pub trait PartnerDirectory: Send + Sync {
    async fn find_matches(&self, query: &PartnerQuery) -> Result<Vec<PartnerMatch>, RepositoryError>;
}

pub(crate) fn format_quote_number(year: i32, sequence: i64) -> String {
    format!("Q-{year}-{sequence:04}")
}
