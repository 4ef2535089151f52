use std::sync::Arc;

use leadflow_core::config::AgentConfig;
use leadflow_core::domain::lead::{Lead, LeadService};
use leadflow_core::errors::ApplicationError;
use leadflow_core::events::{EventBus, PipelineEvent};
use leadflow_db::repositories::{
    AnalysisRepository, InMemoryPartnerDirectory, InMemoryProductCatalog, LeadRepository,
    NoteRepository, PartnerDirectory, ProductCatalog, QuoteRepository, SqlAnalysisRepository,
    SqlLeadRepository, SqlNoteRepository, SqlQuoteRepository, SqlTimelineRepository,
    TimelineRepository,
};
use leadflow_db::DbPool;
use tracing::warn;

use crate::context::RunContext;

/// Everything the tools, the stage machine and the fallback layer talk to.
#[derive(Clone)]
pub struct PipelineServices {
    pub leads: Arc<dyn LeadRepository>,
    pub timeline: Arc<dyn TimelineRepository>,
    pub analyses: Arc<dyn AnalysisRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub partners: Arc<dyn PartnerDirectory>,
    pub events: Arc<dyn EventBus>,
    pub settings: AgentConfig,
}

impl PipelineServices {
    /// SQLite-backed repositories. Catalog and partner search stay in memory until a
    /// search backend is configured.
    pub fn sqlite(pool: DbPool, events: Arc<dyn EventBus>, settings: AgentConfig) -> Self {
        Self {
            leads: Arc::new(SqlLeadRepository::new(pool.clone())),
            timeline: Arc::new(SqlTimelineRepository::new(pool.clone())),
            analyses: Arc::new(SqlAnalysisRepository::new(pool.clone())),
            quotes: Arc::new(SqlQuoteRepository::new(pool.clone())),
            notes: Arc::new(SqlNoteRepository::new(pool)),
            catalog: Arc::new(InMemoryProductCatalog::default()),
            partners: Arc::new(InMemoryPartnerDirectory::default()),
            events,
            settings,
        }
    }

    pub async fn load_lead(&self, context: &RunContext) -> Result<Lead, ApplicationError> {
        self.leads
            .find_lead(&context.tenant_id, &context.lead_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("lead", context.lead_id))
    }

    pub async fn load_service(&self, context: &RunContext) -> Result<LeadService, ApplicationError> {
        let service = self
            .leads
            .find_service(&context.tenant_id, &context.lead_service_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("lead_service", context.lead_service_id))?;

        if service.lead_id != context.lead_id {
            return Err(ApplicationError::ValidationFailed(format!(
                "lead service {} does not belong to lead {}",
                service.id, context.lead_id
            )));
        }
        Ok(service)
    }

    /// Best effort: a failed publish is logged and never fails the caller.
    pub fn publish(&self, event: PipelineEvent) {
        let name = event.name();
        let lead_service_id = event.lead_service_id();
        if let Err(error) = self.events.publish(event) {
            warn!(
                event_name = "event_bus.publish_failed",
                bus_event = name,
                lead_service_id = %lead_service_id,
                error = %error,
                "event bus publish failed; continuing"
            );
        }
    }
}
