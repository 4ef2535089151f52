use std::collections::HashMap;

use chrono::{Datelike, Utc};
use tokio::sync::RwLock;

use leadflow_core::domain::analysis::AiAnalysis;
use leadflow_core::domain::lead::{Lead, LeadId, LeadService, LeadServiceId, TenantId};
use leadflow_core::domain::note::LeadNote;
use leadflow_core::domain::quote::{Quote, QuoteId};
use leadflow_core::domain::stage::{LeadServiceStatus, PipelineStage};
use leadflow_core::domain::timeline::TimelineEvent;

use super::{
    format_quote_number, AnalysisRepository, LeadRepository, NoteRepository, QuoteRepository,
    RepositoryError, TimelineRepository,
};

#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<LeadId, Lead>>,
    services: RwLock<HashMap<LeadServiceId, LeadService>>,
}

impl InMemoryLeadRepository {
    async fn modify_service(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        apply: impl FnOnce(&mut LeadService),
    ) -> Result<(), RepositoryError> {
        let mut services = self.services.write().await;
        let service = services
            .get_mut(id)
            .filter(|service| service.tenant_id == *tenant_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "lead_service",
                id: id.to_string(),
            })?;
        apply(service);
        service.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait::async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn find_lead(
        &self,
        tenant_id: &TenantId,
        id: &LeadId,
    ) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.leads.read().await;
        Ok(leads.get(id).filter(|lead| lead.tenant_id == *tenant_id).cloned())
    }

    async fn save_lead(&self, lead: Lead) -> Result<(), RepositoryError> {
        let mut leads = self.leads.write().await;
        leads.insert(lead.id, lead);
        Ok(())
    }

    async fn find_service(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
    ) -> Result<Option<LeadService>, RepositoryError> {
        let services = self.services.read().await;
        Ok(services.get(id).filter(|service| service.tenant_id == *tenant_id).cloned())
    }

    async fn save_service(&self, service: LeadService) -> Result<(), RepositoryError> {
        let mut services = self.services.write().await;
        services.insert(service.id, service);
        Ok(())
    }

    async fn update_stage(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        stage: PipelineStage,
    ) -> Result<(), RepositoryError> {
        self.modify_service(tenant_id, id, |service| service.stage = stage).await
    }

    async fn update_status(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        status: LeadServiceStatus,
    ) -> Result<(), RepositoryError> {
        self.modify_service(tenant_id, id, |service| service.status = status).await
    }

    async fn update_service_type(
        &self,
        tenant_id: &TenantId,
        id: &LeadServiceId,
        service_type: &str,
    ) -> Result<(), RepositoryError> {
        let service_type = service_type.to_string();
        self.modify_service(tenant_id, id, |service| service.service_type = service_type).await
    }
}

/// Keeps insertion order, which is the order events happened in.
#[derive(Default)]
pub struct InMemoryTimelineRepository {
    events: RwLock<Vec<TimelineEvent>>,
}

impl InMemoryTimelineRepository {
    pub async fn all(&self) -> Vec<TimelineEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait::async_trait]
impl TimelineRepository for InMemoryTimelineRepository {
    async fn append(&self, event: TimelineEvent) -> Result<(), RepositoryError> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<TimelineEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|event| {
                event.tenant_id == *tenant_id && event.lead_service_id == *lead_service_id
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAnalysisRepository {
    analyses: RwLock<Vec<AiAnalysis>>,
}

#[async_trait::async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    async fn save(&self, analysis: AiAnalysis) -> Result<(), RepositoryError> {
        self.analyses.write().await.push(analysis);
        Ok(())
    }

    async fn latest_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Option<AiAnalysis>, RepositoryError> {
        let analyses = self.analyses.read().await;
        Ok(analyses
            .iter()
            .rev()
            .find(|analysis| {
                analysis.tenant_id == *tenant_id && analysis.lead_service_id == *lead_service_id
            })
            .cloned())
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<AiAnalysis>, RepositoryError> {
        let analyses = self.analyses.read().await;
        Ok(analyses
            .iter()
            .filter(|analysis| {
                analysis.tenant_id == *tenant_id && analysis.lead_service_id == *lead_service_id
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<Vec<Quote>>,
    sequences: RwLock<HashMap<TenantId, i64>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &QuoteId,
    ) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.iter().find(|quote| quote.id == *id && quote.tenant_id == *tenant_id).cloned())
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        match quotes.iter_mut().find(|existing| existing.id == quote.id) {
            Some(existing) => *existing = quote,
            None => quotes.push(quote),
        }
        Ok(())
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes
            .iter()
            .filter(|quote| {
                quote.tenant_id == *tenant_id && quote.lead_service_id == *lead_service_id
            })
            .cloned()
            .collect())
    }

    async fn next_number(&self, tenant_id: &TenantId) -> Result<String, RepositoryError> {
        let mut sequences = self.sequences.write().await;
        let last_value = sequences.entry(*tenant_id).or_insert(0);
        *last_value += 1;
        Ok(format_quote_number(Utc::now().year(), *last_value))
    }
}

#[derive(Default)]
pub struct InMemoryNoteRepository {
    notes: RwLock<Vec<LeadNote>>,
}

#[async_trait::async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn save(&self, note: LeadNote) -> Result<(), RepositoryError> {
        self.notes.write().await.push(note);
        Ok(())
    }

    async fn list_for_service(
        &self,
        tenant_id: &TenantId,
        lead_service_id: &LeadServiceId,
    ) -> Result<Vec<LeadNote>, RepositoryError> {
        let notes = self.notes.read().await;
        Ok(notes
            .iter()
            .filter(|note| note.tenant_id == *tenant_id && note.lead_service_id == *lead_service_id)
            .cloned()
            .collect())
    }
}
