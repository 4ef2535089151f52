#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use leadflow_agent::context::RunContext;
use leadflow_agent::{PipelineServices, RunRequest};
use leadflow_core::config::AppConfig;
use leadflow_core::domain::lead::{Actor, Lead, LeadId, LeadService, LeadServiceId, TenantId};
use leadflow_core::domain::stage::{LeadServiceStatus, PipelineStage};
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};
use leadflow_core::events::InMemoryEventBus;
use leadflow_db::repositories::{
    AnalysisRepository, InMemoryAnalysisRepository, InMemoryLeadRepository,
    InMemoryNoteRepository, InMemoryPartnerDirectory, InMemoryProductCatalog,
    InMemoryQuoteRepository, InMemoryTimelineRepository, LeadRepository,
};

/// In-memory wiring for one lead with one service.
pub struct Harness {
    pub services: Arc<PipelineServices>,
    pub leads: Arc<InMemoryLeadRepository>,
    pub timeline: Arc<InMemoryTimelineRepository>,
    pub analyses: Arc<InMemoryAnalysisRepository>,
    pub quotes: Arc<InMemoryQuoteRepository>,
    pub notes: Arc<InMemoryNoteRepository>,
    pub catalog: Arc<InMemoryProductCatalog>,
    pub partners: Arc<InMemoryPartnerDirectory>,
    pub events: InMemoryEventBus,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub lead_service_id: LeadServiceId,
}

impl Harness {
    pub async fn new(phone: Option<&str>, stage: PipelineStage) -> Self {
        let leads = Arc::new(InMemoryLeadRepository::default());
        let timeline = Arc::new(InMemoryTimelineRepository::default());
        let analyses = Arc::new(InMemoryAnalysisRepository::default());
        let quotes = Arc::new(InMemoryQuoteRepository::default());
        let notes = Arc::new(InMemoryNoteRepository::default());
        let catalog = Arc::new(InMemoryProductCatalog::default());
        let partners = Arc::new(InMemoryPartnerDirectory::default());
        let events = InMemoryEventBus::default();

        let services = Arc::new(PipelineServices {
            leads: leads.clone(),
            timeline: timeline.clone(),
            analyses: analyses.clone(),
            quotes: quotes.clone(),
            notes: notes.clone(),
            catalog: catalog.clone(),
            partners: partners.clone(),
            events: Arc::new(events.clone()),
            settings: AppConfig::default().agent,
        });

        let tenant_id = TenantId::new();
        let lead = Lead {
            id: LeadId::new(),
            tenant_id,
            consumer_name: "Jeroen Bakker".to_string(),
            phone: phone.map(str::to_string),
            email: Some("jeroen@example.nl".to_string()),
            zip_code: Some("3511 AB".to_string()),
            created_at: Utc::now(),
        };
        let service = LeadService {
            id: LeadServiceId::new(),
            lead_id: lead.id,
            tenant_id,
            service_type: "dakgoot".to_string(),
            stage,
            status: LeadServiceStatus::New,
            consumer_note: Some("Dakgoot lekt aan de achterkant".to_string()),
            customer_preferences: json!({}),
            updated_at: Utc::now(),
        };
        let (lead_id, lead_service_id) = (lead.id, service.id);
        leads.save_lead(lead).await.expect("save lead");
        leads.save_service(service).await.expect("save service");

        Self {
            services,
            leads,
            timeline,
            analyses,
            quotes,
            notes,
            catalog,
            partners,
            events,
            tenant_id,
            lead_id,
            lead_service_id,
        }
    }

    pub fn request(&self) -> RunRequest {
        RunRequest::new(self.tenant_id, self.lead_id, self.lead_service_id)
    }

    pub fn context(&self, actor: Actor) -> RunContext {
        RunContext::new(self.tenant_id, self.lead_id, self.lead_service_id, actor)
    }

    pub async fn service(&self) -> LeadService {
        self.leads
            .find_service(&self.tenant_id, &self.lead_service_id)
            .await
            .expect("find service")
            .expect("service exists")
    }

    pub async fn events_of(&self, kind: TimelineEventKind) -> Vec<TimelineEvent> {
        self.timeline.all().await.into_iter().filter(|event| event.kind == kind).collect()
    }

    pub async fn analyses(&self) -> Vec<leadflow_core::domain::analysis::AiAnalysis> {
        self.analyses
            .list_for_service(&self.tenant_id, &self.lead_service_id)
            .await
            .expect("list analyses")
    }
}
