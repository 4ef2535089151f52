pub mod calc;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod normalize;
pub mod pipeline;

pub use calc::{
    calculate, calculate_estimate, calculate_quote_totals, CalcError, CalculationResult,
    CalculatorOperation, EstimateInput, EstimateRange, QuoteTotals,
};
pub use domain::analysis::{
    AiAnalysis, AnalysisId, ContactChannel, LeadQuality, RecommendedAction, Urgency,
};
pub use domain::lead::{Actor, Lead, LeadId, LeadService, LeadServiceId, TenantId};
pub use domain::note::{LeadNote, NoteId};
pub use domain::partner::{PartnerId, PartnerMatch, PartnerQuery};
pub use domain::product::{CatalogPrice, CatalogProduct, ProductId};
pub use domain::quote::{DiscountType, PricingMode, Quote, QuoteId, QuoteItem};
pub use domain::stage::{LeadServiceStatus, PipelineStage};
pub use domain::timeline::{TimelineEvent, TimelineEventKind};
pub use errors::{ApplicationError, DomainError};
pub use events::{EventBus, EventBusError, InMemoryEventBus, PipelineEvent, TracingEventBus};
pub use normalize::LenientEnum;
pub use pipeline::PipelineEngine;
