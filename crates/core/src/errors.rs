use thiserror::Error;

use crate::calc::CalcError;
use crate::domain::stage::PipelineStage;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid pipeline stage `{raw}`")]
    InvalidStage { raw: String },
    #[error("service type is locked once a lead service leaves Triage (current stage {stage})")]
    ServiceTypeLocked { stage: PipelineStage },
    #[error(transparent)]
    Calculation(#[from] CalcError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("run context is missing tenant, lead or lead service")]
    MissingContext,
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("external call failed: {0}")]
    ExternalCallFailed(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    /// Stable class label used in logs and tool failure payloads.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidStage { .. }) => "invalid_enum",
            Self::Domain(_) | Self::ValidationFailed(_) => "validation_failed",
            Self::MissingContext => "missing_context",
            Self::NotFound { .. } => "not_found",
            Self::Persistence(_) | Self::ExternalCallFailed(_) => "external_call_failed",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Errors the model can fix by calling the tool differently.
    pub fn is_recoverable_by_caller(&self) -> bool {
        matches!(self, Self::Domain(_) | Self::ValidationFailed(_) | Self::NotFound { .. })
    }
}

impl From<CalcError> for ApplicationError {
    fn from(value: CalcError) -> Self {
        Self::Domain(DomainError::Calculation(value))
    }
}
