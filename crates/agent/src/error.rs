use serde_json::{json, Value};
use thiserror::Error;

use leadflow_core::calc::CalcError;
use leadflow_core::errors::{ApplicationError, DomainError};
use leadflow_db::repositories::RepositoryError;

use crate::agents::AgentKind;

/// Failure of a single tool call. Returned to the model as a structured payload so it can
/// correct the call within the same run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("run context is missing tenant, lead or lead service")]
    MissingContext,
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("tool `{tool}` is not available to this agent")]
    NotAllowed { tool: String },
    #[error("invalid arguments for `{tool}`: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },
    #[error("invalid {kind} value `{raw}`")]
    InvalidEnum { kind: &'static str, raw: String },
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("external call failed: {0}")]
    ExternalCallFailed(String),
}

impl ToolError {
    pub fn invalid_arguments(tool: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments { tool, reason: reason.into() }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingContext => "missing_context",
            Self::UnknownTool(_) | Self::NotAllowed { .. } => "tool_not_found",
            Self::InvalidArguments { .. } | Self::ValidationFailed(_) => "validation_failed",
            Self::InvalidEnum { .. } => "invalid_enum",
            Self::NotFound { .. } => "not_found",
            Self::ExternalCallFailed(_) => "external_call_failed",
        }
    }

    pub fn to_error_payload(&self) -> Value {
        json!({
            "success": false,
            "error": self.error_code(),
            "message": self.to_string(),
        })
    }
}

impl From<ApplicationError> for ToolError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::MissingContext => Self::MissingContext,
            ApplicationError::NotFound { entity, id } => Self::NotFound { entity, id },
            ApplicationError::Domain(DomainError::InvalidStage { raw }) => {
                Self::InvalidEnum { kind: "pipeline_stage", raw }
            }
            ApplicationError::Domain(other) => Self::ValidationFailed(other.to_string()),
            ApplicationError::ValidationFailed(message) => Self::ValidationFailed(message),
            ApplicationError::Persistence(message)
            | ApplicationError::ExternalCallFailed(message)
            | ApplicationError::Configuration(message) => Self::ExternalCallFailed(message),
        }
    }
}

impl From<RepositoryError> for ToolError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::from(error).into()
    }
}

impl From<CalcError> for ToolError {
    fn from(error: CalcError) -> Self {
        Self::ValidationFailed(error.to_string())
    }
}

/// Failure that aborts an orchestrator run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{agent} run rejected: context is incomplete")]
    MissingContext { agent: AgentKind },
    #[error(transparent)]
    Application(#[from] ApplicationError),
    #[error("language model call failed: {0}")]
    Model(String),
}

impl From<RepositoryError> for AgentError {
    fn from(error: RepositoryError) -> Self {
        Self::Application(error.into())
    }
}

#[cfg(test)]
mod tests {
    use leadflow_core::calc::CalcError;
    use leadflow_core::errors::{ApplicationError, DomainError};
    use leadflow_core::domain::stage::PipelineStage;
    use leadflow_db::repositories::RepositoryError;

    use super::ToolError;

    #[test]
    fn failure_payload_carries_code_and_message() {
        let payload = ToolError::MissingContext.to_error_payload();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"], "missing_context");
        assert_eq!(payload["message"], "run context is missing tenant, lead or lead service");
    }

    #[test]
    fn application_errors_map_onto_tool_codes() {
        let invalid: ToolError =
            ApplicationError::from(DomainError::InvalidStage { raw: "Limbo".into() }).into();
        assert_eq!(invalid.error_code(), "invalid_enum");

        let locked: ToolError =
            ApplicationError::from(DomainError::ServiceTypeLocked { stage: PipelineStage::Estimation })
                .into();
        assert_eq!(locked.error_code(), "validation_failed");

        let missing: ToolError =
            RepositoryError::NotFound { entity: "lead_service", id: "x".into() }.into();
        assert_eq!(missing, ToolError::NotFound { entity: "lead_service", id: "x".into() });

        let decode: ToolError = RepositoryError::Decode("bad".into()).into();
        assert_eq!(decode.error_code(), "external_call_failed");
    }

    #[test]
    fn calculation_errors_are_validation_failures() {
        let error: ToolError = CalcError::DivisionByZero.into();
        assert_eq!(error.error_code(), "validation_failed");
        assert!(error.to_string().contains("division by zero"));
    }
}
