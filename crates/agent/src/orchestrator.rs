//! One orchestrator per agent kind.
//!
//! A run builds a fresh [`RunScope`], lets the model propose tool calls, retries once
//! with an explicit instruction when a mandatory tool is missing, then repairs whatever is
//! still missing through the fallback layer and runs the agent's post-run hook.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use leadflow_core::domain::lead::{LeadId, LeadServiceId, TenantId};
use leadflow_core::pipeline::{DisqualifyDecision, IntakeGateDecision};

use crate::agents::AgentKind;
use crate::context::{RunContext, RunScope, TrackerSnapshot};
use crate::error::AgentError;
use crate::fallback::{after_run, FallbackHandler, RecoveryOutcome};
use crate::llm::{LanguageModel, ModelRequest};
use crate::prompts::{retry_instruction, system_prompt, user_prompt, PromptInput};
use crate::retry::RetryState;
use crate::services::PipelineServices;
use crate::stage_machine::StageMachine;
use crate::tools::{
    CalculateEstimateTool, CalculatorTool, DraftQuoteTool, FindMatchingPartnersTool,
    SaveAnalysisTool, SaveEstimationTool, SaveNoteTool, SearchProductMaterialsTool,
    SubmitAuditResultTool, Tool, ToolName, ToolRegistry, UpdateLeadServiceStatusTool,
    UpdateLeadServiceTypeTool, UpdatePipelineStageTool,
};

/// Upper bound on retries regardless of configuration.
const RETRY_CEILING: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRequest {
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub lead_service_id: LeadServiceId,
    /// Free-form material for the run, e.g. a call summary for the call-log agent.
    pub input: String,
}

impl RunRequest {
    pub fn new(tenant_id: TenantId, lead_id: LeadId, lead_service_id: LeadServiceId) -> Self {
        Self { tenant_id, lead_id, lead_service_id, input: String::new() }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub agent: AgentKind,
    pub correlation_id: Uuid,
    pub attempts: u32,
    pub retry_state: RetryState,
    pub called: Vec<ToolName>,
    pub recovery: Vec<RecoveryOutcome>,
    pub disqualification: Option<DisqualifyDecision>,
    pub intake_gate: Option<IntakeGateDecision>,
    pub reply: String,
}

pub struct Orchestrator {
    agent: AgentKind,
    services: Arc<PipelineServices>,
    machine: StageMachine,
    fallback: FallbackHandler,
    registry: ToolRegistry,
    model: Arc<dyn LanguageModel>,
    run_lock: Mutex<()>,
}

fn build_tool(
    name: ToolName,
    services: &Arc<PipelineServices>,
    machine: &StageMachine,
) -> Arc<dyn Tool> {
    match name {
        ToolName::SaveAnalysis => Arc::new(SaveAnalysisTool::new(services.clone())),
        ToolName::UpdatePipelineStage => Arc::new(UpdatePipelineStageTool::new(machine.clone())),
        ToolName::UpdateLeadServiceType => {
            Arc::new(UpdateLeadServiceTypeTool::new(machine.clone()))
        }
        ToolName::UpdateLeadServiceStatus => {
            Arc::new(UpdateLeadServiceStatusTool::new(machine.clone()))
        }
        ToolName::SearchProductMaterials => {
            Arc::new(SearchProductMaterialsTool::new(services.clone()))
        }
        ToolName::Calculator => Arc::new(CalculatorTool),
        ToolName::CalculateEstimate => Arc::new(CalculateEstimateTool),
        ToolName::DraftQuote => Arc::new(DraftQuoteTool::new(services.clone())),
        ToolName::SaveEstimation => Arc::new(SaveEstimationTool::new(services.clone())),
        ToolName::FindMatchingPartners => {
            Arc::new(FindMatchingPartnersTool::new(services.clone()))
        }
        ToolName::SubmitAuditResult => {
            Arc::new(SubmitAuditResultTool::new(services.clone(), machine.clone()))
        }
        ToolName::SaveNote => Arc::new(SaveNoteTool::new(services.clone())),
    }
}

impl Orchestrator {
    pub fn new(
        agent: AgentKind,
        services: Arc<PipelineServices>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        let machine = StageMachine::new(services.clone());
        let mut registry = ToolRegistry::default();
        for tool in agent.tools() {
            registry.register(build_tool(*tool, &services, &machine));
        }
        let fallback = FallbackHandler::new(services.clone(), machine.clone());

        Self { agent, services, machine, fallback, registry, model, run_lock: Mutex::new(()) }
    }

    pub fn gatekeeper(services: Arc<PipelineServices>, model: Arc<dyn LanguageModel>) -> Self {
        Self::new(AgentKind::Gatekeeper, services, model)
    }

    pub fn estimator(services: Arc<PipelineServices>, model: Arc<dyn LanguageModel>) -> Self {
        Self::new(AgentKind::Estimator, services, model)
    }

    pub fn dispatcher(services: Arc<PipelineServices>, model: Arc<dyn LanguageModel>) -> Self {
        Self::new(AgentKind::Dispatcher, services, model)
    }

    pub fn auditor(services: Arc<PipelineServices>, model: Arc<dyn LanguageModel>) -> Self {
        Self::new(AgentKind::Auditor, services, model)
    }

    pub fn call_log(services: Arc<PipelineServices>, model: Arc<dyn LanguageModel>) -> Self {
        Self::new(AgentKind::CallLog, services, model)
    }

    pub fn agent(&self) -> AgentKind {
        self.agent
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs are serialized per orchestrator. A model failure still gets the fallback
    /// treatment before the error is returned.
    pub async fn run(&self, request: RunRequest) -> Result<RunReport, AgentError> {
        let _guard = self.run_lock.lock().await;
        let correlation_id = Uuid::new_v4();

        let context = RunContext::new(
            request.tenant_id,
            request.lead_id,
            request.lead_service_id,
            self.agent.actor(),
        );
        if !context.is_complete() {
            return Err(AgentError::MissingContext { agent: self.agent });
        }
        let scope = RunScope::new(context.clone());

        let lead = self.services.load_lead(&context).await?;
        let service = self.services.load_service(&context).await?;
        let notes =
            self.services.notes.list_for_service(&context.tenant_id, &service.id).await?;
        let latest_analysis =
            self.services.analyses.latest_for_service(&context.tenant_id, &service.id).await?;

        info!(
            event_name = "agent.run_started",
            agent = %self.agent,
            correlation_id = %correlation_id,
            tenant_id = %context.tenant_id,
            lead_service_id = %context.lead_service_id,
            stage = %service.stage,
            "agent run started"
        );

        let base_request = ModelRequest {
            agent: self.agent,
            system_prompt: system_prompt(self.agent),
            user_prompt: user_prompt(&PromptInput {
                lead: &lead,
                service: &service,
                notes: &notes,
                latest_analysis: latest_analysis.as_ref(),
                input: &request.input,
            }),
            tools: self.registry.specs(),
        };

        let mandatory = self.agent.mandatory();
        let max_retries = self.services.settings.max_retries.min(RETRY_CEILING);
        let mut merged = TrackerSnapshot::default();
        let mut state = RetryState::Attempted;
        let mut attempts = 0;
        let mut model_request = base_request.clone();
        let mut reply = String::new();
        let mut model_failure = None;

        loop {
            scope.tracker().reset();
            attempts += 1;
            let result = self.model.run(&model_request, &self.registry.session(&scope)).await;
            merged.merge(&scope.tracker().snapshot());

            match result {
                Ok(model_reply) => reply = model_reply.text,
                Err(error) => {
                    warn!(
                        event_name = "agent.model_failed",
                        agent = %self.agent,
                        correlation_id = %correlation_id,
                        error = %error,
                        "language model call failed"
                    );
                    state = RetryState::Escalated;
                    model_failure = Some(error);
                    break;
                }
            }

            let missing = merged.missing(mandatory);
            state = state.next(missing.is_empty(), attempts - 1, max_retries);
            if state.is_final() {
                break;
            }

            let missing_tools =
                missing.iter().map(ToolName::as_str).collect::<Vec<_>>().join(",");
            warn!(
                event_name = "agent.retry",
                agent = %self.agent,
                correlation_id = %correlation_id,
                missing = %missing_tools,
                "mandatory tool missing; retrying with explicit instruction"
            );
            model_request = base_request.clone();
            model_request.user_prompt =
                format!("{}\n\n{}", base_request.user_prompt, retry_instruction(&missing));
        }

        let actions = after_run(mandatory, &merged);
        let recovery = self.fallback.apply(&context, &actions, &merged, &request.input).await;
        let disqualification = match self.agent {
            AgentKind::Gatekeeper => self.auto_disqualify(&context).await,
            _ => None,
        };
        let intake_gate = match self.agent {
            AgentKind::Estimator => {
                self.fallback
                    .apply_intake_gate(&context, merged.was_called(ToolName::DraftQuote))
                    .await
            }
            _ => None,
        };

        info!(
            event_name = "agent.run_completed",
            agent = %self.agent,
            correlation_id = %correlation_id,
            lead_service_id = %context.lead_service_id,
            attempts,
            retry_state = ?state,
            recovery_count = recovery.len(),
            "agent run completed"
        );

        if let Some(error) = model_failure {
            return Err(AgentError::Model(error.to_string()));
        }

        Ok(RunReport {
            agent: self.agent,
            correlation_id,
            attempts,
            retry_state: state,
            called: merged.called.into_iter().collect(),
            recovery,
            disqualification,
            intake_gate,
            reply,
        })
    }

    async fn auto_disqualify(&self, context: &RunContext) -> Option<DisqualifyDecision> {
        match self.machine.auto_disqualify_if_junk(context).await {
            Ok(decision) => Some(decision),
            Err(error) => {
                warn!(
                    event_name = "agent.auto_disqualify_failed",
                    lead_service_id = %context.lead_service_id,
                    error = %error,
                    "auto-disqualify check failed"
                );
                None
            }
        }
    }
}
