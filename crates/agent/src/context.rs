//! Run-scoped state shared by the tool handlers of one orchestrator run.
//!
//! A [`RunScope`] is created fresh for every run and dropped when the run ends. The
//! context is written once before the model is invoked; the tracker is reset at the start
//! of every attempt so a mark from an earlier attempt can never satisfy a later check.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

use leadflow_core::domain::analysis::AnalysisId;
use leadflow_core::domain::lead::{Actor, LeadId, LeadServiceId, TenantId};
use leadflow_core::domain::quote::QuoteId;
use serde::Serialize;

use crate::error::ToolError;
use crate::tools::ToolName;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunContext {
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub lead_service_id: LeadServiceId,
    pub actor: Actor,
}

impl RunContext {
    pub fn new(
        tenant_id: TenantId,
        lead_id: LeadId,
        lead_service_id: LeadServiceId,
        actor: Actor,
    ) -> Self {
        Self { tenant_id, lead_id, lead_service_id, actor }
    }

    /// Nil identifiers count as never set.
    pub fn is_complete(&self) -> bool {
        !self.tenant_id.is_nil() && !self.lead_id.is_nil() && !self.lead_service_id.is_nil()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Default)]
pub struct ContextHolder {
    inner: Mutex<Option<RunContext>>,
}

impl ContextHolder {
    pub fn set(&self, context: RunContext) {
        *lock(&self.inner) = Some(context);
    }

    /// `None` when no context was set or any identifier is nil.
    pub fn get(&self) -> Option<RunContext> {
        lock(&self.inner).clone().filter(RunContext::is_complete)
    }

    pub fn require(&self) -> Result<RunContext, ToolError> {
        self.get().ok_or(ToolError::MissingContext)
    }

    pub fn clear(&self) {
        *lock(&self.inner) = None;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    pub called: BTreeSet<ToolName>,
    pub last_quote_id: Option<QuoteId>,
    pub last_analysis_id: Option<AnalysisId>,
}

impl TrackerSnapshot {
    pub fn was_called(&self, tool: ToolName) -> bool {
        self.called.contains(&tool)
    }

    pub fn missing(&self, required: &[ToolName]) -> Vec<ToolName> {
        required.iter().copied().filter(|tool| !self.was_called(*tool)).collect()
    }

    /// Union of two attempts; the later attempt's ids win.
    pub fn merge(&mut self, later: &TrackerSnapshot) {
        self.called.extend(later.called.iter().copied());
        if later.last_quote_id.is_some() {
            self.last_quote_id = later.last_quote_id;
        }
        if later.last_analysis_id.is_some() {
            self.last_analysis_id = later.last_analysis_id;
        }
    }
}

#[derive(Debug, Default)]
pub struct ToolCallTracker {
    state: Mutex<TrackerSnapshot>,
}

impl ToolCallTracker {
    pub fn reset(&self) {
        *lock(&self.state) = TrackerSnapshot::default();
    }

    pub fn mark(&self, tool: ToolName) {
        lock(&self.state).called.insert(tool);
    }

    pub fn was_called(&self, tool: ToolName) -> bool {
        lock(&self.state).was_called(tool)
    }

    pub fn record_quote(&self, id: QuoteId) {
        lock(&self.state).last_quote_id = Some(id);
    }

    pub fn record_analysis(&self, id: AnalysisId) {
        lock(&self.state).last_analysis_id = Some(id);
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        lock(&self.state).clone()
    }
}

#[derive(Debug, Default)]
pub struct RunScope {
    context: ContextHolder,
    tracker: ToolCallTracker,
}

impl RunScope {
    pub fn new(context: RunContext) -> Self {
        let scope = Self::default();
        scope.context.set(context);
        scope
    }

    pub fn context(&self) -> Result<RunContext, ToolError> {
        self.context.require()
    }

    pub fn tracker(&self) -> &ToolCallTracker {
        &self.tracker
    }
}
