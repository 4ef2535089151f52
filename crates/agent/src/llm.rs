//! Language-model port.
//!
//! The model only proposes tool calls. Everything it may do goes through the
//! [`ToolSession`] it is handed; the orchestrator decides afterwards whether the run was
//! complete.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::agents::AgentKind;
use crate::tools::{ToolSession, ToolSpec};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelRequest {
    pub agent: AgentKind,
    pub system_prompt: String,
    pub user_prompt: String,
    pub tools: Vec<ToolSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModelReply {
    pub text: String,
    pub tool_results: Vec<Value>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("model request timed out")]
    Timeout,
    #[error("model provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn run(
        &self,
        request: &ModelRequest,
        tools: &ToolSession<'_>,
    ) -> Result<ModelReply, ModelError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScriptedCall {
    pub tool: String,
    pub input: Value,
}

impl ScriptedCall {
    pub fn new(tool: impl Into<String>, input: Value) -> Self {
        Self { tool: tool.into(), input }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum ScriptedTurn {
    Calls(Vec<ScriptedCall>),
    Fail(ModelError),
}

/// Replays a fixed script, one turn per `run`. Once the script is exhausted every run
/// answers without calling anything, which is how a silent model looks.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn with_turn(self, calls: Vec<ScriptedCall>) -> Self {
        push(&self.turns, ScriptedTurn::Calls(calls));
        self
    }

    pub fn with_failure(self, error: ModelError) -> Self {
        push(&self.turns, ScriptedTurn::Fail(error));
        self
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

fn push<T>(queue: &Mutex<VecDeque<T>>, item: T) {
    match queue.lock() {
        Ok(mut queue) => queue.push_back(item),
        Err(poisoned) => poisoned.into_inner().push_back(item),
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn run(
        &self,
        request: &ModelRequest,
        tools: &ToolSession<'_>,
    ) -> Result<ModelReply, ModelError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        let turn = match self.turns.lock() {
            Ok(mut turns) => turns.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };

        let calls = match turn {
            None => return Ok(ModelReply::default()),
            Some(ScriptedTurn::Fail(error)) => return Err(error),
            Some(ScriptedTurn::Calls(calls)) => calls,
        };

        let mut reply = ModelReply::default();
        for call in calls {
            reply.tool_results.push(tools.call(&call.tool, call.input).await);
        }
        reply.text = format!("{} tool call(s) made", reply.tool_results.len());
        Ok(reply)
    }
}
