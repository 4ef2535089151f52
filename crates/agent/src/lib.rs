//! Agent runtime for the lead pipeline.
//!
//! Each pipeline stage has an agent (Gatekeeper, Estimator, Dispatcher, Auditor, Call-Log)
//! driven by an [`orchestrator::Orchestrator`]:
//! 1. **Context** (`context`) - a fresh run scope holding tenant/lead/service and a tracker
//! 2. **Model** (`llm`) - proposes tool calls through a session bound to that scope
//! 3. **Tools** (`tools`) - validate input and call the stage machine or the quote engine
//! 4. **Recovery** (`retry`, `fallback`) - missing mandatory calls are retried once, then
//!    repaired deterministically
//!
//! # Safety Principle
//!
//! The model never decides prices, stages or outcomes on its own. Prices come from the
//! calculation engine and the catalog; stage legality comes from the pipeline engine.

pub mod agents;
pub mod context;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod services;
pub mod stage_machine;
pub mod tools;

pub use agents::AgentKind;
pub use error::{AgentError, ToolError};
pub use orchestrator::{Orchestrator, RunReport, RunRequest};
pub use services::PipelineServices;
