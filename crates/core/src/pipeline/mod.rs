pub mod engine;
pub mod states;

pub use engine::{PipelineEngine, AUTO_DISQUALIFY_REASON, INSUFFICIENT_INTAKE_REASON};
pub use states::{DisqualifyDecision, IntakeGateDecision, StageTransitionPlan, StatusChangePlan};
