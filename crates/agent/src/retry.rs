//! Retry state for mandatory tool calls.
//!
//! A run starts `Attempted`. If mandatory tools are missing and the retry budget allows,
//! it moves to `Retried` and the model gets one explicit instruction. Still missing after
//! that means `Escalated`, which hands over to the fallback layer.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryState {
    Attempted,
    Retried,
    Escalated,
    Satisfied,
}

impl RetryState {
    /// Next state after an attempt finished. `retries_used` counts retries already spent.
    pub fn next(self, satisfied: bool, retries_used: u32, max_retries: u32) -> Self {
        match self {
            Self::Satisfied | Self::Escalated => self,
            _ if satisfied => Self::Satisfied,
            _ if retries_used < max_retries => Self::Retried,
            _ => Self::Escalated,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Satisfied | Self::Escalated)
    }
}
