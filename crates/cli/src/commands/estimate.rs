use std::path::Path;

use leadflow_core::calc::{calculate_estimate, EstimateInput};

use crate::commands::{read_document, CommandResult};

pub fn run(file: Option<&Path>) -> CommandResult {
    match read_document(file) {
        Ok(raw) => evaluate(&raw),
        Err(error) => CommandResult::failure("estimate", "input_read", format!("{error:#}"), 2),
    }
}

/// Planning range only; nothing is rounded or persisted.
pub fn evaluate(raw: &str) -> CommandResult {
    let input = match serde_json::from_str::<EstimateInput>(raw) {
        Ok(input) => input,
        Err(error) => {
            return CommandResult::failure(
                "estimate",
                "invalid_input",
                format!("estimate input is not valid JSON: {error}"),
                2,
            );
        }
    };

    match calculate_estimate(&input) {
        Ok(range) => {
            let message = format!("estimate {} - {}", range.total_low, range.total_high);
            CommandResult::success_with("estimate", message, serde_json::to_value(&range).ok())
        }
        Err(error) => CommandResult::failure("estimate", "calculation", error.to_string(), 3),
    }
}
