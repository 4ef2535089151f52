use std::str::FromStr;

use leadflow_core::calc::{calculate, CalculatorOperation};
use rust_decimal::Decimal;

use crate::commands::CommandResult;

pub fn run(operation: &str, a: &str, b: Option<&str>) -> CommandResult {
    let Some(parsed) = CalculatorOperation::parse(operation) else {
        return CommandResult::failure(
            "calc",
            "invalid_operation",
            format!("unknown calculator operation `{operation}`"),
            2,
        );
    };

    let operands = parse_operand(a).and_then(|a| match b {
        Some(b) => parse_operand(b).map(|b| (a, Some(b))),
        None => Ok((a, None)),
    });
    let (a, b) = match operands {
        Ok(operands) => operands,
        Err(message) => return CommandResult::failure("calc", "invalid_input", message, 2),
    };

    match calculate(parsed, a, b) {
        Ok(result) => {
            let data = serde_json::to_value(&result).ok();
            CommandResult::success_with("calc", result.expression.clone(), data)
        }
        Err(error) => CommandResult::failure("calc", "calculation", error.to_string(), 3),
    }
}

fn parse_operand(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("`{raw}` is not a decimal number"))
}
