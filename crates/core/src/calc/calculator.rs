use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::calc::CalcError;
use crate::normalize::fold_label;

const MAX_ROUND_PLACES: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculatorOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    CeilDivide,
    Ceil,
    Floor,
    Round,
    Percentage,
}

impl CalculatorOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::CeilDivide => "ceil_divide",
            Self::Ceil => "ceil",
            Self::Floor => "floor",
            Self::Round => "round",
            Self::Percentage => "percentage",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "+" => return Some(Self::Add),
            "-" => return Some(Self::Subtract),
            "*" | "x" | "×" => return Some(Self::Multiply),
            "/" | "÷" => return Some(Self::Divide),
            "%" => return Some(Self::Percentage),
            _ => {}
        }

        match fold_label(raw).as_str() {
            "add" | "plus" | "sum" => Some(Self::Add),
            "subtract" | "minus" | "sub" => Some(Self::Subtract),
            "multiply" | "times" | "mul" => Some(Self::Multiply),
            "divide" | "div" => Some(Self::Divide),
            "ceil_divide" | "ceil_div" | "divide_ceil" | "units_needed" => Some(Self::CeilDivide),
            "ceil" | "round_up" => Some(Self::Ceil),
            "floor" | "round_down" => Some(Self::Floor),
            "round" => Some(Self::Round),
            "percentage" | "percent" | "pct" => Some(Self::Percentage),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub operation: CalculatorOperation,
    pub result: Decimal,
    pub expression: String,
}

/// The single exact-arithmetic primitive every numeric flow routes through.
///
/// `b` is required for binary operations. `round` uses `b` as the number of decimal places
/// (default 0, half away from zero). `percentage` is `a × b / 100`. `ceil_divide` is the
/// number of `b`-sized units needed to cover `a`.
pub fn calculate(
    operation: CalculatorOperation,
    a: Decimal,
    b: Option<Decimal>,
) -> Result<CalculationResult, CalcError> {
    let operand_b = || b.ok_or(CalcError::MissingOperand { operation: operation.as_str() });

    let (result, expression) = match operation {
        CalculatorOperation::Add => {
            let b = operand_b()?;
            let result = a.checked_add(b).ok_or(CalcError::Overflow)?;
            (result, format!("{} + {}", show(a), show(b)))
        }
        CalculatorOperation::Subtract => {
            let b = operand_b()?;
            let result = a.checked_sub(b).ok_or(CalcError::Overflow)?;
            (result, format!("{} - {}", show(a), show(b)))
        }
        CalculatorOperation::Multiply => {
            let b = operand_b()?;
            let result = a.checked_mul(b).ok_or(CalcError::Overflow)?;
            (result, format!("{} * {}", show(a), show(b)))
        }
        CalculatorOperation::Divide => {
            let b = non_zero(operand_b()?)?;
            let result = a.checked_div(b).ok_or(CalcError::Overflow)?;
            (result, format!("{} / {}", show(a), show(b)))
        }
        CalculatorOperation::CeilDivide => {
            let b = non_zero(operand_b()?)?;
            let result = a.checked_div(b).ok_or(CalcError::Overflow)?.ceil();
            (result, format!("ceil({} / {})", show(a), show(b)))
        }
        CalculatorOperation::Ceil => (a.ceil(), format!("ceil({})", show(a))),
        CalculatorOperation::Floor => (a.floor(), format!("floor({})", show(a))),
        CalculatorOperation::Round => {
            let places = round_places(b)?;
            let result = a.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
            (result, format!("round({}, {places})", show(a)))
        }
        CalculatorOperation::Percentage => {
            let b = operand_b()?;
            let result =
                a.checked_mul(b).ok_or(CalcError::Overflow)? / Decimal::ONE_HUNDRED;
            (result, format!("{} * {}%", show(a), show(b)))
        }
    };

    let result = result.normalize();
    Ok(CalculationResult { operation, result, expression: format!("{expression} = {result}") })
}

fn non_zero(value: Decimal) -> Result<Decimal, CalcError> {
    if value.is_zero() {
        Err(CalcError::DivisionByZero)
    } else {
        Ok(value)
    }
}

fn round_places(b: Option<Decimal>) -> Result<u32, CalcError> {
    let Some(places) = b else {
        return Ok(0);
    };
    if places.fract() != Decimal::ZERO || places.is_sign_negative() {
        return Err(CalcError::InvalidOperand { reason: "round places must be a whole number" });
    }
    places
        .to_u32()
        .filter(|places| *places <= MAX_ROUND_PLACES)
        .ok_or(CalcError::InvalidOperand { reason: "round places must be between 0 and 10" })
}

fn show(value: Decimal) -> Decimal {
    value.normalize()
}
