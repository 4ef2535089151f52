use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calc::calculator::{calculate, CalculatorOperation};
use crate::calc::CalcError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialItem {
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateInput {
    #[serde(default)]
    pub material_items: Vec<MaterialItem>,
    pub labor_hours_low: Decimal,
    pub labor_hours_high: Decimal,
    pub hourly_rate_low: Decimal,
    pub hourly_rate_high: Decimal,
    #[serde(default)]
    pub extra_costs: Decimal,
}

/// Planning range for a job. Never persisted and never rounded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateRange {
    pub material_subtotal: Decimal,
    pub labor_subtotal_low: Decimal,
    pub labor_subtotal_high: Decimal,
    pub total_low: Decimal,
    pub total_high: Decimal,
    pub applied_extra_costs: Decimal,
}

pub fn calculate_estimate(input: &EstimateInput) -> Result<EstimateRange, CalcError> {
    let non_negative = [
        input.labor_hours_low,
        input.labor_hours_high,
        input.hourly_rate_low,
        input.hourly_rate_high,
        input.extra_costs,
    ];
    if non_negative.iter().any(Decimal::is_sign_negative)
        || input
            .material_items
            .iter()
            .any(|item| item.unit_price.is_sign_negative() || item.quantity.is_sign_negative())
    {
        return Err(CalcError::NegativeInput);
    }

    let mut material_subtotal = Decimal::ZERO;
    for item in &input.material_items {
        let line = multiply(item.unit_price, item.quantity)?;
        material_subtotal = add(material_subtotal, line)?;
    }

    let labor_subtotal_low = multiply(input.labor_hours_low, input.hourly_rate_low)?;
    let labor_subtotal_high = multiply(input.labor_hours_high, input.hourly_rate_high)?;
    if labor_subtotal_low > labor_subtotal_high {
        return Err(CalcError::InvertedRange);
    }

    let total_low = add(add(material_subtotal, labor_subtotal_low)?, input.extra_costs)?;
    let total_high = add(add(material_subtotal, labor_subtotal_high)?, input.extra_costs)?;

    Ok(EstimateRange {
        material_subtotal,
        labor_subtotal_low,
        labor_subtotal_high,
        total_low,
        total_high,
        applied_extra_costs: input.extra_costs,
    })
}

fn multiply(a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    calculate(CalculatorOperation::Multiply, a, Some(b)).map(|result| result.result)
}

fn add(a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    calculate(CalculatorOperation::Add, a, Some(b)).map(|result| result.result)
}
