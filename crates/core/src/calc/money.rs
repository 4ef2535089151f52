use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::calc::CalcError;

pub const BPS_SCALE: i64 = 10_000;

/// Parses a quantity from its decimal string form. A lone comma is read as the decimal
/// separator (`"1,5"` is one and a half), negative quantities are rejected.
pub fn parse_quantity(raw: &str) -> Result<Decimal, CalcError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replacen(',', ".", 1)
    } else {
        trimmed.to_string()
    };

    let quantity = Decimal::from_str(&normalized)
        .map_err(|_| CalcError::InvalidQuantity { value: raw.to_string() })?;
    if quantity.is_sign_negative() && !quantity.is_zero() {
        return Err(CalcError::InvalidQuantity { value: raw.to_string() });
    }
    Ok(quantity)
}

/// Rounds to whole cents, ties to even.
pub fn round_cents(amount: Decimal) -> Result<i64, CalcError> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
        .ok_or(CalcError::Overflow)
}

pub fn line_amount_cents(unit_price_cents: i64, quantity: Decimal) -> Result<i64, CalcError> {
    let amount =
        Decimal::from(unit_price_cents).checked_mul(quantity).ok_or(CalcError::Overflow)?;
    round_cents(amount)
}

/// `amount × bps / 10000`, rounded to cents.
pub fn apply_bps(amount_cents: i64, bps: i64) -> Result<i64, CalcError> {
    let scaled = Decimal::from(amount_cents)
        .checked_mul(Decimal::from(bps))
        .ok_or(CalcError::Overflow)?
        / Decimal::from(BPS_SCALE);
    round_cents(scaled)
}

/// The tax contained in a tax-inclusive amount: `gross × bps / (10000 + bps)`.
pub fn included_tax(gross_cents: i64, bps: i64) -> Result<i64, CalcError> {
    let numerator =
        Decimal::from(gross_cents).checked_mul(Decimal::from(bps)).ok_or(CalcError::Overflow)?;
    let denominator = Decimal::from(BPS_SCALE + bps);
    round_cents(numerator / denominator)
}

/// Splits `amount` across `weights` so the parts sum to `amount` exactly (largest remainder).
///
/// Leftover cents go to the largest fractional remainder first, then the largest weight,
/// then the lowest index. All weights zero puts the whole amount on the first entry.
pub fn allocate_proportionally(amount: i64, weights: &[i64]) -> Vec<i64> {
    let mut parts = vec![0_i64; weights.len()];
    if amount == 0 || weights.is_empty() {
        return parts;
    }

    let total_weight: i128 = weights.iter().map(|weight| i128::from((*weight).max(0))).sum();
    if total_weight == 0 {
        parts[0] = amount;
        return parts;
    }

    let sign: i128 = if amount < 0 { -1 } else { 1 };
    let magnitude = i128::from(amount).abs();
    let mut remainders = Vec::with_capacity(weights.len());
    let mut assigned: i128 = 0;

    for (index, weight) in weights.iter().enumerate() {
        let weight = i128::from((*weight).max(0));
        let share = magnitude * weight / total_weight;
        let remainder = magnitude * weight % total_weight;
        parts[index] = (share * sign) as i64;
        assigned += share;
        remainders.push((index, remainder, weight));
    }

    remainders.sort_by(|left, right| {
        right.1.cmp(&left.1).then(right.2.cmp(&left.2)).then(left.0.cmp(&right.0))
    });

    let leftover = (magnitude - assigned) as usize;
    for (index, _, _) in remainders.into_iter().take(leftover) {
        parts[index] += sign as i64;
    }

    parts
}
