use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calc::money::{
    allocate_proportionally, apply_bps, included_tax, line_amount_cents, parse_quantity, BPS_SCALE,
};
use crate::calc::CalcError;
use crate::domain::product::{CatalogPrice, ProductId};
use crate::domain::quote::{DiscountType, PricingMode, QuoteItem};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub index: usize,
    pub description: String,
    pub tax_rate_bps: i64,
    /// False for an optional line the customer did not select; all amounts are then zero.
    pub participates: bool,
    pub line_total_before_tax_cents: i64,
    pub discount_cents: i64,
    pub vat_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatBreakdownEntry {
    pub rate_bps: i64,
    pub amount_cents: i64,
}

/// Computed quote totals.
///
/// `subtotal_cents - discount_amount_cents + vat_total_cents == total_cents` holds for
/// every value this module produces, and the line totals sum to `total_cents`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub pricing_mode: PricingMode,
    pub lines: Vec<LineTotals>,
    pub subtotal_cents: i64,
    pub discount_amount_cents: i64,
    pub vat_breakdown: Vec<VatBreakdownEntry>,
    pub vat_total_cents: i64,
    pub total_cents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOverride {
    pub index: usize,
    pub product_id: ProductId,
    pub previous_unit_price_cents: i64,
    pub unit_price_cents: i64,
    pub previous_tax_rate_bps: i64,
    pub tax_rate_bps: i64,
}

/// Replaces model-estimated prices with the backend catalog price for every line that
/// references a known catalog product. Returns the lines that actually changed.
pub fn apply_catalog_prices(
    items: &mut [QuoteItem],
    prices: &BTreeMap<ProductId, CatalogPrice>,
) -> Vec<PriceOverride> {
    let mut overrides = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let Some(product_id) = item.catalog_product_id.as_ref() else {
            continue;
        };
        let Some(price) = prices.get(product_id) else {
            continue;
        };
        if item.unit_price_cents == price.unit_price_cents
            && item.tax_rate_bps == price.tax_rate_bps
        {
            continue;
        }

        overrides.push(PriceOverride {
            index,
            product_id: product_id.clone(),
            previous_unit_price_cents: item.unit_price_cents,
            unit_price_cents: price.unit_price_cents,
            previous_tax_rate_bps: item.tax_rate_bps,
            tax_rate_bps: price.tax_rate_bps,
        });
        item.unit_price_cents = price.unit_price_cents;
        item.tax_rate_bps = price.tax_rate_bps;
    }
    overrides
}

/// Pure quote totals calculation.
///
/// Exclusive pricing: each participating line is rounded half-even to cents, the
/// discount is taken off the pre-tax subtotal and spread over the lines by largest
/// remainder, then VAT is computed once per rate on the discounted group and spread
/// back over that group's lines.
///
/// Inclusive pricing: unit prices already contain VAT. The pre-tax subtotal is found by
/// backing VAT out once per rate group. The discount is taken off the gross amounts and
/// converted to a pre-tax discount per group; that group's VAT is whatever the
/// discounted gross holds above its discounted base. Every line amount stays
/// non-negative and the round-trip identity holds.
pub fn calculate_quote_totals(
    items: &[QuoteItem],
    pricing_mode: PricingMode,
    discount_type: DiscountType,
    discount_value: i64,
) -> Result<QuoteTotals, CalcError> {
    validate_discount(discount_type, discount_value)?;
    let amounts = line_amounts(items)?;

    match pricing_mode {
        PricingMode::Exclusive => exclusive(items, &amounts, discount_type, discount_value),
        PricingMode::Inclusive => inclusive(items, &amounts, discount_type, discount_value),
    }
}

fn validate_discount(discount_type: DiscountType, discount_value: i64) -> Result<(), CalcError> {
    if discount_value < 0 {
        return Err(CalcError::DiscountOutOfRange { value: discount_value });
    }
    if discount_type == DiscountType::Percentage && discount_value > BPS_SCALE {
        return Err(CalcError::DiscountOutOfRange { value: discount_value });
    }
    Ok(())
}

/// Rounded `unit × quantity` for every participating line, zero for the rest.
fn line_amounts(items: &[QuoteItem]) -> Result<Vec<i64>, CalcError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if item.unit_price_cents < 0 {
                return Err(CalcError::NegativeUnitPrice { index });
            }
            if !(0..=BPS_SCALE).contains(&item.tax_rate_bps) {
                return Err(CalcError::InvalidTaxRate { index, rate_bps: item.tax_rate_bps });
            }
            let quantity = parse_quantity(&item.quantity)?;
            if !item.participates() {
                return Ok(0);
            }
            line_amount_cents(item.unit_price_cents, quantity)
        })
        .collect()
}

fn discount_amount(
    base_cents: i64,
    discount_type: DiscountType,
    discount_value: i64,
) -> Result<i64, CalcError> {
    match discount_type {
        DiscountType::Percentage => apply_bps(base_cents, discount_value),
        DiscountType::Fixed => Ok(discount_value.min(base_cents)),
    }
}

fn checked_sum(values: impl IntoIterator<Item = i64>) -> Result<i64, CalcError> {
    values.into_iter().try_fold(0_i64, |acc, value| acc.checked_add(value).ok_or(CalcError::Overflow))
}

/// Line indices of participating items grouped by VAT rate, ascending by rate.
fn rate_groups(items: &[QuoteItem]) -> BTreeMap<i64, Vec<usize>> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        if item.participates() {
            groups.entry(item.tax_rate_bps).or_default().push(index);
        }
    }
    groups
}

/// Computes one rounded tax amount per rate group and spreads it over the group's
/// lines by `weights`. Returns per-line tax and the breakdown.
fn group_tax(
    groups: &BTreeMap<i64, Vec<usize>>,
    weights: &[i64],
    tax_for_group: impl Fn(i64, i64) -> Result<i64, CalcError>,
) -> Result<(Vec<i64>, Vec<VatBreakdownEntry>), CalcError> {
    let mut per_line = vec![0_i64; weights.len()];
    let mut breakdown = Vec::with_capacity(groups.len());

    for (rate_bps, indices) in groups {
        let group_weights: Vec<i64> = indices.iter().map(|index| weights[*index]).collect();
        let group_base = checked_sum(group_weights.iter().copied())?;
        let amount_cents = tax_for_group(group_base, *rate_bps)?;

        let shares = allocate_proportionally(amount_cents, &group_weights);
        for (index, share) in indices.iter().zip(shares) {
            per_line[*index] = share;
        }
        breakdown.push(VatBreakdownEntry { rate_bps: *rate_bps, amount_cents });
    }

    Ok((per_line, breakdown))
}

fn exclusive(
    items: &[QuoteItem],
    before_tax: &[i64],
    discount_type: DiscountType,
    discount_value: i64,
) -> Result<QuoteTotals, CalcError> {
    let subtotal_cents = checked_sum(before_tax.iter().copied())?;
    let discount_amount_cents = discount_amount(subtotal_cents, discount_type, discount_value)?;
    let discounts = allocate_proportionally(discount_amount_cents, before_tax);
    let net = checked_differences(before_tax, &discounts)?;

    let groups = rate_groups(items);
    let (vat, vat_breakdown) = group_tax(&groups, &net, apply_bps)?;
    let vat_total_cents = checked_sum(vat_breakdown.iter().map(|entry| entry.amount_cents))?;

    let lines = build_lines(items, before_tax, &discounts, &net, &vat)?;
    let total_cents = subtotal_cents
        .checked_sub(discount_amount_cents)
        .and_then(|net_total| net_total.checked_add(vat_total_cents))
        .ok_or(CalcError::Overflow)?;

    Ok(QuoteTotals {
        pricing_mode: PricingMode::Exclusive,
        lines,
        subtotal_cents,
        discount_amount_cents,
        vat_breakdown,
        vat_total_cents,
        total_cents,
    })
}

fn inclusive(
    items: &[QuoteItem],
    gross: &[i64],
    discount_type: DiscountType,
    discount_value: i64,
) -> Result<QuoteTotals, CalcError> {
    let groups = rate_groups(items);

    let (gross_vat, _) = group_tax(&groups, gross, included_tax)?;
    let before_tax = checked_differences(gross, &gross_vat)?;
    let subtotal_cents = checked_sum(before_tax.iter().copied())?;

    let gross_total = checked_sum(gross.iter().copied())?;
    let gross_discount = discount_amount(gross_total, discount_type, discount_value)?;
    let gross_discounts = allocate_proportionally(gross_discount, gross);
    let discounted = checked_differences(gross, &gross_discounts)?;

    let mut discounts = vec![0_i64; items.len()];
    let mut vat = vec![0_i64; items.len()];
    let mut vat_breakdown = Vec::with_capacity(groups.len());
    for (rate_bps, indices) in &groups {
        let group_before: Vec<i64> = indices.iter().map(|index| before_tax[*index]).collect();
        let group_discounted: Vec<i64> = indices.iter().map(|index| discounted[*index]).collect();
        let base = checked_sum(group_before.iter().copied())?;
        let discounted_gross = checked_sum(group_discounted.iter().copied())?;
        let group_gross_discount = checked_sum(indices.iter().map(|index| gross_discounts[*index]))?;

        let group_discount =
            pre_tax_discount(group_gross_discount, *rate_bps, base, discounted_gross)?;
        let amount_cents = discounted_gross - (base - group_discount);

        let line_discounts = allocate_proportionally(group_discount, &group_before);
        let line_vat = allocate_proportionally(amount_cents, &group_discounted);
        for ((index, discount), tax) in indices.iter().zip(line_discounts).zip(line_vat) {
            discounts[*index] = discount;
            vat[*index] = tax;
        }
        vat_breakdown.push(VatBreakdownEntry { rate_bps: *rate_bps, amount_cents });
    }

    let net = checked_differences(&before_tax, &discounts)?;
    let lines = build_lines(items, &before_tax, &discounts, &net, &vat)?;
    let discount_amount_cents = checked_sum(discounts.iter().copied())?;
    let vat_total_cents = checked_sum(vat_breakdown.iter().map(|entry| entry.amount_cents))?;
    let total_cents = checked_sum(discounted.iter().copied())?;

    Ok(QuoteTotals {
        pricing_mode: PricingMode::Inclusive,
        lines,
        subtotal_cents,
        discount_amount_cents,
        vat_breakdown,
        vat_total_cents,
        total_cents,
    })
}

/// Pre-tax part of a gross discount within one rate group.
///
/// At least one cent when the gross discount is non-zero, never more than the group's
/// pre-tax base, and large enough that the discounted gross still covers the discounted
/// base so the group's VAT cannot go negative.
fn pre_tax_discount(
    gross_discount: i64,
    rate_bps: i64,
    base: i64,
    discounted_gross: i64,
) -> Result<i64, CalcError> {
    if gross_discount == 0 {
        return Ok(0);
    }
    let estimate = (gross_discount - included_tax(gross_discount, rate_bps)?).max(1);
    let floor = base.saturating_sub(discounted_gross).max(0);
    Ok(estimate.max(floor).min(base))
}

fn checked_differences(left: &[i64], right: &[i64]) -> Result<Vec<i64>, CalcError> {
    left.iter()
        .zip(right)
        .map(|(left, right)| left.checked_sub(*right).ok_or(CalcError::Overflow))
        .collect()
}

fn build_lines(
    items: &[QuoteItem],
    before_tax: &[i64],
    discounts: &[i64],
    net: &[i64],
    vat: &[i64],
) -> Result<Vec<LineTotals>, CalcError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            Ok(LineTotals {
                index,
                description: item.description.clone(),
                tax_rate_bps: item.tax_rate_bps,
                participates: item.participates(),
                line_total_before_tax_cents: before_tax[index],
                discount_cents: discounts[index],
                vat_cents: vat[index],
                line_total_cents: net[index].checked_add(vat[index]).ok_or(CalcError::Overflow)?,
            })
        })
        .collect()
}
