pub mod calculator;
pub mod estimate;
pub mod money;
pub mod quote_totals;

use thiserror::Error;

pub use calculator::{calculate, CalculationResult, CalculatorOperation};
pub use estimate::{calculate_estimate, EstimateInput, EstimateRange, MaterialItem};
pub use quote_totals::{
    apply_catalog_prices, calculate_quote_totals, LineTotals, PriceOverride, QuoteTotals,
    VatBreakdownEntry,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalcError {
    #[error("invalid quantity `{value}`: expected a non-negative decimal")]
    InvalidQuantity { value: String },
    #[error("item {index} has a negative unit price")]
    NegativeUnitPrice { index: usize },
    #[error("item {index} has tax rate {rate_bps} bps outside 0..=10000")]
    InvalidTaxRate { index: usize, rate_bps: i64 },
    #[error("discount value {value} is out of range")]
    DiscountOutOfRange { value: i64 },
    #[error("division by zero")]
    DivisionByZero,
    #[error("operation `{operation}` requires a second operand")]
    MissingOperand { operation: &'static str },
    #[error("invalid operand: {reason}")]
    InvalidOperand { reason: &'static str },
    #[error("unknown calculator operation `{0}`")]
    UnknownOperation(String),
    #[error("low estimate exceeds high estimate")]
    InvertedRange,
    #[error("estimate inputs must not be negative")]
    NegativeInput,
    #[error("arithmetic overflow")]
    Overflow,
}
