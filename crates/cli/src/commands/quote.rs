use std::path::Path;

use leadflow_core::calc::calculate_quote_totals;
use leadflow_core::domain::quote::{DiscountType, PricingMode, QuoteItem};
use leadflow_core::normalize::LenientEnum;
use serde::Deserialize;

use crate::commands::{read_document, CommandResult};

/// Command-line values win over the ones in the document.
#[derive(Clone, Debug, Default)]
pub struct QuoteOptions {
    pub pricing_mode: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value: Option<i64>,
}

/// Either a bare item list or an object carrying the pricing settings too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuoteDocument {
    Items(Vec<QuoteItem>),
    Full(QuoteRequest),
}

#[derive(Debug, Deserialize)]
struct QuoteRequest {
    items: Vec<QuoteItem>,
    #[serde(default)]
    pricing_mode: Option<String>,
    #[serde(default)]
    discount_type: Option<String>,
    #[serde(default)]
    discount_value: Option<i64>,
}

pub fn run(file: Option<&Path>, options: QuoteOptions) -> CommandResult {
    match read_document(file) {
        Ok(raw) => evaluate(&raw, options),
        Err(error) => CommandResult::failure("quote", "input_read", format!("{error:#}"), 2),
    }
}

pub fn evaluate(raw: &str, options: QuoteOptions) -> CommandResult {
    let request = match serde_json::from_str::<QuoteDocument>(raw) {
        Ok(QuoteDocument::Items(items)) => QuoteRequest {
            items,
            pricing_mode: None,
            discount_type: None,
            discount_value: None,
        },
        Ok(QuoteDocument::Full(request)) => request,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "invalid_input",
                format!("quote input must be an item list or an object with `items`: {error}"),
                2,
            );
        }
    };
    if request.items.is_empty() {
        return CommandResult::failure("quote", "invalid_input", "quote has no items", 2);
    }

    let pricing_mode = match options.pricing_mode.or(request.pricing_mode) {
        None => PricingMode::Exclusive,
        Some(raw) => match <PricingMode as LenientEnum>::parse(&raw) {
            Some(mode) => mode,
            None => return invalid_enum("pricing_mode", &raw),
        },
    };
    let discount_type = match options.discount_type.or(request.discount_type) {
        None => DiscountType::Percentage,
        Some(raw) => match DiscountType::parse(&raw) {
            Some(discount_type) => discount_type,
            None => return invalid_enum("discount_type", &raw),
        },
    };
    let discount_value = options.discount_value.or(request.discount_value).unwrap_or(0);

    match calculate_quote_totals(&request.items, pricing_mode, discount_type, discount_value) {
        Ok(totals) => {
            let message = format!(
                "{} items, total {} cents ({})",
                request.items.len(),
                totals.total_cents,
                pricing_mode.as_str()
            );
            CommandResult::success_with("quote", message, serde_json::to_value(&totals).ok())
        }
        Err(error) => CommandResult::failure("quote", "calculation", error.to_string(), 3),
    }
}

fn invalid_enum(kind: &str, raw: &str) -> CommandResult {
    CommandResult::failure("quote", "invalid_enum", format!("unknown {kind} `{raw}`"), 2)
}
