/// Property-based tests for quote totals.
use proptest::prelude::*;

use leadflow_core::calc::{calculate_quote_totals, QuoteTotals};
use leadflow_core::domain::quote::{DiscountType, PricingMode, QuoteItem};

fn quote_item() -> impl Strategy<Value = QuoteItem> {
    (
        0u32..200,
        0u32..1000,
        0i64..=100_000,
        prop_oneof![Just(0i64), Just(900i64), Just(2_100i64), 0i64..=10_000],
        proptest::bool::ANY,
        proptest::bool::ANY,
    )
        .prop_map(|(whole, thousandths, unit_price_cents, tax_rate_bps, is_optional, is_selected)| {
            QuoteItem {
                description: format!("regel {whole}"),
                quantity: format!("{whole}.{thousandths:03}"),
                unit_price_cents,
                tax_rate_bps,
                is_optional,
                is_selected,
                catalog_product_id: None,
            }
        })
}

fn pricing_mode() -> impl Strategy<Value = PricingMode> {
    prop_oneof![Just(PricingMode::Exclusive), Just(PricingMode::Inclusive)]
}

fn discount() -> impl Strategy<Value = (DiscountType, i64)> {
    prop_oneof![
        (Just(DiscountType::Percentage), 0i64..=10_000),
        (Just(DiscountType::Fixed), 0i64..=50),
        (Just(DiscountType::Fixed), 0i64..=5_000_000),
    ]
}

fn totals(items: &[QuoteItem], mode: PricingMode, discount: (DiscountType, i64)) -> QuoteTotals {
    calculate_quote_totals(items, mode, discount.0, discount.1).expect("valid quote input")
}

proptest! {
    #[test]
    fn round_trip_identity_holds(
        items in prop::collection::vec(quote_item(), 0..6),
        mode in pricing_mode(),
        discount in discount(),
    ) {
        let totals = totals(&items, mode, discount);

        prop_assert_eq!(
            totals.subtotal_cents - totals.discount_amount_cents + totals.vat_total_cents,
            totals.total_cents
        );
        prop_assert_eq!(totals.lines.iter().map(|line| line.line_total_cents).sum::<i64>(), totals.total_cents);
        prop_assert_eq!(totals.lines.iter().map(|line| line.vat_cents).sum::<i64>(), totals.vat_total_cents);
        prop_assert_eq!(
            totals.lines.iter().map(|line| line.discount_cents).sum::<i64>(),
            totals.discount_amount_cents
        );
        prop_assert_eq!(
            totals.vat_breakdown.iter().map(|entry| entry.amount_cents).sum::<i64>(),
            totals.vat_total_cents
        );
    }

    #[test]
    fn line_amounts_are_never_negative(
        items in prop::collection::vec(quote_item(), 0..6),
        mode in pricing_mode(),
        discount in discount(),
    ) {
        let totals = totals(&items, mode, discount);

        for line in &totals.lines {
            prop_assert!(line.line_total_before_tax_cents >= 0, "{:?}", line);
            prop_assert!(line.discount_cents >= 0, "{:?}", line);
            prop_assert!(line.vat_cents >= 0, "{:?}", line);
            prop_assert!(line.line_total_cents >= 0, "{:?}", line);
            if !line.participates {
                prop_assert_eq!(line.line_total_cents, 0);
            }
        }
        prop_assert!(totals.vat_breakdown.iter().all(|entry| entry.amount_cents >= 0));
    }

    #[test]
    fn a_lower_total_always_reports_a_discount(
        items in prop::collection::vec(quote_item(), 1..6),
        mode in pricing_mode(),
        discount in discount(),
    ) {
        let undiscounted = totals(&items, mode, (DiscountType::Percentage, 0));
        let discounted = totals(&items, mode, discount);

        prop_assert_eq!(undiscounted.discount_amount_cents, 0);
        if discounted.total_cents < undiscounted.total_cents {
            prop_assert!(discounted.discount_amount_cents > 0);
        }
        prop_assert!(discounted.discount_amount_cents <= undiscounted.subtotal_cents);
    }

    #[test]
    fn calculation_is_pure(
        items in prop::collection::vec(quote_item(), 0..6),
        mode in pricing_mode(),
        discount in discount(),
    ) {
        let before = items.clone();
        let first = totals(&items, mode, discount);
        let second = totals(&items, mode, discount);

        prop_assert_eq!(&items, &before);
        prop_assert_eq!(first, second);
    }
}
