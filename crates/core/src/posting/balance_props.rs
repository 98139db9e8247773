//! Property-based tests for normalization and balancing.
//!
//! - Balanced postings: total debit equals total credit
//! - Counterparty line sits on the opposite side of the inventory lines
//! - Line amounts are pack count times unit price, rounded to the stored scale

use proptest::prelude::*;
use rust_decimal::Decimal;
use stockbook_shared::types::{CounterpartyId, InventoryId};

use super::balance::balance;
use super::normalize::normalize_lines;
use super::service::PostingService;
use super::types::{AMOUNT_SCALE, Direction, DocumentKind, MAX_AMOUNT, RawLineInput};

/// Strategy to generate non-negative prices (0.00 to 10,000.00).
fn price() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive pack counts (0.001 to 1,000.000).
fn pack_count() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|v| Decimal::new(v, 3))
}

/// Strategy to generate positive pack sizes (1 to 144).
fn pack_size() -> impl Strategy<Value = Decimal> {
    (1i64..=144i64).prop_map(Decimal::from)
}

fn document_kind() -> impl Strategy<Value = DocumentKind> {
    prop_oneof![
        Just(DocumentKind::CashSales),
        Just(DocumentKind::CreditSales),
        Just(DocumentKind::GoodsPurchase),
    ]
}

fn raw_row() -> impl Strategy<Value = RawLineInput> {
    (pack_size(), pack_count(), price()).prop_map(|(size, count, unit_price)| RawLineInput {
        inventory_id: Some(InventoryId::new()),
        price_code: None,
        unit: Some("pcs".to_string()),
        pack_size: Some(size),
        pack_count: Some(count),
        unit_price: Some(unit_price),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* non-empty set of normalized lines, the balanced posting has
    /// total debit equal to total credit.
    #[test]
    fn prop_balanced_posting_debit_equals_credit(
        kind in document_kind(),
        rows in prop::collection::vec(raw_row(), 1..20),
    ) {
        let lines = normalize_lines(kind, &rows).unwrap();
        let posting = balance(lines, CounterpartyId::new(), kind).unwrap();
        let totals = posting.totals();

        prop_assert!(totals.is_balanced);
        prop_assert_eq!(totals.debit, totals.credit);
        prop_assert_eq!(posting.line_count(), rows.len() + 1);
    }

    /// *For any* document kind, inventory lines sit on one side only and the
    /// counterparty line on the other.
    #[test]
    fn prop_counterparty_line_opposes_inventory_lines(
        kind in document_kind(),
        rows in prop::collection::vec(raw_row(), 1..20),
    ) {
        let lines = normalize_lines(kind, &rows).unwrap();
        let posting = balance(lines, CounterpartyId::new(), kind).unwrap();

        match kind.direction() {
            Direction::Sales => {
                prop_assert!(posting.inventory_lines.iter().all(|l| l.debit.is_zero()));
                prop_assert!(posting.counterparty_line.credit.is_zero());
            }
            Direction::Purchase => {
                prop_assert!(posting.inventory_lines.iter().all(|l| l.credit.is_zero()));
                prop_assert!(posting.counterparty_line.debit.is_zero());
            }
        }
        prop_assert_eq!(posting.counterparty_line.item_type, kind.counterparty_item_type());
    }

    /// *For any* valid row, amount = pack count × unit price to within half
    /// a unit of the stored scale, and quantity = pack size × pack count.
    #[test]
    fn prop_line_amounts(
        kind in document_kind(),
        row in raw_row(),
    ) {
        let lines = normalize_lines(kind, std::slice::from_ref(&row)).unwrap();
        let line = &lines[0];

        let amount = row.pack_count.unwrap() * row.unit_price.unwrap();
        prop_assert!((line.amount() - amount).abs() <= Decimal::new(5, 5));
        prop_assert!(line.amount().scale() <= AMOUNT_SCALE);
        prop_assert!(line.amount() <= MAX_AMOUNT);
        prop_assert_eq!(line.quantity, row.pack_size.unwrap() * row.pack_count.unwrap());
        prop_assert!(line.debit >= Decimal::ZERO && line.credit >= Decimal::ZERO);
    }

    /// *For any* row set, the service result agrees with balancing directly.
    #[test]
    fn prop_service_matches_balancer(
        kind in document_kind(),
        rows in prop::collection::vec(raw_row(), 0..10),
    ) {
        let counterparty = CounterpartyId::new();
        let (posting, totals) = PostingService::prepare(kind, Some(counterparty), &rows).unwrap();
        let direct = balance(normalize_lines(kind, &rows).unwrap(), counterparty, kind).unwrap();

        prop_assert_eq!(posting, direct);
        prop_assert!(totals.is_balanced);
    }
}
