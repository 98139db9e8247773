//! Posting balancer.

use rust_decimal::Decimal;
use stockbook_shared::types::CounterpartyId;

use super::error::PostingError;
use super::types::{
    BalancedPosting, CounterpartyLine, Direction, DocumentKind, InventoryLine, MAX_AMOUNT,
};

/// Appends the counterparty line that makes debits equal credits.
///
/// Sales debit the customer with the sum of inventory credits; purchases
/// credit the supplier with the sum of inventory debits. An empty line list
/// yields a zero-value counterparty line; rejecting empty documents is the
/// caller's decision.
///
/// # Errors
///
/// Returns `TotalOutOfRange` if the sum does not fit a stored line.
pub fn balance(
    inventory_lines: Vec<InventoryLine>,
    counterparty_id: CounterpartyId,
    kind: DocumentKind,
) -> Result<BalancedPosting, PostingError> {
    let direction = kind.direction();
    let total = checked_total(&inventory_lines, |line| match direction {
        Direction::Sales => line.credit,
        Direction::Purchase => line.debit,
    })?;

    let (debit, credit) = match direction {
        Direction::Sales => (total, Decimal::ZERO),
        Direction::Purchase => (Decimal::ZERO, total),
    };

    Ok(BalancedPosting {
        kind,
        inventory_lines,
        counterparty_line: CounterpartyLine {
            item_type: kind.counterparty_item_type(),
            counterparty_id,
            debit,
            credit,
        },
    })
}

fn checked_total(
    lines: &[InventoryLine],
    amount: impl Fn(&InventoryLine) -> Decimal,
) -> Result<Decimal, PostingError> {
    let mut total = Decimal::ZERO;
    for (index, line) in lines.iter().enumerate() {
        total = total
            .checked_add(amount(line))
            .filter(|sum| *sum <= MAX_AMOUNT)
            .ok_or(PostingError::TotalOutOfRange {
                row: index + 1,
                max: MAX_AMOUNT,
            })?;
    }
    Ok(total)
}
