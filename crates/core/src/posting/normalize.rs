//! Line-item normalization.
//!
//! Turns submitted product rows into inventory lines with computed
//! quantities and amounts. The side an amount lands on follows the goods:
//! sales credit inventory, purchases debit it.
//!
//! Every value a line stores fits a `decimal(16, 4)` column: inputs with
//! more than four decimal places are rejected, and computed quantities and
//! amounts are rounded to four places before balancing, so the balancing
//! line is the sum of exactly what gets stored.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::{LineField, LineProblem, PostingError};
use super::types::{
    AMOUNT_SCALE, Direction, DocumentKind, InventoryLine, MAX_AMOUNT, RawLineInput,
};

/// Normalizes every submitted row, in order.
///
/// Fails on the first row that is blank or incomplete, reporting its
/// 1-based index. A blank row is an error even at the end of the list.
pub fn normalize_lines(
    kind: DocumentKind,
    rows: &[RawLineInput],
) -> Result<Vec<InventoryLine>, PostingError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| normalize_line(kind, index + 1, row))
        .collect()
}

/// Normalizes a single row.
pub fn normalize_line(
    kind: DocumentKind,
    row_no: usize,
    row: &RawLineInput,
) -> Result<InventoryLine, PostingError> {
    if row.is_blank() {
        return Err(PostingError::BlankLine { row: row_no });
    }

    let fail = |field, problem| PostingError::invalid_line(row_no, field, problem);

    let inventory_id = row
        .inventory_id
        .ok_or_else(|| fail(LineField::Inventory, LineProblem::Missing))?;

    let pack_count = row
        .pack_count
        .ok_or_else(|| fail(LineField::PackCount, LineProblem::Missing))?;
    if pack_count <= Decimal::ZERO {
        return Err(fail(LineField::PackCount, LineProblem::NotPositive));
    }
    check_storable(pack_count).map_err(|problem| fail(LineField::PackCount, problem))?;

    let unit = non_blank(row.unit.as_deref())
        .ok_or_else(|| fail(LineField::Unit, LineProblem::Missing))?;

    let unit_price = row
        .unit_price
        .ok_or_else(|| fail(LineField::UnitPrice, LineProblem::Missing))?;
    if unit_price < Decimal::ZERO {
        return Err(fail(LineField::UnitPrice, LineProblem::Negative));
    }
    check_storable(unit_price).map_err(|problem| fail(LineField::UnitPrice, problem))?;

    let pack_size = row.pack_size.unwrap_or(Decimal::ONE);
    if pack_size <= Decimal::ZERO {
        return Err(fail(LineField::PackSize, LineProblem::NotPositive));
    }
    check_storable(pack_size).map_err(|problem| fail(LineField::PackSize, problem))?;

    let quantity = stored_product(pack_size, pack_count)
        .ok_or_else(|| fail(LineField::PackSize, LineProblem::OutOfRange))?;
    let amount = stored_product(pack_count, unit_price)
        .ok_or_else(|| fail(LineField::UnitPrice, LineProblem::OutOfRange))?;

    let (debit, credit) = match kind.direction() {
        Direction::Sales => (Decimal::ZERO, amount),
        Direction::Purchase => (amount, Decimal::ZERO),
    };

    Ok(InventoryLine {
        inventory_id,
        barcode: non_blank(row.price_code.as_deref()),
        unit,
        pack_size,
        pack_count,
        unit_price,
        quantity,
        debit,
        credit,
    })
}

/// Rejects values a line column cannot hold exactly.
fn check_storable(value: Decimal) -> Result<(), LineProblem> {
    if value.normalize().scale() > AMOUNT_SCALE {
        return Err(LineProblem::TooPrecise);
    }
    if value > MAX_AMOUNT {
        return Err(LineProblem::OutOfRange);
    }
    Ok(())
}

/// Multiplies and rounds half away from zero to the stored scale; `None` if the result does not fit.
fn stored_product(a: Decimal, b: Decimal) -> Option<Decimal> {
    a.checked_mul(b)
        .map(|product| {
            product.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        })
        .filter(|product| *product <= MAX_AMOUNT)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
