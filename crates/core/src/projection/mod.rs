//! Table projection of posted documents.
//!
//! Reshapes documents and their lines into a two-level tree for list
//! views: one parent row per document, one child row per inventory line.
//! Pure and synchronous; safe to re-run on every render.

pub mod cache;

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_shared::types::{CounterpartyId, InventoryId, TransactionId, TransactionItemId};

use crate::posting::{DocumentKind, ItemType};

pub use cache::{CachedView, NoopInvalidator, ProjectionCache, ViewInvalidator, ViewTicket};

/// A persisted document with its lines, as read for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    /// Internal id.
    pub id: TransactionId,
    /// Human-readable unique number.
    pub document_number: String,
    /// Document type.
    pub kind: DocumentKind,
    /// Document date.
    pub date: NaiveDate,
    /// Free-text remark.
    pub remark: Option<String>,
    /// Customer or supplier of the balancing line.
    pub counterparty_id: Option<CounterpartyId>,
    /// Name of that customer or supplier.
    pub counterparty_name: Option<String>,
    /// Lines in insertion order.
    pub items: Vec<ItemView>,
}

/// A persisted line of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    /// Internal id. Changes on every edit of the document.
    pub id: TransactionItemId,
    /// 1-based insertion order.
    pub line_no: u32,
    /// Line discriminator.
    pub item_type: ItemType,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Inventory record (inventory lines).
    pub inventory_id: Option<InventoryId>,
    /// Inventory name (inventory lines).
    pub inventory_name: Option<String>,
    /// Sale unit code used.
    pub inventory_barcode: Option<String>,
    /// Sale unit label.
    pub inventory_unit: Option<String>,
    /// Items per sale unit.
    pub inventory_unit_quantity: Option<Decimal>,
    /// Sale units transacted.
    pub unit_quantity: Option<Decimal>,
    /// Price of one sale unit.
    pub inventory_price_per_unit: Option<Decimal>,
    /// Base-unit quantity.
    pub quantity: Option<Decimal>,
    /// Customer or supplier (AR/AP lines).
    pub counterparty_id: Option<CounterpartyId>,
}

impl ItemView {
    /// Returns the line amount regardless of side.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit + self.credit
    }

    /// Returns true for the AR/AP balancing line.
    #[must_use]
    pub fn is_counterparty_line(&self) -> bool {
        matches!(self.item_type, ItemType::Ar | ItemType::Ap)
    }
}

/// Row of a document in a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRow {
    /// Document date.
    pub date: NaiveDate,
    /// Document number; also the expand/collapse key.
    pub document_number: String,
    /// Document type.
    pub kind: DocumentKind,
    /// Customer or supplier name.
    pub counterparty_name: String,
    /// Document total, read off the balancing line.
    pub amount: Decimal,
    /// One row per inventory line.
    pub children: Vec<ChildRow>,
}

/// Row of an inventory line in a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildRow {
    /// Inventory name.
    pub inventory_name: String,
    /// `"{unit_quantity} {unit} ({pack_size})"`.
    pub quantity: String,
    /// Line amount.
    pub amount: Decimal,
}

/// A displayable row; the display layer dispatches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "row_type", rename_all = "snake_case")]
pub enum Row<'a> {
    /// Document row.
    Parent(&'a ParentRow),
    /// Line row, shown only under an expanded parent.
    Child(&'a ChildRow),
}

impl Row<'_> {
    /// Nesting depth: 0 for documents, 1 for lines.
    #[must_use]
    pub const fn depth(&self) -> u8 {
        match self {
            Self::Parent(_) => 0,
            Self::Child(_) => 1,
        }
    }

    /// Amount shown in the row.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        match self {
            Self::Parent(parent) => parent.amount,
            Self::Child(child) => child.amount,
        }
    }
}

/// Projection of a document list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    /// Document rows in query order.
    pub rows: Vec<ParentRow>,
    /// Sum of document amounts.
    pub total_amount: Decimal,
    /// Sum of inventory line amounts.
    pub total_line_amount: Decimal,
}

impl Projection {
    /// Returns the number of document rows.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.rows.len()
    }

    /// Flattens the tree into display order, showing the children of
    /// expanded documents only.
    #[must_use]
    pub fn visible_rows(&self, expanded: &BTreeSet<String>) -> Vec<Row<'_>> {
        let mut visible = Vec::with_capacity(self.rows.len());
        for parent in &self.rows {
            visible.push(Row::Parent(parent));
            if expanded.contains(&parent.document_number) {
                visible.extend(parent.children.iter().map(Row::Child));
            }
        }
        visible
    }
}

/// Filter of a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct ListFilter {
    /// Document types to include; empty means all.
    pub kinds: BTreeSet<DocumentKind>,
    /// Inclusive start date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive end date.
    pub date_to: Option<NaiveDate>,
}

impl ListFilter {
    /// Filter for one document type.
    #[must_use]
    pub fn for_kind(kind: DocumentKind) -> Self {
        Self {
            kinds: BTreeSet::from([kind]),
            ..Self::default()
        }
    }

    /// Returns true if documents of `kind` can appear under this filter.
    #[must_use]
    pub fn includes(&self, kind: DocumentKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Projects documents into list rows.
#[must_use]
pub fn project(transactions: &[TransactionView]) -> Projection {
    let rows: Vec<ParentRow> = transactions.iter().map(parent_row).collect();

    let total_amount = rows
        .iter()
        .map(|r| r.amount)
        .fold(Decimal::ZERO, Decimal::saturating_add);
    let total_line_amount = rows
        .iter()
        .flat_map(|r| r.children.iter())
        .map(|c| c.amount)
        .fold(Decimal::ZERO, Decimal::saturating_add);

    Projection {
        rows,
        total_amount,
        total_line_amount,
    }
}

fn parent_row(transaction: &TransactionView) -> ParentRow {
    let mut items: Vec<&ItemView> = transaction.items.iter().collect();
    items.sort_by_key(|item| item.line_no);

    let amount = items
        .iter()
        .find(|item| item.is_counterparty_line())
        .map_or(Decimal::ZERO, |item| item.amount());

    let children = items
        .into_iter()
        .filter(|item| item.item_type == ItemType::Inventory)
        .map(child_row)
        .collect();

    ParentRow {
        date: transaction.date,
        document_number: transaction.document_number.clone(),
        kind: transaction.kind,
        counterparty_name: transaction.counterparty_name.clone().unwrap_or_default(),
        amount,
        children,
    }
}

fn child_row(item: &ItemView) -> ChildRow {
    ChildRow {
        inventory_name: item
            .inventory_name
            .clone()
            .or_else(|| item.inventory_barcode.clone())
            .unwrap_or_default(),
        quantity: format_quantity(
            item.unit_quantity.unwrap_or_default(),
            item.inventory_unit.as_deref().unwrap_or_default(),
            item.inventory_unit_quantity.unwrap_or(Decimal::ONE),
        ),
        amount: item.amount(),
    }
}

/// Formats a line quantity as `"{pack_count} {unit} ({pack_size})"`.
#[must_use]
pub fn format_quantity(pack_count: Decimal, unit: &str, pack_size: Decimal) -> String {
    format!("{} {unit} ({})", pack_count.normalize(), pack_size.normalize())
}
