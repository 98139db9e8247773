//! Posting domain types.
//!
//! This module defines the types that flow from a submitted form, through
//! normalization and balancing, into the rows a repository persists.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_shared::types::{CounterpartyId, InventoryId};

/// Total digits of a stored amount or quantity.
pub const AMOUNT_PRECISION: u32 = 16;

/// Decimal places of a stored amount or quantity.
pub const AMOUNT_SCALE: u32 = 4;

/// Largest amount or quantity a line column holds: `999_999_999_999.9999`.
pub const MAX_AMOUNT: Decimal =
    Decimal::from_parts(1_874_919_423, 2_328_306, 0, false, AMOUNT_SCALE);

/// Document type of a transaction.
///
/// The type decides the document number prefix, the side inventory lines
/// post to, and which counterparty ledger the balancing line hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Sale settled on the spot.
    CashSales,
    /// Sale on account (customer receivable).
    CreditSales,
    /// Purchase of goods on account (supplier payable).
    GoodsPurchase,
}

impl DocumentKind {
    /// All document kinds, in display order.
    pub const ALL: [Self; 3] = [Self::CashSales, Self::CreditSales, Self::GoodsPurchase];

    /// Returns the document number prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::CashSales => "CS",
            Self::CreditSales => "SO",
            Self::GoodsPurchase => "RI",
        }
    }

    /// Returns whether goods leave or arrive with this kind of document.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::CashSales | Self::CreditSales => Direction::Sales,
            Self::GoodsPurchase => Direction::Purchase,
        }
    }

    /// Returns the item type of the balancing line.
    #[must_use]
    pub const fn counterparty_item_type(self) -> ItemType {
        match self.direction() {
            Direction::Sales => ItemType::Ar,
            Direction::Purchase => ItemType::Ap,
        }
    }

    /// Returns the snake_case name used in storage and query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CashSales => "cash_sales",
            Self::CreditSales => "credit_sales",
            Self::GoodsPurchase => "goods_purchase",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown document type: {s}"))
    }
}

/// Direction of goods for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Goods leave: inventory lines are credited, the customer is debited.
    Sales,
    /// Goods arrive: inventory lines are debited, the supplier is credited.
    Purchase,
}

/// Discriminator of a transaction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Product line referencing an inventory record.
    Inventory,
    /// Balancing line against a customer.
    Ar,
    /// Balancing line against a supplier.
    Ap,
}

/// One product row as submitted from a form.
///
/// Every field is optional because a form row can be left partially or
/// entirely empty; the normalizer decides what is acceptable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLineInput {
    /// The inventory record sold or bought.
    pub inventory_id: Option<InventoryId>,
    /// Code (barcode) of the chosen sale unit.
    pub price_code: Option<String>,
    /// Label of the chosen sale unit, e.g. "box".
    pub unit: Option<String>,
    /// Items per sale unit. Defaults to 1.
    pub pack_size: Option<Decimal>,
    /// Number of sale units transacted.
    pub pack_count: Option<Decimal>,
    /// Price of one sale unit.
    pub unit_price: Option<Decimal>,
}

impl RawLineInput {
    /// Returns true if no field of the row carries a value.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        let blank_text = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());

        self.inventory_id.is_none()
            && blank_text(&self.price_code)
            && blank_text(&self.unit)
            && self.pack_size.is_none()
            && self.pack_count.is_none()
            && self.unit_price.is_none()
    }
}

/// A normalized inventory line ready to be balanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    /// The inventory record.
    pub inventory_id: InventoryId,
    /// Code of the sale unit used, if one was chosen.
    pub barcode: Option<String>,
    /// Sale unit label.
    pub unit: String,
    /// Items per sale unit.
    pub pack_size: Decimal,
    /// Sale units transacted.
    pub pack_count: Decimal,
    /// Price of one sale unit.
    pub unit_price: Decimal,
    /// Base-unit quantity (`pack_size * pack_count`).
    pub quantity: Decimal,
    /// Debit amount (purchase lines).
    pub debit: Decimal,
    /// Credit amount (sales lines).
    pub credit: Decimal,
}

impl InventoryLine {
    /// Returns the line amount regardless of side.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit + self.credit
    }
}

/// The balancing line against a customer or supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyLine {
    /// `Ar` for sales, `Ap` for purchases.
    pub item_type: ItemType,
    /// The customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Debit amount (sales).
    pub debit: Decimal,
    /// Credit amount (purchases).
    pub credit: Decimal,
}

/// A complete, balanced set of lines for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancedPosting {
    /// The document kind the lines were built for.
    pub kind: DocumentKind,
    /// Product lines in submission order.
    pub inventory_lines: Vec<InventoryLine>,
    /// The balancing line, always posted after the product lines.
    pub counterparty_line: CounterpartyLine,
}

impl BalancedPosting {
    /// Returns debit and credit totals across all lines.
    #[must_use]
    pub fn totals(&self) -> TransactionTotals {
        let debit = self
            .inventory_lines
            .iter()
            .map(|l| l.debit)
            .fold(self.counterparty_line.debit, Decimal::saturating_add);
        let credit = self
            .inventory_lines
            .iter()
            .map(|l| l.credit)
            .fold(self.counterparty_line.credit, Decimal::saturating_add);

        TransactionTotals::new(debit, credit)
    }

    /// Returns the number of lines the posting persists.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.inventory_lines.len() + 1
    }
}

/// Input for creating a document.
#[derive(Debug, Clone)]
pub struct CreatePostingInput {
    /// The document type.
    pub kind: DocumentKind,
    /// The document date; also scopes the daily sequence.
    pub date: NaiveDate,
    /// The customer or supplier, if one was selected.
    pub counterparty_id: Option<CounterpartyId>,
    /// Product rows as submitted.
    pub lines: Vec<RawLineInput>,
    /// Optional free-text remark.
    pub remark: Option<String>,
}

/// Input for replacing the posting of an existing document.
#[derive(Debug, Clone)]
pub struct UpdatePostingInput {
    /// Number of the document to edit.
    pub document_number: String,
    /// The new document date.
    pub date: NaiveDate,
    /// The customer or supplier, possibly changed.
    pub counterparty_id: Option<CounterpartyId>,
    /// Product rows as submitted; they replace every existing line.
    pub lines: Vec<RawLineInput>,
    /// A user-edited document number, if the number changes.
    pub new_document_number: Option<String>,
    /// Optional free-text remark.
    pub remark: Option<String>,
}

/// Debit and credit totals of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionTotals {
    /// Total debit amount.
    pub debit: Decimal,
    /// Total credit amount.
    pub credit: Decimal,
    /// Whether the posting is balanced (debits == credits).
    pub is_balanced: bool,
}

impl TransactionTotals {
    /// Creates new totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }
}
