//! Posting of sales and purchase documents.
//!
//! This module turns submitted product rows into a balanced posting:
//! - Domain types for documents and their lines
//! - Line normalization (quantities, amounts, side)
//! - Balancing against the customer or supplier
//! - The error taxonomy shared by the write flows

pub mod balance;
pub mod error;
pub mod normalize;
pub mod service;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::balance;
pub use error::{ErrorKind, LineField, LineProblem, PostingError};
pub use normalize::{normalize_line, normalize_lines};
pub use service::PostingService;
pub use types::{
    AMOUNT_PRECISION, AMOUNT_SCALE, BalancedPosting, MAX_AMOUNT, CounterpartyLine, CreatePostingInput, Direction, DocumentKind, InventoryLine,
    ItemType, RawLineInput, TransactionTotals, UpdatePostingInput,
};
