//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod counterparty;
pub mod inventory;
pub mod numbering;
pub mod transaction;

pub use counterparty::{Counterparty, CounterpartyRepository, CreateCounterpartyInput, Side};
pub use inventory::{CreateInventoryInput, CreatePriceInput, InventoryRepository, InventoryWithPrices};
pub use numbering::next_document_number;
pub use transaction::{CreatedTransaction, TransactionRepository};

use sea_orm::{DbErr, SqlErr};
use stockbook_core::posting::PostingError;

/// Maps a store failure to the posting error surfaced to callers.
pub(crate) fn persistence(err: DbErr) -> PostingError {
    PostingError::Persistence(err.to_string())
}

/// Returns true if `err` is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
