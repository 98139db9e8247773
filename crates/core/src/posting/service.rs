//! Posting service composing normalization and balancing.
//!
//! This is the validation half of both write flows. It contains no
//! database access; repositories call it before opening a transaction so
//! that bad input never reaches the store.

use stockbook_shared::types::CounterpartyId;

use super::balance::balance;
use super::error::PostingError;
use super::normalize::normalize_lines;
use super::types::{BalancedPosting, DocumentKind, RawLineInput, TransactionTotals};

/// Posting service for line validation and balancing.
pub struct PostingService;

impl PostingService {
    /// Validate submitted rows and build the balanced posting.
    ///
    /// Steps:
    /// 1. Require a counterparty
    /// 2. Normalize each row (1-based row index on failure)
    /// 3. Append the balancing counterparty line, bounded to a storable total
    /// 4. Check totals
    ///
    /// # Errors
    ///
    /// Returns `PostingError` if any step fails. Nothing has been written
    /// at that point.
    pub fn prepare(
        kind: DocumentKind,
        counterparty_id: Option<CounterpartyId>,
        rows: &[RawLineInput],
    ) -> Result<(BalancedPosting, TransactionTotals), PostingError> {
        let counterparty_id = counterparty_id.ok_or(PostingError::MissingCounterparty)?;

        let lines = normalize_lines(kind, rows)?;
        let posting = balance(lines, counterparty_id, kind)?;

        let totals = posting.totals();
        if !totals.is_balanced {
            return Err(PostingError::Unbalanced {
                debit: totals.debit,
                credit: totals.credit,
            });
        }

        Ok((posting, totals))
    }
}
