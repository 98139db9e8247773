//! Document number allocation against the store.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use stockbook_core::numbering;
use stockbook_core::posting::PostingError;

use super::persistence;
use crate::entities::transactions;

/// Computes the next free document number for `prefix` on `date`.
///
/// Runs on the caller's connection. In the create flow that is the open
/// database transaction the header is inserted in, so the read and the
/// insert commit or roll back together.
///
/// # Errors
///
/// Returns `Persistence` if the query fails, or the numbering errors of
/// [`numbering::next_after`].
pub async fn next_document_number<C>(
    conn: &C,
    prefix: &str,
    date: NaiveDate,
) -> Result<String, PostingError>
where
    C: ConnectionTrait,
{
    let scan_key = numbering::scan_key(prefix, date);

    let last: Option<String> = transactions::Entity::find()
        .select_only()
        .column(transactions::Column::DocumentNumber)
        .filter(transactions::Column::DocumentNumber.starts_with(scan_key.as_str()))
        .order_by_desc(transactions::Column::DocumentNumber)
        .limit(1)
        .into_tuple()
        .one(conn)
        .await
        .map_err(persistence)?;

    numbering::next_after(&scan_key, last.as_deref())
}
