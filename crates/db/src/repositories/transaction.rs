//! Transaction repository: the document writer and its read model.
//!
//! Both write flows validate the submitted rows before a database
//! transaction is opened, then do every write of a document inside one
//! database transaction. An uncommitted `DatabaseTransaction` rolls back
//! when dropped, so any early return leaves the store untouched.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use stockbook_core::numbering;
use stockbook_core::posting::{
    BalancedPosting, CreatePostingInput, DocumentKind, ItemType as LineItemType, PostingError,
    PostingService, TransactionTotals, UpdatePostingInput,
};
use stockbook_core::projection::{
    self, CachedView, ItemView, ListFilter, NoopInvalidator, Projection, TransactionView,
    ViewInvalidator,
};
use stockbook_shared::types::{CounterpartyId, InventoryId, TransactionId, TransactionItemId};
use tracing::{info, warn};
use uuid::Uuid;

use super::numbering::next_document_number;
use super::{is_unique_violation, persistence};
use crate::entities::{
    accounts_payable, accounts_receivable, inventories,
    sea_orm_active_enums::{ItemType, TransactionType},
    transaction_items, transactions,
};

/// Default number of allocate-and-insert attempts on a number collision.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTransaction {
    /// Internal id.
    pub id: TransactionId,
    /// Allocated document number.
    pub document_number: String,
    /// Document type.
    pub kind: DocumentKind,
    /// Document date.
    pub date: NaiveDate,
    /// Totals of the persisted posting.
    pub totals: TransactionTotals,
    /// Number of persisted lines, balancing line included.
    pub line_count: usize,
}

/// Outcome of one allocate-and-insert attempt.
enum AttemptError {
    /// Another writer committed this number first.
    NumberTaken(String),
    Failed(PostingError),
}

impl From<PostingError> for AttemptError {
    fn from(err: PostingError) -> Self {
        Self::Failed(err)
    }
}

/// Transaction repository for document writes and reads.
#[derive(Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
    max_attempts: u32,
    invalidator: Arc<dyn ViewInvalidator>,
}

impl fmt::Debug for TransactionRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionRepository")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl TransactionRepository {
    /// Creates a new transaction repository without cached views.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            invalidator: Arc::new(NoopInvalidator),
        }
    }

    /// Sets how many times a create retries after a number collision.
    /// Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the receiver of view invalidations.
    #[must_use]
    pub fn with_invalidator(mut self, invalidator: Arc<dyn ViewInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// Creates a document with its balanced posting.
    ///
    /// The document number is allocated and the header and lines are
    /// inserted in one database transaction. If another writer commits the
    /// same number first, the unique index rejects the insert and the whole
    /// unit is retried with a freshly allocated number.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No counterparty is selected, or a row fails validation
    /// - Every attempt collides with a concurrent writer (`NumberingConflict`)
    /// - The daily sequence is exhausted
    /// - Database operation fails
    pub async fn create_transaction(
        &self,
        input: CreatePostingInput,
    ) -> Result<CreatedTransaction, PostingError> {
        let (posting, totals) =
            PostingService::prepare(input.kind, input.counterparty_id, &input.lines)?;

        let scan_key = numbering::scan_key(input.kind.prefix(), input.date);
        let (input_ref, posting_ref) = (&input, &posting);
        let (id, document_number) = retry_on_taken_number(self.max_attempts, scan_key, move |_| {
            self.try_create(input_ref, posting_ref)
        })
        .await?;

        info!(
            document_number = %document_number,
            kind = %input.kind,
            lines = posting.line_count(),
            amount = %totals.debit,
            "Transaction created"
        );

        self.invalidator.invalidate(&[
            CachedView::List(input.kind),
            CachedView::Detail(document_number.clone()),
        ]);

        Ok(CreatedTransaction {
            id,
            document_number,
            kind: input.kind,
            date: input.date,
            totals,
            line_count: posting.line_count(),
        })
    }

    async fn try_create(
        &self,
        input: &CreatePostingInput,
        posting: &BalancedPosting,
    ) -> Result<(TransactionId, String), AttemptError> {
        let txn = self.db.begin().await.map_err(persistence)?;

        let document_number = next_document_number(&txn, input.kind.prefix(), input.date).await?;

        let id = TransactionId::new();
        let now = Utc::now().into();
        let header = transactions::ActiveModel {
            id: Set(id.into_inner()),
            document_number: Set(document_number.clone()),
            transaction_type: Set(TransactionType::from(input.kind)),
            transaction_date: Set(input.date),
            remark: Set(clean_remark(input.remark.as_deref())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        if let Err(err) = header.insert(&txn).await {
            if is_unique_violation(&err) {
                return Err(AttemptError::NumberTaken(document_number));
            }
            return Err(persistence(err).into());
        }

        insert_items(&txn, id, posting)
            .await
            .map_err(persistence)?;

        txn.commit().await.map_err(persistence)?;

        Ok((id, document_number))
    }

    /// Replaces the posting of an existing document.
    ///
    /// Every existing line is deleted and the new balanced set inserted,
    /// then the header's date, remark and (if user-edited) document number
    /// are updated, all in one database transaction. Line ids are not
    /// stable across edits. The stored document type is kept.
    ///
    /// Returns the document number after the edit.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The document does not exist (`TransactionNotFound`)
    /// - No counterparty is selected, or a row fails validation
    /// - The edited number is malformed or already used
    /// - Database operation fails; the prior posting is left intact
    pub async fn update_transaction(
        &self,
        input: UpdatePostingInput,
    ) -> Result<String, PostingError> {
        let existing = self.find_header(&input.document_number).await?;
        let kind = DocumentKind::from(existing.transaction_type);

        let (posting, totals) = PostingService::prepare(kind, input.counterparty_id, &input.lines)?;

        let renamed_to = match input.new_document_number.as_deref().map(str::trim) {
            Some(number) if number != existing.document_number => {
                if !numbering::is_well_formed(kind, number) {
                    return Err(PostingError::InvalidDocumentNumber(number.to_string()));
                }
                Some(number.to_string())
            }
            _ => None,
        };

        let txn = self.db.begin().await.map_err(persistence)?;

        // Concurrent edits of one document queue here, so each replaces the
        // lines the previous one committed.
        let existing = transactions::Entity::find_by_id(existing.id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(persistence)?
            .filter(|header| header.document_number == input.document_number)
            .ok_or_else(|| PostingError::TransactionNotFound(input.document_number.clone()))?;

        let old_number = existing.document_number.clone();
        let transaction_id = TransactionId::from_uuid(existing.id);

        transaction_items::Entity::delete_many()
            .filter(transaction_items::Column::TransactionId.eq(existing.id))
            .exec(&txn)
            .await
            .map_err(persistence)?;

        insert_items(&txn, transaction_id, &posting)
            .await
            .map_err(persistence)?;

        let mut active: transactions::ActiveModel = existing.into();
        active.transaction_date = Set(input.date);
        active.remark = Set(clean_remark(input.remark.as_deref()));
        if let Some(number) = &renamed_to {
            active.document_number = Set(number.clone());
        }
        active.updated_at = Set(Utc::now().into());

        active.update(&txn).await.map_err(|err| {
            if is_unique_violation(&err) {
                PostingError::DuplicateDocumentNumber(
                    renamed_to.clone().unwrap_or_else(|| old_number.clone()),
                )
            } else {
                persistence(err)
            }
        })?;

        txn.commit().await.map_err(persistence)?;

        let document_number = renamed_to.unwrap_or_else(|| old_number.clone());

        info!(
            document_number = %document_number,
            previous_number = %old_number,
            kind = %kind,
            lines = posting.line_count(),
            amount = %totals.debit,
            "Transaction updated"
        );

        let mut views = vec![CachedView::List(kind), CachedView::Detail(old_number.clone())];
        if document_number != old_number {
            views.push(CachedView::Detail(document_number.clone()));
        }
        self.invalidator.invalidate(&views);

        Ok(document_number)
    }

    /// Gets a document with its lines, for edit views.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if no document has this number, or
    /// `Persistence` if the query fails.
    pub async fn get_transaction(
        &self,
        document_number: &str,
    ) -> Result<TransactionView, PostingError> {
        let header = self.find_header(document_number).await?;

        load_views(&self.db, vec![header])
            .await
            .map_err(persistence)?
            .pop()
            .ok_or_else(|| PostingError::TransactionNotFound(document_number.to_string()))
    }

    /// Lists documents matching a filter, ordered by date then number.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    pub async fn list_transactions(
        &self,
        filter: &ListFilter,
    ) -> Result<Vec<TransactionView>, PostingError> {
        let mut query = transactions::Entity::find();

        if !filter.kinds.is_empty() {
            let types: Vec<TransactionType> =
                filter.kinds.iter().copied().map(TransactionType::from).collect();
            query = query.filter(transactions::Column::TransactionType.is_in(types));
        }

        if let Some(date_from) = filter.date_from {
            query = query.filter(transactions::Column::TransactionDate.gte(date_from));
        }

        if let Some(date_to) = filter.date_to {
            query = query.filter(transactions::Column::TransactionDate.lte(date_to));
        }

        let headers = query
            .order_by_asc(transactions::Column::TransactionDate)
            .order_by_asc(transactions::Column::DocumentNumber)
            .all(&self.db)
            .await
            .map_err(persistence)?;

        load_views(&self.db, headers).await.map_err(persistence)
    }

    /// Lists documents matching a filter as a parent/child row tree.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    pub async fn list_projection(&self, filter: &ListFilter) -> Result<Projection, PostingError> {
        let views = self.list_transactions(filter).await?;
        Ok(projection::project(&views))
    }

    async fn find_header(&self, document_number: &str) -> Result<transactions::Model, PostingError> {
        transactions::Entity::find()
            .filter(transactions::Column::DocumentNumber.eq(document_number))
            .one(&self.db)
            .await
            .map_err(persistence)?
            .ok_or_else(|| PostingError::TransactionNotFound(document_number.to_string()))
    }
}

/// Runs `attempt` until it stops colliding on a document number.
///
/// Only `NumberTaken` is retried; any other failure is returned as is.
async fn retry_on_taken_number<T, F, Fut>(
    max_attempts: u32,
    scan_key: String,
    mut attempt: F,
) -> Result<T, PostingError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    for n in 1..=max_attempts {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::NumberTaken(document_number)) => {
                warn!(
                    document_number = %document_number,
                    attempt = n,
                    max_attempts,
                    "Document number taken by a concurrent writer, retrying"
                );
            }
            Err(AttemptError::Failed(err)) => return Err(err),
        }
    }

    Err(PostingError::NumberingConflict {
        scan_key,
        attempts: max_attempts,
    })
}

/// Inserts the inventory lines in order, then the balancing line.
async fn insert_items(
    txn: &DatabaseTransaction,
    transaction_id: TransactionId,
    posting: &BalancedPosting,
) -> Result<(), DbErr> {
    let now = Utc::now().into();
    let mut line_no: i32 = 0;

    for line in &posting.inventory_lines {
        line_no += 1;
        let item = transaction_items::ActiveModel {
            id: Set(TransactionItemId::new().into_inner()),
            transaction_id: Set(transaction_id.into_inner()),
            line_no: Set(line_no),
            item_type: Set(ItemType::Inventory),
            debit_amount: Set(line.debit),
            credit_amount: Set(line.credit),
            inventory_id: Set(Some(line.inventory_id.into_inner())),
            inventory_barcode: Set(line.barcode.clone()),
            inventory_unit: Set(Some(line.unit.clone())),
            inventory_unit_quantity: Set(Some(line.pack_size)),
            unit_quantity: Set(Some(line.pack_count)),
            inventory_price_per_unit: Set(Some(line.unit_price)),
            quantity: Set(Some(line.quantity)),
            account_receivable_id: Set(None),
            account_payable_id: Set(None),
            created_at: Set(now),
        };
        transaction_items::Entity::insert(item)
            .exec_without_returning(txn)
            .await?;
    }

    let balancing = &posting.counterparty_line;
    let counterparty = Some(balancing.counterparty_id.into_inner());
    let (account_receivable_id, account_payable_id) = match balancing.item_type {
        LineItemType::Ap => (None, counterparty),
        LineItemType::Ar | LineItemType::Inventory => (counterparty, None),
    };

    let item = transaction_items::ActiveModel {
        id: Set(TransactionItemId::new().into_inner()),
        transaction_id: Set(transaction_id.into_inner()),
        line_no: Set(line_no + 1),
        item_type: Set(ItemType::from(balancing.item_type)),
        debit_amount: Set(balancing.debit),
        credit_amount: Set(balancing.credit),
        inventory_id: Set(None),
        inventory_barcode: Set(None),
        inventory_unit: Set(None),
        inventory_unit_quantity: Set(None),
        unit_quantity: Set(None),
        inventory_price_per_unit: Set(None),
        quantity: Set(None),
        account_receivable_id: Set(account_receivable_id),
        account_payable_id: Set(account_payable_id),
        created_at: Set(now),
    };
    transaction_items::Entity::insert(item)
        .exec_without_returning(txn)
        .await?;

    Ok(())
}

/// Loads lines and display names for a batch of headers.
async fn load_views<C>(
    conn: &C,
    headers: Vec<transactions::Model>,
) -> Result<Vec<TransactionView>, DbErr>
where
    C: ConnectionTrait,
{
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
    let items = transaction_items::Entity::find()
        .filter(transaction_items::Column::TransactionId.is_in(ids))
        .order_by_asc(transaction_items::Column::TransactionId)
        .order_by_asc(transaction_items::Column::LineNo)
        .all(conn)
        .await?;

    let inventory_ids: BTreeSet<Uuid> = items.iter().filter_map(|i| i.inventory_id).collect();
    let receivable_ids: BTreeSet<Uuid> =
        items.iter().filter_map(|i| i.account_receivable_id).collect();
    let payable_ids: BTreeSet<Uuid> = items.iter().filter_map(|i| i.account_payable_id).collect();

    let mut inventory_names = HashMap::new();
    if !inventory_ids.is_empty() {
        for inventory in inventories::Entity::find()
            .filter(inventories::Column::Id.is_in(inventory_ids))
            .all(conn)
            .await?
        {
            inventory_names.insert(inventory.id, inventory.name);
        }
    }

    let mut counterparty_names = HashMap::new();
    if !receivable_ids.is_empty() {
        for customer in accounts_receivable::Entity::find()
            .filter(accounts_receivable::Column::Id.is_in(receivable_ids))
            .all(conn)
            .await?
        {
            counterparty_names.insert(customer.id, customer.name);
        }
    }
    if !payable_ids.is_empty() {
        for supplier in accounts_payable::Entity::find()
            .filter(accounts_payable::Column::Id.is_in(payable_ids))
            .all(conn)
            .await?
        {
            counterparty_names.insert(supplier.id, supplier.name);
        }
    }

    let mut items_by_transaction: HashMap<Uuid, Vec<ItemView>> = HashMap::new();
    for item in items {
        let transaction_id = item.transaction_id;
        let view = item_view(item, &inventory_names);
        items_by_transaction
            .entry(transaction_id)
            .or_default()
            .push(view);
    }

    let views = headers
        .into_iter()
        .map(|header| {
            let items = items_by_transaction.remove(&header.id).unwrap_or_default();
            let counterparty_id = items.iter().find_map(|item| item.counterparty_id);
            let counterparty_name = counterparty_id
                .and_then(|id| counterparty_names.get(&id.into_inner()))
                .cloned();

            TransactionView {
                id: TransactionId::from_uuid(header.id),
                document_number: header.document_number,
                kind: DocumentKind::from(header.transaction_type),
                date: header.transaction_date,
                remark: header.remark,
                counterparty_id,
                counterparty_name,
                items,
            }
        })
        .collect();

    Ok(views)
}

fn item_view(item: transaction_items::Model, inventory_names: &HashMap<Uuid, String>) -> ItemView {
    let inventory_name = item
        .inventory_id
        .and_then(|id| inventory_names.get(&id))
        .cloned();

    ItemView {
        id: TransactionItemId::from_uuid(item.id),
        line_no: u32::try_from(item.line_no).unwrap_or_default(),
        item_type: LineItemType::from(item.item_type),
        debit: item.debit_amount,
        credit: item.credit_amount,
        inventory_id: item.inventory_id.map(InventoryId::from_uuid),
        inventory_name,
        inventory_barcode: item.inventory_barcode,
        inventory_unit: item.inventory_unit,
        inventory_unit_quantity: item.inventory_unit_quantity,
        unit_quantity: item.unit_quantity,
        inventory_price_per_unit: item.inventory_price_per_unit,
        quantity: item.quantity,
        counterparty_id: item
            .account_receivable_id
            .or(item.account_payable_id)
            .map(CounterpartyId::from_uuid),
    }
}

fn clean_remark(remark: Option<&str>) -> Option<String> {
    remark
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_remark() {
        assert_eq!(clean_remark(None), None);
        assert_eq!(clean_remark(Some("   ")), None);
        assert_eq!(clean_remark(Some(" paid cash ")), Some("paid cash".to_string()));
    }

    fn taken(n: u32) -> AttemptError {
        AttemptError::NumberTaken(format!("SO20240601{n:03}"))
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_taken_numbers() {
        let mut calls = 0;
        let result = retry_on_taken_number(3, "SO20240601".to_string(), |n| {
            calls += 1;
            async move { if n < 3 { Err(taken(n)) } else { Ok(n) } }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_numbering_conflict() {
        let mut calls = 0;
        let result: Result<(), _> = retry_on_taken_number(2, "RI20240601".to_string(), |n| {
            calls += 1;
            async move { Err(taken(n)) }
        })
        .await;

        assert!(matches!(
            result,
            Err(PostingError::NumberingConflict { ref scan_key, attempts: 2 }) if scan_key == "RI20240601"
        ));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_other_failures() {
        let mut calls = 0;
        let result: Result<(), _> = retry_on_taken_number(3, "SO20240601".to_string(), |_| {
            calls += 1;
            async { Err(AttemptError::Failed(PostingError::Persistence("down".into()))) }
        })
        .await;

        assert!(matches!(result, Err(PostingError::Persistence(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_max_attempts_floor() {
        let repo = TransactionRepository::new(DatabaseConnection::Disconnected).with_max_attempts(0);
        assert_eq!(repo.max_attempts, 1);
    }
}
