//! Integration tests for the document writer.
//!
//! Runs against an in-memory SQLite database migrated with the real
//! `Migrator`. The pool holds a single connection so every test sees one
//! database.

#![allow(clippy::too_many_lines)]

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, Set,
};

use stockbook_core::posting::{
    CreatePostingInput, DocumentKind, ItemType, PostingError, RawLineInput, UpdatePostingInput,
};
use stockbook_core::projection::{CachedView, ListFilter, ViewInvalidator};
use stockbook_db::{
    entities::{sea_orm_active_enums::TransactionType, transaction_items, transactions},
    migration::{Migrator, MigratorTrait},
    repositories::{
        CounterpartyRepository, CreateCounterpartyInput, CreateInventoryInput, CreatePriceInput,
        InventoryRepository, InventoryWithPrices, Side, TransactionRepository,
    },
};
use stockbook_shared::types::{CounterpartyId, InventoryId};

/// Test data shared by most scenarios.
struct Fixture {
    db: DatabaseConnection,
    repo: TransactionRepository,
    customer: CounterpartyId,
    supplier: CounterpartyId,
    sugar: InventoryWithPrices,
}

async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to connect to in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

async fn setup() -> Fixture {
    let db = setup_db().await;
    let counterparties = CounterpartyRepository::new(db.clone());

    let customer = counterparties
        .create(
            Side::Receivable,
            CreateCounterpartyInput {
                name: "Toko Maju".to_string(),
                ..CreateCounterpartyInput::default()
            },
        )
        .await
        .expect("Failed to create customer");

    let supplier = counterparties
        .create(
            Side::Payable,
            CreateCounterpartyInput {
                name: "CV Sumber Rejeki".to_string(),
                ..CreateCounterpartyInput::default()
            },
        )
        .await
        .expect("Failed to create supplier");

    let sugar = InventoryRepository::new(db.clone())
        .create(CreateInventoryInput {
            code: "8991001".to_string(),
            name: "Sugar 1kg".to_string(),
            remark: None,
            base_unit: "pcs".to_string(),
            base_price: dec!(50),
            extra_units: vec![CreatePriceInput {
                code: "8991001-BOX".to_string(),
                unit: "box".to_string(),
                quantity: dec!(12),
                price: dec!(500),
            }],
        })
        .await
        .expect("Failed to create inventory");

    Fixture {
        repo: TransactionRepository::new(db.clone()),
        db,
        customer: customer.id,
        supplier: supplier.id,
        sugar,
    }
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

fn line(inventory: InventoryId, pack_count: Decimal, unit_price: Decimal) -> RawLineInput {
    RawLineInput {
        inventory_id: Some(inventory),
        price_code: None,
        unit: Some("pcs".to_string()),
        pack_size: Some(Decimal::ONE),
        pack_count: Some(pack_count),
        unit_price: Some(unit_price),
    }
}

fn sale(fx: &Fixture, date: NaiveDate, pack_count: Decimal) -> CreatePostingInput {
    CreatePostingInput {
        kind: DocumentKind::CreditSales,
        date,
        counterparty_id: Some(fx.customer),
        lines: vec![line(fx.sugar.id(), pack_count, dec!(50))],
        remark: None,
    }
}

fn edit(fx: &Fixture, document_number: &str, pack_count: Decimal) -> UpdatePostingInput {
    UpdatePostingInput {
        document_number: document_number.to_string(),
        date: june(1),
        counterparty_id: Some(fx.customer),
        lines: vec![line(fx.sugar.id(), pack_count, dec!(50))],
        new_document_number: None,
        remark: None,
    }
}

async fn all_items(db: &DatabaseConnection) -> Vec<transaction_items::Model> {
    transaction_items::Entity::find()
        .all(db)
        .await
        .expect("Failed to load items")
}

async fn header_count(db: &DatabaseConnection) -> usize {
    transactions::Entity::find()
        .all(db)
        .await
        .expect("Failed to load headers")
        .len()
}

async fn insert_header(db: &DatabaseConnection, document_number: &str) {
    let now = Utc::now().into();
    transactions::ActiveModel {
        id: Set(uuid::Uuid::now_v7()),
        document_number: Set(document_number.to_string()),
        transaction_type: Set(TransactionType::CreditSales),
        transaction_date: Set(june(1)),
        remark: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("Failed to insert header");
}

#[derive(Default)]
struct RecordingInvalidator {
    seen: Mutex<Vec<CachedView>>,
}

impl ViewInvalidator for RecordingInvalidator {
    fn invalidate(&self, views: &[CachedView]) {
        self.seen.lock().unwrap().extend_from_slice(views);
    }
}

// ============================================================================
// Create flow
// ============================================================================

#[tokio::test]
async fn test_first_credit_sale_of_the_day() {
    let fx = setup().await;

    let created = fx
        .repo
        .create_transaction(sale(&fx, june(1), dec!(3)))
        .await
        .expect("Failed to create transaction");

    assert_eq!(created.document_number, "SO20240601001");
    assert_eq!(created.line_count, 2);
    assert!(created.totals.is_balanced);

    let view = fx
        .repo
        .get_transaction("SO20240601001")
        .await
        .expect("Failed to read transaction");

    assert_eq!(view.kind, DocumentKind::CreditSales);
    assert_eq!(view.counterparty_id, Some(fx.customer));
    assert_eq!(view.counterparty_name.as_deref(), Some("Toko Maju"));
    assert_eq!(view.items.len(), 2);

    let inventory_line = &view.items[0];
    assert_eq!(inventory_line.item_type, ItemType::Inventory);
    assert_eq!(inventory_line.line_no, 1);
    assert_eq!(inventory_line.credit, dec!(150));
    assert_eq!(inventory_line.debit, Decimal::ZERO);
    assert_eq!(inventory_line.quantity, Some(dec!(3)));
    assert_eq!(inventory_line.inventory_name.as_deref(), Some("Sugar 1kg"));

    let ar_line = &view.items[1];
    assert_eq!(ar_line.item_type, ItemType::Ar);
    assert_eq!(ar_line.line_no, 2);
    assert_eq!(ar_line.debit, dec!(150));
    assert_eq!(ar_line.credit, Decimal::ZERO);
}

#[tokio::test]
async fn test_numbers_increase_within_a_day() {
    let fx = setup().await;

    let first = fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();
    let second = fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();
    let third = fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();

    assert_eq!(first.document_number, "SO20240601001");
    assert_eq!(second.document_number, "SO20240601002");
    assert_eq!(third.document_number, "SO20240601003");
}

#[tokio::test]
async fn test_sequence_is_scoped_by_prefix_and_date() {
    let fx = setup().await;

    fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();
    let next_day = fx.repo.create_transaction(sale(&fx, june(2), dec!(1))).await.unwrap();
    assert_eq!(next_day.document_number, "SO20240602001");

    let purchase = fx
        .repo
        .create_transaction(CreatePostingInput {
            kind: DocumentKind::GoodsPurchase,
            date: june(1),
            counterparty_id: Some(fx.supplier),
            lines: vec![line(fx.sugar.id(), dec!(10), dec!(40))],
            remark: Some("restock".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(purchase.document_number, "RI20240601001");

    let view = fx.repo.get_transaction("RI20240601001").await.unwrap();
    assert_eq!(view.items[0].debit, dec!(400));
    assert_eq!(view.items[1].item_type, ItemType::Ap);
    assert_eq!(view.items[1].credit, dec!(400));
    assert_eq!(view.counterparty_name.as_deref(), Some("CV Sumber Rejeki"));
    assert_eq!(view.remark.as_deref(), Some("restock"));
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_numbers() {
    let fx = setup().await;

    let results = join_all((0..5).map(|_| fx.repo.create_transaction(sale(&fx, june(1), dec!(1))))).await;

    let mut numbers: Vec<String> = results
        .into_iter()
        .map(|r| r.expect("Failed to create transaction").document_number)
        .collect();
    numbers.sort();

    assert_eq!(
        numbers,
        vec![
            "SO20240601001",
            "SO20240601002",
            "SO20240601003",
            "SO20240601004",
            "SO20240601005",
        ]
    );
}

#[tokio::test]
async fn test_taken_number_exhausts_retry_budget() {
    let fx = setup().await;

    // Makes "XSO20240601001" collide with "SO20240601001" on insert while
    // staying invisible to the allocator's prefix scan, so every attempt
    // is rejected by a real unique violation.
    fx.db
        .execute_unprepared(
            "CREATE UNIQUE INDEX idx_claimed_numbers ON transactions (ltrim(document_number, 'X'))",
        )
        .await
        .unwrap();
    insert_header(&fx.db, "XSO20240601001").await;

    let repo = fx.repo.clone().with_max_attempts(2);
    let result = repo.create_transaction(sale(&fx, june(1), dec!(1))).await;

    assert!(matches!(
        result,
        Err(PostingError::NumberingConflict { ref scan_key, attempts: 2 }) if scan_key == "SO20240601"
    ));
    assert_eq!(header_count(&fx.db).await, 1);
    assert!(all_items(&fx.db).await.is_empty());

    // Other days are unaffected.
    let created = repo.create_transaction(sale(&fx, june(2), dec!(1))).await.unwrap();
    assert_eq!(created.document_number, "SO20240602001");
}

#[tokio::test]
async fn test_sequence_exhausted_after_999() {
    let fx = setup().await;

    insert_header(&fx.db, "SO20240601999").await;

    let result = fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await;
    assert!(matches!(result, Err(PostingError::SequenceExhausted { .. })));
    assert_eq!(header_count(&fx.db).await, 1);
}

#[tokio::test]
async fn test_validation_failures_write_nothing() {
    let fx = setup().await;

    let mut missing_counterparty = sale(&fx, june(1), dec!(1));
    missing_counterparty.counterparty_id = None;
    let result = fx.repo.create_transaction(missing_counterparty).await;
    assert!(matches!(result, Err(PostingError::MissingCounterparty)));

    let mut with_gap = sale(&fx, june(1), dec!(1));
    with_gap.lines.push(RawLineInput::default());
    let result = fx.repo.create_transaction(with_gap).await;
    assert!(matches!(result, Err(PostingError::BlankLine { row: 2 })));

    let mut negative_price = sale(&fx, june(1), dec!(1));
    negative_price.lines[0].unit_price = Some(dec!(-1));
    let result = fx.repo.create_transaction(negative_price).await;
    assert!(matches!(result, Err(PostingError::InvalidLine { row: 1, .. })));

    assert_eq!(header_count(&fx.db).await, 0);
    assert!(all_items(&fx.db).await.is_empty());
}

#[tokio::test]
async fn test_failed_balancing_line_rolls_back_create() {
    let fx = setup().await;

    // Inventory lines insert fine; the AR line references no customer.
    let mut input = sale(&fx, june(1), dec!(2));
    input.lines.push(line(fx.sugar.id(), dec!(1), dec!(50)));
    input.counterparty_id = Some(CounterpartyId::new());

    let result = fx.repo.create_transaction(input).await;

    assert!(matches!(result, Err(PostingError::Persistence(_))));
    assert_eq!(header_count(&fx.db).await, 0);
    assert!(all_items(&fx.db).await.is_empty());

    // The number was never consumed.
    let created = fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();
    assert_eq!(created.document_number, "SO20240601001");
}

// ============================================================================
// Edit flow
// ============================================================================

#[tokio::test]
async fn test_edit_replaces_every_line() {
    let fx = setup().await;
    fx.repo.create_transaction(sale(&fx, june(1), dec!(3))).await.unwrap();
    let before: Vec<_> = all_items(&fx.db).await.into_iter().map(|i| i.id).collect();

    let number = fx
        .repo
        .update_transaction(edit(&fx, "SO20240601001", dec!(5)))
        .await
        .expect("Failed to update transaction");
    assert_eq!(number, "SO20240601001");

    let items = all_items(&fx.db).await;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| !before.contains(&i.id)));

    let view = fx.repo.get_transaction("SO20240601001").await.unwrap();
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.items[0].item_type, ItemType::Inventory);
    assert_eq!(view.items[0].credit, dec!(250));
    assert_eq!(view.items[1].item_type, ItemType::Ar);
    assert_eq!(view.items[1].debit, dec!(250));
}

#[tokio::test]
async fn test_concurrent_edits_leave_one_posting() {
    let fx = setup().await;
    fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();

    let results = join_all([dec!(2), dec!(4)].map(|pack_count| {
        fx.repo.update_transaction(edit(&fx, "SO20240601001", pack_count))
    }))
    .await;
    assert!(results.iter().all(Result::is_ok));

    let mut items = all_items(&fx.db).await;
    items.sort_by_key(|i| i.line_no);
    assert_eq!(items.len(), 2);
    assert_eq!(items.iter().map(|i| i.line_no).collect::<Vec<_>>(), vec![1, 2]);

    let view = fx.repo.get_transaction("SO20240601001").await.unwrap();
    let ar_lines = view.items.iter().filter(|i| i.item_type == ItemType::Ar).count();
    assert_eq!(ar_lines, 1);
    assert_eq!(view.items[1].debit, view.items[0].credit);
}

#[tokio::test]
async fn test_repeated_edit_is_idempotent() {
    let fx = setup().await;
    fx.repo.create_transaction(sale(&fx, june(1), dec!(3))).await.unwrap();

    fx.repo.update_transaction(edit(&fx, "SO20240601001", dec!(4))).await.unwrap();
    let once = fx.repo.get_transaction("SO20240601001").await.unwrap();

    fx.repo.update_transaction(edit(&fx, "SO20240601001", dec!(4))).await.unwrap();
    let twice = fx.repo.get_transaction("SO20240601001").await.unwrap();

    assert_eq!(once.items.len(), twice.items.len());
    for (a, b) in once.items.iter().zip(&twice.items) {
        assert_eq!(a.item_type, b.item_type);
        assert_eq!(a.debit, b.debit);
        assert_eq!(a.credit, b.credit);
        assert_eq!(a.quantity, b.quantity);
    }
    assert_eq!(all_items(&fx.db).await.len(), 2);
}

#[tokio::test]
async fn test_failed_edit_keeps_prior_posting() {
    let fx = setup().await;
    fx.repo.create_transaction(sale(&fx, june(1), dec!(3))).await.unwrap();
    let before = fx.repo.get_transaction("SO20240601001").await.unwrap();

    let mut input = edit(&fx, "SO20240601001", dec!(9));
    input.counterparty_id = Some(CounterpartyId::new());
    input.date = june(5);

    let result = fx.repo.update_transaction(input).await;
    assert!(matches!(result, Err(PostingError::Persistence(_))));

    let after = fx.repo.get_transaction("SO20240601001").await.unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_edit_of_missing_document() {
    let fx = setup().await;

    let result = fx.repo.update_transaction(edit(&fx, "SO20240601042", dec!(1))).await;
    assert!(matches!(
        result,
        Err(PostingError::TransactionNotFound(ref number)) if number == "SO20240601042"
    ));

    let result = fx.repo.get_transaction("SO20240601042").await;
    assert!(matches!(result, Err(PostingError::TransactionNotFound(_))));
}

#[tokio::test]
async fn test_edit_keeps_document_type_and_updates_header() {
    let fx = setup().await;
    fx.repo.create_transaction(sale(&fx, june(1), dec!(3))).await.unwrap();

    let mut input = edit(&fx, "SO20240601001", dec!(1));
    input.date = june(3);
    input.remark = Some("re-dated".to_string());
    fx.repo.update_transaction(input).await.unwrap();

    let view = fx.repo.get_transaction("SO20240601001").await.unwrap();
    assert_eq!(view.kind, DocumentKind::CreditSales);
    assert_eq!(view.date, june(3));
    assert_eq!(view.remark.as_deref(), Some("re-dated"));
}

#[tokio::test]
async fn test_edit_renumbers_document() {
    let fx = setup().await;
    fx.repo.create_transaction(sale(&fx, june(1), dec!(3))).await.unwrap();
    fx.repo.create_transaction(sale(&fx, june(1), dec!(3))).await.unwrap();

    let mut malformed = edit(&fx, "SO20240601001", dec!(3));
    malformed.new_document_number = Some("SO-1".to_string());
    let result = fx.repo.update_transaction(malformed).await;
    assert!(matches!(result, Err(PostingError::InvalidDocumentNumber(_))));

    let mut taken = edit(&fx, "SO20240601001", dec!(3));
    taken.new_document_number = Some("SO20240601002".to_string());
    let result = fx.repo.update_transaction(taken).await;
    assert!(matches!(
        result,
        Err(PostingError::DuplicateDocumentNumber(ref number)) if number == "SO20240601002"
    ));
    assert_eq!(all_items(&fx.db).await.len(), 4);

    let mut renamed = edit(&fx, "SO20240601001", dec!(3));
    renamed.new_document_number = Some("SO20240601010".to_string());
    let number = fx.repo.update_transaction(renamed).await.unwrap();
    assert_eq!(number, "SO20240601010");

    assert!(fx.repo.get_transaction("SO20240601001").await.is_err());
    assert!(fx.repo.get_transaction("SO20240601010").await.is_ok());

    let next = fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();
    assert_eq!(next.document_number, "SO20240601011");
}

// ============================================================================
// Invalidation and reads
// ============================================================================

#[tokio::test]
async fn test_writes_notify_invalidator() {
    let fx = setup().await;
    let recorder = Arc::new(RecordingInvalidator::default());
    let repo = fx.repo.clone().with_invalidator(recorder.clone());

    repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();

    let mut renamed = edit(&fx, "SO20240601001", dec!(2));
    renamed.new_document_number = Some("SO20240601005".to_string());
    repo.update_transaction(renamed).await.unwrap();

    let seen = recorder.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            CachedView::List(DocumentKind::CreditSales),
            CachedView::Detail("SO20240601001".to_string()),
            CachedView::List(DocumentKind::CreditSales),
            CachedView::Detail("SO20240601001".to_string()),
            CachedView::Detail("SO20240601005".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failed_writes_do_not_notify() {
    let fx = setup().await;
    let recorder = Arc::new(RecordingInvalidator::default());
    let repo = fx.repo.clone().with_invalidator(recorder.clone());

    let mut input = sale(&fx, june(1), dec!(1));
    input.counterparty_id = None;
    assert!(repo.create_transaction(input).await.is_err());
    assert!(repo.update_transaction(edit(&fx, "SO20240601001", dec!(1))).await.is_err());

    assert!(recorder.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_projection_filters_and_orders() {
    let fx = setup().await;

    fx.repo.create_transaction(sale(&fx, june(2), dec!(2))).await.unwrap();
    fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();
    fx.repo
        .create_transaction(CreatePostingInput {
            kind: DocumentKind::GoodsPurchase,
            date: june(1),
            counterparty_id: Some(fx.supplier),
            lines: vec![line(fx.sugar.id(), dec!(10), dec!(40))],
            remark: None,
        })
        .await
        .unwrap();

    let sales = fx
        .repo
        .list_projection(&ListFilter::for_kind(DocumentKind::CreditSales))
        .await
        .unwrap();
    let numbers: Vec<&str> = sales.rows.iter().map(|r| r.document_number.as_str()).collect();
    assert_eq!(numbers, vec!["SO20240601001", "SO20240602001"]);
    assert_eq!(sales.rows[0].amount, dec!(50));
    assert_eq!(sales.rows[0].counterparty_name, "Toko Maju");
    assert_eq!(sales.rows[0].children.len(), 1);
    assert_eq!(sales.rows[0].children[0].inventory_name, "Sugar 1kg");
    assert_eq!(sales.rows[0].children[0].quantity, "1 pcs (1)");
    assert_eq!(sales.total_amount, dec!(150));

    let first_of_june = ListFilter {
        date_from: Some(june(1)),
        date_to: Some(june(1)),
        ..ListFilter::default()
    };
    let everything = fx.repo.list_projection(&first_of_june).await.unwrap();
    let numbers: Vec<&str> = everything
        .rows
        .iter()
        .map(|r| r.document_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["RI20240601001", "SO20240601001"]);
    assert_eq!(everything.rows[0].amount, dec!(400));
}

#[tokio::test]
async fn test_list_of_empty_store() {
    let fx = setup().await;

    let projection = fx.repo.list_projection(&ListFilter::default()).await.unwrap();
    assert_eq!(projection.document_count(), 0);
    assert_eq!(projection.total_amount, Decimal::ZERO);
}

// ============================================================================
// Master records
// ============================================================================

#[tokio::test]
async fn test_inventory_default_unit_shares_code() {
    let fx = setup().await;
    let inventories = InventoryRepository::new(fx.db.clone());

    let found = inventories
        .find_by_id(fx.sugar.id())
        .await
        .unwrap()
        .expect("inventory should exist");
    assert_eq!(found.prices.len(), 2);
    assert_eq!(found.prices[0].code, "8991001");
    assert_eq!(found.prices[0].quantity, Decimal::ONE);
    assert_eq!(found.default_price().map(|p| p.price), Some(dec!(50)));

    let boxed = inventories
        .find_price_by_code("8991001-BOX")
        .await
        .unwrap()
        .expect("price should exist");
    assert_eq!(boxed.unit, "box");
    assert_eq!(boxed.quantity, dec!(12));

    assert!(inventories.find_by_id(InventoryId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_counterparties_are_split_by_side() {
    let fx = setup().await;
    let counterparties = CounterpartyRepository::new(fx.db.clone());

    let customers = counterparties.list(Side::Receivable).await.unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].id, fx.customer);

    let found = counterparties
        .find_by_id(Side::Payable, fx.supplier)
        .await
        .unwrap()
        .expect("supplier should exist");
    assert_eq!(found.side, Side::Payable);

    assert!(counterparties
        .find_by_id(Side::Payable, fx.customer)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_items_cascade_with_header() {
    let fx = setup().await;
    let created = fx.repo.create_transaction(sale(&fx, june(1), dec!(1))).await.unwrap();

    transactions::Entity::delete_many()
        .filter(transactions::Column::Id.eq(created.id.into_inner()))
        .exec(&fx.db)
        .await
        .unwrap();

    assert!(all_items(&fx.db).await.is_empty());
}
