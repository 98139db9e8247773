//! Initial database migration.
//!
//! Creates the master record tables (customers, suppliers, inventories and
//! their sale-unit prices) and the document tables. Built with the schema
//! builder so the same migration runs on PostgreSQL and SQLite.

use sea_orm_migration::prelude::*;
use stockbook_core::posting::{AMOUNT_PRECISION, AMOUNT_SCALE};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: COUNTERPARTIES
        // ============================================================
        manager
            .create_table(counterparty_table(AccountsReceivable::Table))
            .await?;
        manager
            .create_table(counterparty_table(AccountsPayable::Table))
            .await?;

        // ============================================================
        // PART 2: INVENTORY
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Inventories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Inventories::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Inventories::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Inventories::Name).string().not_null())
                    .col(ColumnDef::new(Inventories::Remark).text().null())
                    .col(timestamp_column(Inventories::CreatedAt))
                    .col(timestamp_column(Inventories::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Prices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Prices::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Prices::InventoryId).uuid().not_null())
                    .col(
                        ColumnDef::new(Prices::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Prices::Unit).string_len(32).not_null())
                    .col(amount_column(Prices::Quantity).not_null().to_owned())
                    .col(amount_column(Prices::Price).not_null().to_owned())
                    .col(timestamp_column(Prices::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prices_inventory_id")
                            .from(Prices::Table, Prices::InventoryId)
                            .to(Inventories::Table, Inventories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: TRANSACTIONS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Transactions::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Transactions::DocumentNumber)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::TransactionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::TransactionDate).date().not_null())
                    .col(ColumnDef::new(Transactions::Remark).text().null())
                    .col(timestamp_column(Transactions::CreatedAt))
                    .col(timestamp_column(Transactions::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Serializes concurrent creators racing for the same daily number.
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_document_number")
                    .table(Transactions::Table)
                    .col(Transactions::DocumentNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_type_date")
                    .table(Transactions::Table)
                    .col(Transactions::TransactionType)
                    .col(Transactions::TransactionDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TransactionItems::TransactionId).uuid().not_null())
                    .col(ColumnDef::new(TransactionItems::LineNo).integer().not_null())
                    .col(
                        ColumnDef::new(TransactionItems::ItemType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        amount_column(TransactionItems::DebitAmount)
                            .not_null()
                            .default(0)
                            .to_owned(),
                    )
                    .col(
                        amount_column(TransactionItems::CreditAmount)
                            .not_null()
                            .default(0)
                            .to_owned(),
                    )
                    .col(ColumnDef::new(TransactionItems::InventoryId).uuid().null())
                    .col(
                        ColumnDef::new(TransactionItems::InventoryBarcode)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(TransactionItems::InventoryUnit)
                            .string_len(32)
                            .null(),
                    )
                    .col(amount_column(TransactionItems::InventoryUnitQuantity).null().to_owned())
                    .col(amount_column(TransactionItems::UnitQuantity).null().to_owned())
                    .col(amount_column(TransactionItems::InventoryPricePerUnit).null().to_owned())
                    .col(amount_column(TransactionItems::Quantity).null().to_owned())
                    .col(
                        ColumnDef::new(TransactionItems::AccountReceivableId)
                            .uuid()
                            .null(),
                    )
                    .col(ColumnDef::new(TransactionItems::AccountPayableId).uuid().null())
                    .col(timestamp_column(TransactionItems::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_items_transaction_id")
                            .from(TransactionItems::Table, TransactionItems::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_items_inventory_id")
                            .from(TransactionItems::Table, TransactionItems::InventoryId)
                            .to(Inventories::Table, Inventories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_items_account_receivable_id")
                            .from(TransactionItems::Table, TransactionItems::AccountReceivableId)
                            .to(AccountsReceivable::Table, AccountsReceivable::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_items_account_payable_id")
                            .from(TransactionItems::Table, TransactionItems::AccountPayableId)
                            .to(AccountsPayable::Table, AccountsPayable::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transaction_items_transaction_line")
                    .table(TransactionItems::Table)
                    .col(TransactionItems::TransactionId)
                    .col(TransactionItems::LineNo)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransactionItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Prices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountsPayable::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccountsReceivable::Table).to_owned())
            .await
    }
}

/// Customers and suppliers share one shape.
fn counterparty_table<T: Iden + 'static>(table: T) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(ColumnDef::new(Counterparty::Id).uuid().not_null().primary_key())
        .col(ColumnDef::new(Counterparty::Name).string().not_null())
        .col(ColumnDef::new(Counterparty::Address).text().null())
        .col(ColumnDef::new(Counterparty::Phone).string_len(32).null())
        .col(ColumnDef::new(Counterparty::TaxId).string_len(32).null())
        .col(ColumnDef::new(Counterparty::Remark).text().null())
        .col(timestamp_column(Counterparty::CreatedAt))
        .col(timestamp_column(Counterparty::UpdatedAt))
        .to_owned()
}

fn timestamp_column<T: Iden + 'static>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .timestamp_with_time_zone()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

fn amount_column<T: Iden + 'static>(column: T) -> ColumnDef {
    ColumnDef::new(column)
        .decimal_len(AMOUNT_PRECISION, AMOUNT_SCALE)
        .to_owned()
}

#[derive(DeriveIden)]
enum Counterparty {
    Id,
    Name,
    Address,
    Phone,
    TaxId,
    Remark,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AccountsReceivable {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum AccountsPayable {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
    Code,
    Name,
    Remark,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Prices {
    Table,
    Id,
    InventoryId,
    Code,
    Unit,
    Quantity,
    Price,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    DocumentNumber,
    TransactionType,
    TransactionDate,
    Remark,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TransactionItems {
    Table,
    Id,
    TransactionId,
    LineNo,
    ItemType,
    DebitAmount,
    CreditAmount,
    InventoryId,
    InventoryBarcode,
    InventoryUnit,
    InventoryUnitQuantity,
    UnitQuantity,
    InventoryPricePerUnit,
    Quantity,
    AccountReceivableId,
    AccountPayableId,
    CreatedAt,
}
