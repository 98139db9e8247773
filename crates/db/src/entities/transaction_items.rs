//! `SeaORM` Entity for transaction_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ItemType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub line_no: i32,
    pub item_type: ItemType,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub debit_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub credit_amount: Decimal,
    pub inventory_id: Option<Uuid>,
    pub inventory_barcode: Option<String>,
    pub inventory_unit: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub inventory_unit_quantity: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub unit_quantity: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub inventory_price_per_unit: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub quantity: Option<Decimal>,
    pub account_receivable_id: Option<Uuid>,
    pub account_payable_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_delete = "Cascade"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::inventories::Entity",
        from = "Column::InventoryId",
        to = "super::inventories::Column::Id"
    )]
    Inventories,
    #[sea_orm(
        belongs_to = "super::accounts_receivable::Entity",
        from = "Column::AccountReceivableId",
        to = "super::accounts_receivable::Column::Id"
    )]
    AccountsReceivable,
    #[sea_orm(
        belongs_to = "super::accounts_payable::Entity",
        from = "Column::AccountPayableId",
        to = "super::accounts_payable::Column::Id"
    )]
    AccountsPayable,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::inventories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventories.def()
    }
}

impl Related<super::accounts_receivable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountsReceivable.def()
    }
}

impl Related<super::accounts_payable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountsPayable.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
