//! `SeaORM` active enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use stockbook_core::posting::{DocumentKind, ItemType as LineItemType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TransactionType {
    #[sea_orm(string_value = "cash_sales")]
    CashSales,
    #[sea_orm(string_value = "credit_sales")]
    CreditSales,
    #[sea_orm(string_value = "goods_purchase")]
    GoodsPurchase,
}

impl From<DocumentKind> for TransactionType {
    fn from(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::CashSales => Self::CashSales,
            DocumentKind::CreditSales => Self::CreditSales,
            DocumentKind::GoodsPurchase => Self::GoodsPurchase,
        }
    }
}

impl From<TransactionType> for DocumentKind {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::CashSales => Self::CashSales,
            TransactionType::CreditSales => Self::CreditSales,
            TransactionType::GoodsPurchase => Self::GoodsPurchase,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ItemType {
    #[sea_orm(string_value = "inventory")]
    Inventory,
    #[sea_orm(string_value = "ar")]
    Ar,
    #[sea_orm(string_value = "ap")]
    Ap,
}

impl From<LineItemType> for ItemType {
    fn from(value: LineItemType) -> Self {
        match value {
            LineItemType::Inventory => Self::Inventory,
            LineItemType::Ar => Self::Ar,
            LineItemType::Ap => Self::Ap,
        }
    }
}

impl From<ItemType> for LineItemType {
    fn from(value: ItemType) -> Self {
        match value {
            ItemType::Inventory => Self::Inventory,
            ItemType::Ar => Self::Ar,
            ItemType::Ap => Self::Ap,
        }
    }
}
