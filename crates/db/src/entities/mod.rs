//! `SeaORM` entity definitions.

pub mod accounts_payable;
pub mod accounts_receivable;
pub mod inventories;
pub mod prices;
pub mod sea_orm_active_enums;
pub mod transaction_items;
pub mod transactions;
