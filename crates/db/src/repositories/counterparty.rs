//! Counterparty repository: customers (receivables) and suppliers (payables).

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set};
use serde::Serialize;
use stockbook_shared::types::CounterpartyId;

use crate::entities::{accounts_payable, accounts_receivable};

/// Which ledger a counterparty belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Customer, balanced by AR lines.
    Receivable,
    /// Supplier, balanced by AP lines.
    Payable,
}

/// Input for creating a customer or supplier.
#[derive(Debug, Clone, Default)]
pub struct CreateCounterpartyInput {
    /// Display name.
    pub name: String,
    /// Postal address.
    pub address: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Tax registration number.
    pub tax_id: Option<String>,
    /// Free-text remark.
    pub remark: Option<String>,
}

/// A customer or supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counterparty {
    /// Id referenced by balancing lines.
    pub id: CounterpartyId,
    /// Ledger side.
    pub side: Side,
    /// Display name.
    pub name: String,
    /// Postal address.
    pub address: Option<String>,
    /// Phone number.
    pub phone: Option<String>,
    /// Tax registration number.
    pub tax_id: Option<String>,
}

impl From<accounts_receivable::Model> for Counterparty {
    fn from(model: accounts_receivable::Model) -> Self {
        Self {
            id: CounterpartyId::from_uuid(model.id),
            side: Side::Receivable,
            name: model.name,
            address: model.address,
            phone: model.phone,
            tax_id: model.tax_id,
        }
    }
}

impl From<accounts_payable::Model> for Counterparty {
    fn from(model: accounts_payable::Model) -> Self {
        Self {
            id: CounterpartyId::from_uuid(model.id),
            side: Side::Payable,
            name: model.name,
            address: model.address,
            phone: model.phone,
            tax_id: model.tax_id,
        }
    }
}

/// Counterparty repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct CounterpartyRepository {
    db: DatabaseConnection,
}

impl CounterpartyRepository {
    /// Creates a new counterparty repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a customer or supplier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        side: Side,
        input: CreateCounterpartyInput,
    ) -> Result<Counterparty, DbErr> {
        let id = CounterpartyId::new().into_inner();
        let now = Utc::now().into();

        match side {
            Side::Receivable => {
                let customer = accounts_receivable::ActiveModel {
                    id: Set(id),
                    name: Set(input.name),
                    address: Set(input.address),
                    phone: Set(input.phone),
                    tax_id: Set(input.tax_id),
                    remark: Set(input.remark),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                customer.insert(&self.db).await.map(Counterparty::from)
            }
            Side::Payable => {
                let supplier = accounts_payable::ActiveModel {
                    id: Set(id),
                    name: Set(input.name),
                    address: Set(input.address),
                    phone: Set(input.phone),
                    tax_id: Set(input.tax_id),
                    remark: Set(input.remark),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                supplier.insert(&self.db).await.map(Counterparty::from)
            }
        }
    }

    /// Finds a customer or supplier by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        side: Side,
        id: CounterpartyId,
    ) -> Result<Option<Counterparty>, DbErr> {
        match side {
            Side::Receivable => Ok(accounts_receivable::Entity::find_by_id(id.into_inner())
                .one(&self.db)
                .await?
                .map(Counterparty::from)),
            Side::Payable => Ok(accounts_payable::Entity::find_by_id(id.into_inner())
                .one(&self.db)
                .await?
                .map(Counterparty::from)),
        }
    }

    /// Lists all customers or suppliers by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, side: Side) -> Result<Vec<Counterparty>, DbErr> {
        match side {
            Side::Receivable => Ok(accounts_receivable::Entity::find()
                .order_by_asc(accounts_receivable::Column::Name)
                .all(&self.db)
                .await?
                .into_iter()
                .map(Counterparty::from)
                .collect()),
            Side::Payable => Ok(accounts_payable::Entity::find()
                .order_by_asc(accounts_payable::Column::Name)
                .all(&self.db)
                .await?
                .into_iter()
                .map(Counterparty::from)
                .collect()),
        }
    }
}
