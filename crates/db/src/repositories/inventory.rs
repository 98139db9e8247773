//! Inventory repository for master records and their sale-unit prices.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use stockbook_shared::types::{InventoryId, PriceId};

use crate::entities::{inventories, prices};

/// Input for one extra sale unit of an inventory.
#[derive(Debug, Clone)]
pub struct CreatePriceInput {
    /// Barcode of the sale unit.
    pub code: String,
    /// Unit label, e.g. "box".
    pub unit: String,
    /// Items per sale unit.
    pub quantity: Decimal,
    /// Price of one sale unit.
    pub price: Decimal,
}

/// Input for creating an inventory record.
#[derive(Debug, Clone)]
pub struct CreateInventoryInput {
    /// Inventory code; also the code of the default sale unit.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Free-text remark.
    pub remark: Option<String>,
    /// Label of the default sale unit (one item per unit).
    pub base_unit: String,
    /// Price of the default sale unit.
    pub base_price: Decimal,
    /// Additional sale units.
    pub extra_units: Vec<CreatePriceInput>,
}

/// Inventory record with its sale units, default first.
#[derive(Debug, Clone)]
pub struct InventoryWithPrices {
    /// Inventory record.
    pub inventory: inventories::Model,
    /// Sale units.
    pub prices: Vec<prices::Model>,
}

impl InventoryWithPrices {
    /// Returns the typed id of the inventory.
    #[must_use]
    pub const fn id(&self) -> InventoryId {
        InventoryId::from_uuid(self.inventory.id)
    }

    /// Returns the default sale unit, the one sharing the inventory code.
    #[must_use]
    pub fn default_price(&self) -> Option<&prices::Model> {
        self.prices.iter().find(|p| p.code == self.inventory.code)
    }
}

/// Inventory repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    db: DatabaseConnection,
}

impl InventoryRepository {
    /// Creates a new inventory repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an inventory with its default sale unit and any extra units.
    ///
    /// # Errors
    ///
    /// Returns an error if a code is already used or the database insert fails.
    pub async fn create(&self, input: CreateInventoryInput) -> Result<InventoryWithPrices, DbErr> {
        let now = Utc::now().into();
        let inventory_id = InventoryId::new().into_inner();

        let txn = self.db.begin().await?;

        let inventory = inventories::ActiveModel {
            id: Set(inventory_id),
            code: Set(input.code.clone()),
            name: Set(input.name),
            remark: Set(input.remark),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let default_unit = CreatePriceInput {
            code: input.code,
            unit: input.base_unit,
            quantity: Decimal::ONE,
            price: input.base_price,
        };

        let mut created = Vec::with_capacity(input.extra_units.len() + 1);
        for unit in std::iter::once(default_unit).chain(input.extra_units) {
            let price = prices::ActiveModel {
                id: Set(PriceId::new().into_inner()),
                inventory_id: Set(inventory_id),
                code: Set(unit.code),
                unit: Set(unit.unit),
                quantity: Set(unit.quantity),
                price: Set(unit.price),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created.push(price);
        }

        txn.commit().await?;

        Ok(InventoryWithPrices {
            inventory,
            prices: created,
        })
    }

    /// Finds an inventory with its sale units by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: InventoryId) -> Result<Option<InventoryWithPrices>, DbErr> {
        let Some(inventory) = inventories::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut prices = prices::Entity::find()
            .filter(prices::Column::InventoryId.eq(inventory.id))
            .order_by_asc(prices::Column::Quantity)
            .all(&self.db)
            .await?;
        // Default unit first.
        prices.sort_by_key(|p| p.code != inventory.code);

        Ok(Some(InventoryWithPrices { inventory, prices }))
    }

    /// Finds a sale unit by its barcode.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_price_by_code(&self, code: &str) -> Result<Option<prices::Model>, DbErr> {
        prices::Entity::find()
            .filter(prices::Column::Code.eq(code))
            .one(&self.db)
            .await
    }
}
