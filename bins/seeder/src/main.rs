//! Database seeder for Stockbook development and testing.
//!
//! Seeds customers, suppliers and inventories with their sale units, then
//! posts one purchase and one sale so list views have something to show.
//! Re-running skips records that already exist.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockbook_core::posting::{CreatePostingInput, DocumentKind, RawLineInput};
use stockbook_db::repositories::{
    CounterpartyRepository, CreateCounterpartyInput, CreateInventoryInput, CreatePriceInput,
    InventoryRepository, Side, TransactionRepository,
};
use stockbook_shared::types::{CounterpartyId, InventoryId};

/// Inventory seeds: code, name, base unit, base price, optional (box size, box price).
const INVENTORIES: &[(&str, &str, &str, Decimal, Option<(Decimal, Decimal)>)] = &[
    ("8991001", "Sugar 1kg", "pcs", dec!(16500), Some((dec!(12), dec!(190000)))),
    ("8991002", "Rice 5kg", "sack", dec!(72000), None),
    ("8991003", "Cooking Oil 2L", "btl", dec!(38000), Some((dec!(6), dec!(222000)))),
];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = stockbook_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let counterparties = CounterpartyRepository::new(db.clone());
    let inventories = InventoryRepository::new(db.clone());
    let transactions = TransactionRepository::new(db);

    println!("Seeding customers and suppliers...");
    let customer = seed_counterparty(&counterparties, Side::Receivable, "Toko Maju").await;
    let supplier = seed_counterparty(&counterparties, Side::Payable, "CV Sumber Rejeki").await;

    println!("Seeding inventories...");
    let mut seeded = Vec::with_capacity(INVENTORIES.len());
    for &(code, name, unit, price, pack) in INVENTORIES {
        if let Some(id) = seed_inventory(&inventories, code, name, unit, price, pack).await {
            seeded.push((id, unit, price));
        }
    }

    println!("Seeding sample documents...");
    let today = Utc::now().date_naive();
    for (kind, counterparty, margin) in [
        (DocumentKind::GoodsPurchase, supplier, dec!(0.9)),
        (DocumentKind::CreditSales, customer, Decimal::ONE),
    ] {
        let lines = seeded
            .iter()
            .map(|&(inventory_id, unit, price)| RawLineInput {
                inventory_id: Some(inventory_id),
                price_code: None,
                unit: Some(unit.to_string()),
                pack_size: Some(Decimal::ONE),
                pack_count: Some(dec!(10)),
                unit_price: Some((price * margin).round_dp(0)),
            })
            .collect();

        let input = CreatePostingInput {
            kind,
            date: today,
            counterparty_id: Some(counterparty),
            lines,
            remark: Some("seed".to_string()),
        };

        match transactions.create_transaction(input).await {
            Ok(created) => println!("  Posted {}", created.document_number),
            Err(e) => eprintln!("  Failed to post {kind}: {e}"),
        }
    }

    println!("Seeding complete!");
}

/// Returns the id of the named counterparty, creating it if missing.
async fn seed_counterparty(
    repo: &CounterpartyRepository,
    side: Side,
    name: &str,
) -> CounterpartyId {
    let existing = repo.list(side).await.expect("Failed to list counterparties");
    if let Some(found) = existing.into_iter().find(|c| c.name == name) {
        println!("  {name} already exists, skipping...");
        return found.id;
    }

    let created = repo
        .create(
            side,
            CreateCounterpartyInput {
                name: name.to_string(),
                ..CreateCounterpartyInput::default()
            },
        )
        .await
        .expect("Failed to insert counterparty");
    println!("  Created {name}");
    created.id
}

/// Returns the id of the inventory with `code`, creating it if missing.
async fn seed_inventory(
    repo: &InventoryRepository,
    code: &str,
    name: &str,
    unit: &str,
    price: Decimal,
    pack: Option<(Decimal, Decimal)>,
) -> Option<InventoryId> {
    match repo.find_price_by_code(code).await {
        Ok(Some(existing)) => {
            println!("  {name} already exists, skipping...");
            return Some(InventoryId::from_uuid(existing.inventory_id));
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("  Failed to look up {code}: {e}");
            return None;
        }
    }

    let extra_units = pack
        .map(|(quantity, pack_price)| CreatePriceInput {
            code: format!("{code}-BOX"),
            unit: "box".to_string(),
            quantity,
            price: pack_price,
        })
        .into_iter()
        .collect();

    match repo
        .create(CreateInventoryInput {
            code: code.to_string(),
            name: name.to_string(),
            remark: None,
            base_unit: unit.to_string(),
            base_price: price,
            extra_units,
        })
        .await
    {
        Ok(created) => {
            println!("  Created {name} ({} sale units)", created.prices.len());
            Some(created.id())
        }
        Err(e) => {
            eprintln!("  Failed to insert {name}: {e}");
            None
        }
    }
}
