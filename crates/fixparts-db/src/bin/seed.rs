//! # Seed Data Generator
//!
//! Loads a small auto-parts catalogue for development. Every record goes
//! through the managers, so the seeded data obeys the same integrity rules
//! as anything written later.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by FIXPARTS_DATABASE_PATH (default ./fixparts.db)
//! cargo run -p fixparts-db --bin seed
//!
//! # Specify database path
//! cargo run -p fixparts-db --bin seed -- --db ./data/fixparts.db
//! ```
//!
//! ## Generated Data
//! - Category tree: Engine > {Filters, Ignition}, Brakes > {Pads, Rotors}
//! - Suppliers with contact details
//! - Items per category, barcodes generated when absent
//! - Two makes with models and submodels, plus fitment links
//! - A handful of purchases and sales

use std::env;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fixparts_core::ledger::{PurchaseDraft, SaleDraft};
use fixparts_core::money::Money;
use fixparts_core::types::{CategoryDraft, ItemDraft, ItemFilter, SupplierDraft};
use fixparts_core::vehicle::{MakeDraft, ModelDraft, SubmodelDraft};
use fixparts_db::{Database, DbConfig};
use fixparts_service::{ServiceConfig, Services};

/// (parent, children)
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Engine", &["Filters", "Ignition"]),
    ("Brakes", &["Pads", "Rotors"]),
];

/// (name, contact, email)
const SUPPLIERS: &[(&str, &str, &str)] = &[
    ("Bosch Distribution", "Anke Weber", "orders@bosch.example"),
    ("Denso Parts", "Kenji Sato", "sales@denso.example"),
];

/// (category, supplier index, part number, description, buy cents, sell cents, stock, minimum)
const ITEMS: &[(&str, usize, &str, &str, i64, i64, i64, i64)] = &[
    ("Filters", 0, "OF-1001", "Oil filter, spin-on", 350, 899, 40, 10),
    ("Filters", 0, "AF-2040", "Air filter element", 620, 1499, 6, 8),
    ("Ignition", 1, "SP-K20", "Iridium spark plug", 410, 1150, 120, 24),
    ("Ignition", 1, "IC-330", "Ignition coil", 2800, 6499, 3, 4),
    ("Pads", 0, "BP-100", "Front brake pad set", 2000, 4999, 18, 6),
    ("Rotors", 1, "BR-280", "Vented brake rotor 280mm", 3100, 7450, 2, 4),
];

/// (make, country, model, submodel, year from, year to, engine, displacement, fuel, transmission, body)
type SubmodelRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i32,
    Option<i32>,
    &'static str,
    f64,
    &'static str,
    &'static str,
    &'static str,
);

const VEHICLES: &[SubmodelRow] = &[
    ("Toyota", "Japan", "Corolla", "1.6 GL", 2002, Some(2007), "I4", 1.6, "Petrol", "Manual", "Sedan"),
    ("Toyota", "Japan", "Corolla", "1.8 GLX", 2008, None, "I4", 1.8, "Petrol", "Automatic", "Sedan"),
    ("Toyota", "Japan", "Hilux", "2.5 D-4D", 2005, Some(2015), "I4 Diesel", 2.5, "Diesel", "Manual", "Pickup"),
    ("Honda", "Japan", "Civic", "1.5 VTi", 2016, None, "I4 Turbo", 1.5, "Petrol", "CVT", "Hatchback"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config = DbConfig::from_env()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("FixParts Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $FIXPARTS_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    println!("🌱 FixParts Seed Data Generator");
    println!("==============================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config).await?;
    let services = Services::new(db.stores(), ServiceConfig::from_env()?);
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = services.items.list(&ItemFilter::default()).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} items", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Categories
    let mut category_ids = Vec::new();
    for (parent, children) in CATEGORIES {
        let root = services.categories.create(&CategoryDraft::new(*parent)).await?;
        for child in children.iter() {
            let node = services
                .categories
                .create(&CategoryDraft::new(*child).with_parent(root.id))
                .await?;
            category_ids.push((*child, node.id));
        }
    }
    println!("✓ Created {} category branches", category_ids.len());

    // Suppliers
    let mut supplier_ids = Vec::new();
    for (name, contact, email) in SUPPLIERS {
        let mut draft = SupplierDraft::new(*name);
        draft.contact_person = Some(contact.to_string());
        draft.email = Some(email.to_string());
        supplier_ids.push(services.suppliers.create(&draft).await?.id);
    }
    println!("✓ Created {} suppliers", supplier_ids.len());

    // Items
    let mut items = Vec::new();
    for (category, supplier, part, description, buy, sell, stock, minimum) in ITEMS {
        let mut draft = ItemDraft::new(
            *part,
            *description,
            Money::from_cents(*buy),
            Money::from_cents(*sell),
        );
        draft.category_id = category_ids
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, id)| *id);
        draft.supplier_id = supplier_ids.get(*supplier).copied();
        draft.current_stock = *stock;
        draft.minimum_stock = *minimum;
        items.push(services.items.create(&draft).await?);
    }
    println!("✓ Created {} items", items.len());

    // Vehicles
    let mut submodel_ids = Vec::new();
    for (make, country, model, submodel, from, to, engine, displacement, fuel, gearbox, body) in
        VEHICLES
    {
        let make_id = match services
            .vehicles
            .list_makes()
            .await?
            .into_iter()
            .find(|m| m.name == *make)
        {
            Some(existing) => existing.id,
            None => {
                let mut draft = MakeDraft::new(*make);
                draft.country = Some(country.to_string());
                services.vehicles.create_make(&draft).await?.id
            }
        };

        let model_id = match services
            .vehicles
            .models_for_make(make_id)
            .await?
            .into_iter()
            .find(|m| m.name == *model)
        {
            Some(existing) => existing.id,
            None => {
                services
                    .vehicles
                    .create_model(&ModelDraft::new(make_id, *model))
                    .await?
                    .id
            }
        };

        let created = services
            .vehicles
            .create_submodel(&SubmodelDraft {
                model_id,
                name: submodel.to_string(),
                year_from: *from,
                year_to: *to,
                engine_type: engine.to_string(),
                engine_displacement: *displacement,
                fuel_type: fuel.to_string(),
                transmission_type: gearbox.to_string(),
                body_type: body.to_string(),
            })
            .await?;
        submodel_ids.push(created.id);
    }
    println!("✓ Created {} submodels", submodel_ids.len());

    // Fitment: every item fits the petrol Corollas; spark plugs skip the diesel Hilux.
    let mut links = 0;
    for item in &items {
        for (index, submodel_id) in submodel_ids.iter().enumerate() {
            if index == 2 && item.part_number.starts_with("SP-") {
                continue;
            }
            if index == 3 && !item.part_number.starts_with("BP-") {
                continue;
            }
            services
                .compatibility
                .add(item.id, *submodel_id, None)
                .await?;
            links += 1;
        }
    }
    println!("✓ Created {} compatibility links", links);

    // Ledger
    let now = Utc::now();
    for (index, item) in items.iter().enumerate() {
        let Some(supplier_id) = item.supplier_id else {
            continue;
        };

        let mut purchase = PurchaseDraft::new(supplier_id, item.id, 10, item.buy_price);
        purchase.invoice_number = Some(format!("INV-{:04}", index + 1));
        purchase.date = Some(now - Duration::days(30));
        services.purchases.create(&purchase).await?;

        let mut sale = SaleDraft::new(item.id, 1 + (index as i64 % 3), item.sell_price);
        sale.transaction_number = Some(format!("TX-{:05}", index + 1));
        sale.customer_email = Some("walk-in@fixparts.example".to_string());
        sale.date = Some(now - Duration::days(index as i64));
        services.sales.create(&sale).await?;
    }
    println!("✓ Recorded purchases and sales");

    let summary = services.dashboard.summary().await?;
    let top = services.dashboard.top_sellers().await?;
    let tree = services.categories.get_tree().await?;

    println!();
    println!("✓ Seeded in {:?}", start.elapsed());
    println!("  Root categories: {}", tree.len());
    println!("  Active items:    {}", summary.inventory_count);
    println!("  Low stock items: {}", summary.low_stock_count);
    println!("  Fitted vehicles: {}", summary.vehicle_count);
    println!("  Sales today:     {}", summary.today_sales);
    if let Some(best) = top.first() {
        println!("  Top seller:      {} ({} sales, {})", best.part_number, best.sales, best.revenue);
    }

    info!(items = items.len(), links, "Seed complete");
    db.close().await;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fixparts=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
