//! Order service walkthrough
//!
//! This example demonstrates:
//! - Defining entities with foreign keys, many-valued relations and a version column
//! - Trusted vs validated create/update input
//! - Paginated listing with eager-loaded relations
//! - One-level relation expansion when serializing

use anyhow::Result;
use chrono::TimeZone;
use scaffold::prelude::*;
use serde_json::json;
use std::path::Path;

impl_entity!(
    Customer,
    "customer",
    {
        name: String,
        email: Option<String>,
    }
);

impl_entity!(
    Item,
    "item",
    {
        sku: String,
        price: Decimal,
    }
);

impl_entity!(
    Order,
    "order",
    {
        total: Decimal,
        placed_at: DateTime<Utc>,
        customer_id: Option<i64>,
        status: String,
        #[serde(default)]
        version: i64,
    },
    foreign_keys { customer: customer_id => "customer" },
    many_to_many { items => "item" through "order_items" },
    version = version
);

#[derive(Debug, Serialize, Validate)]
struct NewCustomer {
    #[validate(length(min = 1))]
    name: String,
    #[validate(email)]
    email: Option<String>,
}

#[derive(Debug, Serialize, Validate)]
struct NewItem {
    #[validate(length(min = 1))]
    sku: String,
    price: Decimal,
}

#[derive(Debug, Serialize, Validate)]
struct NewOrder {
    total: Decimal,
    placed_at: DateTime<Utc>,
    customer_id: Option<i64>,
    #[validate(length(min = 1))]
    status: String,
}

#[derive(Debug, Default, Serialize, Validate)]
struct OrderPatch {
    #[validate(length(min = 1))]
    status: Option<String>,
    total: Option<Decimal>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("🚀 Scaffold Order Service Example");
    println!("=================================\n");

    let config_path = Path::new("demos/order_service/scaffold.yaml");
    let config = if config_path.exists() {
        ScaffoldConfig::from_yaml_file(config_path)?
    } else {
        ScaffoldConfig::default()
    };
    println!("✅ Configuration loaded (datetime pattern {:?})\n", config.formats.datetime);

    let store = Arc::new(InMemoryStore::new());
    let customers: Crud<Customer, NewCustomer, NewCustomer, _> = Crud::new(store.clone());
    let items: Crud<Item, NewItem, NewItem, _> = Crud::new(store.clone());
    let orders: Crud<Order, NewOrder, OrderPatch, _> =
        Crud::new(store.clone()).with_config(&config);
    let serializer = Serializer::with_config(&config);

    // Validated input goes through its rules first
    let rejected = customers
        .create(Input::Validated(NewCustomer {
            name: String::new(),
            email: Some("nobody".to_string()),
        }))
        .await;
    if let Err(e) = rejected {
        println!("❌ Rejected customer: {}", e);
    }

    let ada = customers
        .create(Input::Validated(NewCustomer {
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
        }))
        .await?;
    println!("👤 Created customer {} ({})", ada.name, ada.id);

    let mut basket = Vec::new();
    for (sku, cents) in [("KEYBOARD", 4_999), ("MOUSE", 1_999)] {
        let item = items
            .create(Input::Validated(NewItem {
                sku: sku.to_string(),
                price: Decimal::new(cents, 2),
            }))
            .await?;
        println!("📦 Created item {} ({})", item.sku, item.id);
        basket.push(item);
    }

    // Trusted input skips validation entirely
    let placed_at = Utc.with_ymd_and_hms(2025, 1, 18, 10, 48, 0).single();
    let order = orders
        .create(Input::Trusted(
            json!({
                "total": 12.50,
                "placed_at": placed_at,
                "customer_id": ada.id,
                "status": "pending",
            })
            .as_object()
            .cloned()
            .unwrap_or_default(),
        ))
        .await?;
    for item in &basket {
        store.link::<Order>("items", order.id, item.id)?;
    }
    println!("🧾 Created order {} for customer {}\n", order.id, ada.id);

    let options = SerializeOptions::new()
        .exclude(["customer_id"])
        .expand_fk(Projection::new().include(["id", "name"]))
        .expand_m2m(Projection::new().exclude(["id"]));
    let mapping = serializer.to_mapping(&order, &options, store.as_ref()).await?;
    println!("📤 Serialized order:");
    println!("{}\n", serde_json::to_string_pretty(&mapping)?);

    let order = orders
        .update(order.id, Input::Validated(OrderPatch {
            status: Some("paid".to_string()),
            ..Default::default()
        }))
        .await?;
    println!("✏️  Order {} is now {} (version {})", order.id, order.status, order.version);

    let page = orders
        .list(1, 10, Filter::eq("status", "paid"), &[OrderBy::desc("placed_at")], &["customer", "items"])
        .await?;
    println!(
        "📋 Page {}/{}: {} of {} paid orders",
        page.page,
        page.total_pages(),
        page.items.len(),
        page.total
    );
    let mappings = serializer
        .to_mappings(&page.items, &options, &page.related)
        .await?;
    println!("{}\n", serde_json::to_string_pretty(&mappings)?);

    match orders.delete(order.id).await? {
        Some(deleted) => println!("🗑️  Deleted order {}", deleted.id),
        None => println!("🗑️  Nothing to delete"),
    }
    match orders.get(order.id).await {
        Ok(_) => println!("⚠️  Order still present"),
        Err(e) if e.is_not_found() => println!("✅ {}", e),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
