//! Shared test harness for scaffold integration tests
//!
//! Provides a small shop domain (`Customer`, `Item`, `Order`) plus a
//! self-referencing `Person` for cycle testing, the validated input types
//! the engines are bound to, and helpers for seeding data.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod scaffold_harness;
//! use scaffold_harness::*;
//! ```

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use scaffold::prelude::*;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

impl_entity!(
    #[derive(PartialEq)]
    Customer,
    "customer",
    {
        name: String,
        email: Option<String>,
    }
);

impl_entity!(
    #[derive(PartialEq)]
    Item,
    "item",
    {
        sku: String,
        #[serde(default)]
        quantity: i64,
        price: Decimal,
        #[serde(default)]
        label: Vec<u8>,
    }
);

impl_entity!(
    #[derive(PartialEq)]
    Order,
    "order",
    {
        total: Decimal,
        placed_at: DateTime<Utc>,
        customer_id: Option<i64>,
        #[serde(default = "default_status")]
        status: String,
        #[serde(default)]
        version: i64,
    },
    foreign_keys { customer: customer_id => "customer" },
    many_to_many { items => "item" through "order_items" },
    version = version
);

fn default_status() -> String {
    "pending".to_string()
}

// Every person may have a best friend and any number of friends, all of
// them people: the relation graph is cyclic by construction.
impl_entity!(
    #[derive(PartialEq)]
    Person,
    "person",
    {
        name: String,
        best_friend_id: Option<i64>,
    },
    foreign_keys { best_friend: best_friend_id => "person" },
    many_to_many { friends => "person" through "person_friends" }
);

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct CustomerPatch {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct NewItem {
    #[validate(length(min = 1, max = 32))]
    pub sku: String,
    #[serde(default)]
    pub quantity: i64,
    pub price: Decimal,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ItemPatch {
    #[validate(length(min = 1, max = 32))]
    pub sku: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewOrder {
    pub total: Decimal,
    pub placed_at: DateTime<Utc>,
    pub customer_id: Option<i64>,
    #[validate(length(min = 1))]
    pub status: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct OrderPatch {
    pub id: Option<i64>,
    pub total: Option<Decimal>,
    pub customer_id: Option<i64>,
    #[validate(length(min = 1))]
    pub status: Option<String>,
    pub version: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct NewPerson {
    #[validate(length(min = 1))]
    pub name: String,
    pub best_friend_id: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub best_friend_id: Option<i64>,
}

pub type Customers = Crud<Customer, NewCustomer, CustomerPatch, InMemoryStore>;
pub type Items = Crud<Item, NewItem, ItemPatch, InMemoryStore>;
pub type Orders = Crud<Order, NewOrder, OrderPatch, InMemoryStore>;
pub type People = Crud<Person, NewPerson, PersonPatch, InMemoryStore>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// One store with an engine per entity type
#[derive(Clone)]
pub struct Shop {
    pub store: Arc<InMemoryStore>,
    pub customers: Customers,
    pub items: Items,
    pub orders: Orders,
    pub people: People,
}

impl Shop {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            customers: Crud::new(store.clone()),
            items: Crud::new(store.clone()),
            orders: Crud::new(store.clone()),
            people: Crud::new(store.clone()),
            store,
        }
    }
}

/// Unwrap a JSON object literal into a field mapping
pub fn fields(value: Value) -> FieldMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// The fixed timestamp every seeded order is placed at
pub fn placed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 18, 10, 48, 0).unwrap()
}

pub async fn create_item(shop: &Shop, sku: &str, quantity: i64) -> Item {
    shop.items
        .create(Input::Validated(NewItem {
            sku: sku.to_string(),
            quantity,
            price: Decimal::new(250, 2),
        }))
        .await
        .unwrap()
}

/// Seed a customer with one order holding two items
pub async fn seed_order(shop: &Shop) -> (Customer, Vec<Item>, Order) {
    let customer = shop
        .customers
        .create(Input::Validated(NewCustomer {
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
        }))
        .await
        .unwrap();

    let items = vec![
        create_item(shop, "A-1", 2).await,
        create_item(shop, "B-2", 3).await,
    ];

    let order = shop
        .orders
        .create(Input::Trusted(fields(json!({
            "total": 12.50,
            "placed_at": placed_at(),
            "customer_id": customer.id,
        }))))
        .await
        .unwrap();

    for item in &items {
        shop.store
            .link::<Order>("items", order.id, item.id)
            .unwrap();
    }

    (customer, items, order)
}

/// Two people who are each other's best friend and friend
pub async fn seed_friends(shop: &Shop) -> (Person, Person) {
    let alice = shop
        .people
        .create(Input::Trusted(fields(json!({"name": "Alice"}))))
        .await
        .unwrap();
    let bob = shop
        .people
        .create(Input::Trusted(fields(
            json!({"name": "Bob", "best_friend_id": alice.id}),
        )))
        .await
        .unwrap();
    let alice = shop
        .people
        .update(alice.id, Input::Validated(PersonPatch {
            best_friend_id: Some(bob.id),
            ..Default::default()
        }))
        .await
        .unwrap();

    shop.store.link::<Person>("friends", alice.id, bob.id).unwrap();
    shop.store.link::<Person>("friends", bob.id, alice.id).unwrap();
    (alice, bob)
}

/// Keys of a mapping, in order
pub fn keys(mapping: &Mapping) -> Vec<&str> {
    mapping.keys().map(String::as_str).collect()
}
