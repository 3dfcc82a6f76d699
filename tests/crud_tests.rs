//! Integration tests for the data-access engine over the in-memory store.

mod scaffold_harness;

use rust_decimal::Decimal;
use scaffold::prelude::*;
use scaffold_harness::*;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

// ==================================================================
// Absence
// ==================================================================

#[tokio::test]
async fn test_absence_on_empty_table() {
    let shop = Shop::new();

    let err = shop.orders.get(9999).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");

    assert!(shop.orders.query(9999).await.unwrap().is_none());
    assert!(shop.orders.delete(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_and_remove_fail_on_absence() {
    let shop = Shop::new();

    let err = shop
        .items
        .update(9999, Input::Validated(ItemPatch::default()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = shop.items.remove(9999).await.unwrap_err();
    assert!(err.is_not_found());
}

// ==================================================================
// Create
// ==================================================================

#[tokio::test]
async fn test_create_assigns_identity() {
    let shop = Shop::new();
    let first = create_item(&shop, "A-1", 1).await;
    let second = create_item(&shop, "B-2", 1).await;

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert_eq!(shop.items.get(2).await.unwrap(), second);
}

#[tokio::test]
async fn test_validated_create_writes_defaults() {
    let shop = Shop::new();
    let item = shop
        .items
        .create(Input::Validated(NewItem {
            sku: "A-1".to_string(),
            price: Decimal::new(5, 0),
            ..Default::default()
        }))
        .await
        .unwrap();

    let stored = shop.items.get(item.id).await.unwrap();
    assert_eq!(stored.sku, "A-1");
    assert_eq!(stored.quantity, 0);
    assert_eq!(stored.price, Decimal::new(5, 0));
}

#[tokio::test]
async fn test_validated_create_rejects_invalid_input() {
    let shop = Shop::new();
    let result = shop
        .customers
        .create(Input::Validated(NewCustomer {
            name: String::new(),
            email: Some("not-an-email".to_string()),
        }))
        .await;

    let err = assert_err!(result);
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    let message = err.to_string();
    assert!(message.contains("name"));
    assert!(message.contains("email"));

    assert!(shop.customers.select(Filter::All).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_trusted_create_skips_validation() {
    let shop = Shop::new();
    let result = shop
        .customers
        .create(Input::Trusted(fields(json!({"name": "", "email": "not-an-email"}))))
        .await;

    let customer = assert_ok!(result);
    assert_eq!(customer.name, "");
    assert_eq!(customer.email.as_deref(), Some("not-an-email"));
}

#[tokio::test]
async fn test_trusted_create_missing_required_field_fails() {
    let shop = Shop::new();
    let err = shop
        .items
        .create(Input::Trusted(fields(json!({"quantity": 3}))))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ENTITY_SERIALIZATION_ERROR");
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_identities() {
    let shop = Shop::new();
    let mut handles = Vec::new();
    for n in 0..10 {
        let items = shop.items.clone();
        handles.push(tokio::spawn(async move {
            items
                .create(Input::Validated(NewItem {
                    sku: format!("SKU-{}", n),
                    quantity: n,
                    price: Decimal::ONE,
                }))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.sort_unstable();
    assert_eq!(ids, (1..=10).collect::<Vec<i64>>());
}

// ==================================================================
// Update
// ==================================================================

#[tokio::test]
async fn test_update_is_partial() {
    let shop = Shop::new();
    let item = create_item(&shop, "A-1", 1).await;

    let updated = shop
        .items
        .update(item.id, Input::Validated(ItemPatch {
            quantity: Some(9),
            ..Default::default()
        }))
        .await
        .unwrap();

    assert_eq!(updated.quantity, 9);
    assert_eq!(updated.sku, "A-1");
    assert_eq!(updated.price, item.price);
    assert_eq!(shop.items.get(item.id).await.unwrap(), updated);
}

#[tokio::test]
async fn test_trusted_update_merges_mapping() {
    let shop = Shop::new();
    let item = create_item(&shop, "A-1", 1).await;

    let updated = shop
        .items
        .update(item.id, Input::Trusted(fields(json!({"sku": "Z-9", "unknown": true}))))
        .await
        .unwrap();

    assert_eq!(updated.sku, "Z-9");
    assert_eq!(updated.quantity, 1);
}

#[tokio::test]
async fn test_update_never_reassigns_identity() {
    let shop = Shop::new();
    let (_, _, order) = seed_order(&shop).await;

    let updated = shop
        .orders
        .update(order.id, Input::Validated(OrderPatch {
            id: Some(42),
            status: Some("paid".to_string()),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(updated.id, order.id);
    assert_eq!(updated.status, "paid");
    assert!(shop.orders.query(42).await.unwrap().is_none());

    let updated = shop
        .orders
        .update(order.id, Input::Trusted(fields(json!({"id": 43, "status": "shipped"}))))
        .await
        .unwrap();
    assert_eq!(updated.id, order.id);
    assert!(shop.orders.query(43).await.unwrap().is_none());
}

#[tokio::test]
async fn test_validated_update_rejects_invalid_input() {
    let shop = Shop::new();
    let item = create_item(&shop, "A-1", 1).await;

    let err = shop
        .items
        .update(item.id, Input::Validated(ItemPatch {
            sku: Some(String::new()),
            ..Default::default()
        }))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VALIDATION_ERROR");
    assert_eq!(shop.items.get(item.id).await.unwrap().sku, "A-1");
}

#[tokio::test]
async fn test_update_bumps_version() {
    let shop = Shop::new();
    let (_, _, order) = seed_order(&shop).await;
    assert_eq!(order.version, 0);

    let updated = shop
        .orders
        .update(order.id, Input::Validated(OrderPatch {
            status: Some("paid".to_string()),
            version: Some(100),
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(updated.version, 1);
}

#[tokio::test]
async fn test_stale_save_is_a_version_conflict() {
    let shop = Shop::new();
    let (_, _, order) = seed_order(&shop).await;

    shop.orders
        .update(order.id, Input::Validated(OrderPatch {
            status: Some("paid".to_string()),
            ..Default::default()
        }))
        .await
        .unwrap();

    // A writer that read version 0 before the update above.
    let mut stale = order.clone();
    stale.status = "cancelled".to_string();
    stale.version = 1;
    let err = shop
        .store
        .save(&stale, Some(0))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "VERSION_CONFLICT");
    assert_eq!(shop.orders.get(order.id).await.unwrap().status, "paid");
}

#[tokio::test]
async fn test_unversioned_update_is_last_write_wins() {
    let shop = Shop::new();
    let item = create_item(&shop, "A-1", 1).await;

    let (first, second) = tokio::join!(
        shop.items.update(item.id, Input::Validated(ItemPatch {
            quantity: Some(5),
            ..Default::default()
        })),
        shop.items.update(item.id, Input::Validated(ItemPatch {
            quantity: Some(7),
            ..Default::default()
        })),
    );
    assert_ok!(first);
    assert_ok!(second);

    let quantity = shop.items.get(item.id).await.unwrap().quantity;
    assert!(quantity == 5 || quantity == 7);
}

// ==================================================================
// Remove / Delete
// ==================================================================

#[tokio::test]
async fn test_remove_returns_deleted_entity() {
    let shop = Shop::new();
    let item = create_item(&shop, "A-1", 1).await;

    let removed = shop.items.remove(item.id).await.unwrap();
    assert_eq!(removed, item);
    assert!(shop.items.query(item.id).await.unwrap().is_none());

    let err = shop.items.remove(item.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_tolerates_absence() {
    let shop = Shop::new();
    let item = create_item(&shop, "A-1", 1).await;

    assert_eq!(shop.items.delete(item.id).await.unwrap(), Some(item));
    assert_eq!(shop.items.delete(1).await.unwrap(), None);
}

// ==================================================================
// Select
// ==================================================================

#[tokio::test]
async fn test_select_by_field_equality() {
    let shop = Shop::new();
    create_item(&shop, "A-1", 1).await;
    create_item(&shop, "B-2", 1).await;
    create_item(&shop, "C-3", 2).await;

    let ones = shop.items.select(Filter::eq("quantity", 1_i64)).await.unwrap();
    let skus: Vec<&str> = ones.iter().map(|i| i.sku.as_str()).collect();
    assert_eq!(skus, vec!["A-1", "B-2"]);

    let both = shop
        .items
        .select(Filter::fields([("quantity", FieldValue::from(1_i64)), ("sku", "B-2".into())]))
        .await
        .unwrap();
    assert_eq!(both.len(), 1);

    assert!(shop.items.select(Filter::eq("sku", "nope")).await.unwrap().is_empty());
    assert!(shop.items.select(Filter::eq("colour", "red")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_select_decimal_by_float_operand() {
    let shop = Shop::new();
    let (_, _, order) = seed_order(&shop).await;

    let matched = shop.orders.select(Filter::eq("total", 12.5_f64)).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, order.id);

    assert!(shop.orders.select(Filter::eq("total", 12.25_f64)).await.unwrap().is_empty());
    assert_eq!(shop.orders.select(Filter::lt("total", 13.0_f64)).await.unwrap().len(), 1);
}

// ==================================================================
// List
// ==================================================================

#[tokio::test]
async fn test_pagination_counts_and_slices() {
    let shop = Shop::new();
    let n: usize = 7;
    for i in 0..n {
        create_item(&shop, &format!("SKU-{}", i), i as i64).await;
    }

    for page in 1..=4usize {
        for page_size in [1usize, 2, 3, 7, 10] {
            let listed = shop
                .items
                .list(page, page_size, Filter::All, &[], &[])
                .await
                .unwrap();
            let expected = page_size.min(n.saturating_sub((page - 1) * page_size));
            assert_eq!(listed.total, n, "page {} size {}", page, page_size);
            assert_eq!(listed.items.len(), expected, "page {} size {}", page, page_size);
        }
    }
}

#[tokio::test]
async fn test_list_page_boundaries() {
    let shop = Shop::new();
    for i in 0..5 {
        create_item(&shop, &format!("SKU-{}", i), i).await;
    }

    let out_of_range = shop.items.list(9, 2, Filter::All, &[], &[]).await.unwrap();
    assert_eq!(out_of_range.total, 5);
    assert!(out_of_range.items.is_empty());
    assert!(!out_of_range.has_next());

    let page_zero = shop.items.list(0, 2, Filter::All, &[], &[]).await.unwrap();
    assert_eq!(page_zero.page, 1);
    assert_eq!(page_zero.items.len(), 2);
    assert!(page_zero.has_next());
    assert!(!page_zero.has_prev());
    assert_eq!(page_zero.total_pages(), 3);

    let empty_page = shop.items.list(1, 0, Filter::All, &[], &[]).await.unwrap();
    assert_eq!(empty_page.total, 5);
    assert!(empty_page.items.is_empty());
}

#[tokio::test]
async fn test_list_search_and_order() {
    let shop = Shop::new();
    for (sku, quantity) in [("A", 3), ("B", 1), ("C", 5), ("D", 1), ("E", 4)] {
        create_item(&shop, sku, quantity).await;
    }

    let listed = shop
        .items
        .list(
            1,
            3,
            Filter::ge("quantity", 2_i64),
            &[OrderBy::desc("quantity")],
            &[],
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 3);
    let skus: Vec<&str> = listed.items.iter().map(|i| i.sku.as_str()).collect();
    assert_eq!(skus, vec!["C", "E", "A"]);

    let listed = shop
        .items
        .list(1, 10, Filter::All, &["quantity".into(), "-sku".into()], &[])
        .await
        .unwrap();
    let skus: Vec<&str> = listed.items.iter().map(|i| i.sku.as_str()).collect();
    assert_eq!(skus, vec!["D", "B", "A", "E", "C"]);
}

#[tokio::test]
async fn test_list_preloads_related() {
    let shop = Shop::new();
    let (customer, items, _) = seed_order(&shop).await;

    let page = shop
        .orders
        .list(1, 10, Filter::All, &[], &["customer", "items"])
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.related.contains("customer"));
    assert!(page.related.contains("items"));

    // Relations come from the preloaded set even after the rows are gone.
    shop.customers.remove(customer.id).await.unwrap();
    let options = SerializeOptions::new()
        .expand_fk(Projection::new())
        .expand_m2m(Projection::new().include(["sku"]));
    let mapping = Serializer::new()
        .to_mapping(&page.items[0], &options, &page.related)
        .await
        .unwrap();
    assert_eq!(mapping["customer"]["name"], json!("Ada"));
    assert_eq!(
        mapping["items"],
        json!([{"sku": items[0].sku}, {"sku": items[1].sku}])
    );
}

#[tokio::test]
async fn test_preloaded_page_falls_back_for_unloaded_reference() {
    let shop = Shop::new();
    let (_, _, order) = seed_order(&shop).await;

    let page = shop
        .orders
        .list(1, 10, Filter::All, &[], &["customer"])
        .await
        .unwrap();

    let grace = shop
        .customers
        .create(Input::Trusted(fields(json!({"name": "Grace"}))))
        .await
        .unwrap();
    let moved = shop
        .orders
        .update(order.id, Input::Validated(OrderPatch {
            customer_id: Some(grace.id),
            ..Default::default()
        }))
        .await
        .unwrap();

    let options = SerializeOptions::new()
        .include(["id"])
        .expand_fk(Projection::new().include(["name"]));
    let mapping = assert_ok!(
        Serializer::new()
            .to_mapping(&moved, &options, &page.related)
            .await
    );
    assert_eq!(mapping["customer"], json!({"name": "Grace"}));
}

#[tokio::test]
async fn test_list_rejects_unknown_relation() {
    let shop = Shop::new();
    seed_order(&shop).await;

    let err = shop
        .orders
        .list(1, 10, Filter::All, &[], &["warehouse"])
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_FIELD");
}
