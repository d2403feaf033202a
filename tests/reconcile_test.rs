//! Reconciliation engine tests: per-item diffing, visibility decisions,
//! and list-position behavior.

use rust_decimal_macros::dec;

use comanda::models::order::{
    ItemChange, Modifier, Order, OrderItem, OrderSource, OrderStatus,
};
use comanda::sync::reconcile::ActiveOrders;

fn item(product_id: &str, quantity: u32, notes: &str) -> OrderItem {
    OrderItem {
        product_id: product_id.to_string(),
        product_name: format!("Product {product_id}"),
        quantity,
        unit_price: dec!(10000),
        subtotal: dec!(10000) * rust_decimal::Decimal::from(quantity),
        notes: notes.to_string(),
        modifiers: Vec::<Modifier>::new(),
        change: ItemChange::Unchanged,
        previous_quantity: None,
    }
}

fn order(id: &str, number: &str, items: Vec<OrderItem>) -> Order {
    Order {
        id: id.to_string(),
        order_number: number.to_string(),
        status: OrderStatus::Pending,
        table_number: None,
        items,
        source: OrderSource::Pos,
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn new_order_inserted_at_head_all_items_unchanged() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order("1", "ORD-0001", vec![item("a", 1, "")]));

    let outcome = active.apply_snapshot(order("2", "ORD-0002", vec![item("b", 3, "")]));
    assert!(outcome.visible);
    assert!(outcome.new_order);

    assert_eq!(active.orders()[0].id, "2");
    assert_eq!(active.orders()[1].id, "1");
    assert!(
        active.orders()[0]
            .items
            .iter()
            .all(|i| i.change == ItemChange::Unchanged)
    );
}

#[test]
fn diff_detects_added_modified_and_removed() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order(
        "7",
        "ORD-0007",
        vec![item("A", 2, ""), item("B", 1, "")],
    ));

    let outcome = active.apply_snapshot(order(
        "7",
        "ORD-0007",
        vec![item("A", 3, ""), item("C", 1, "")],
    ));
    assert!(outcome.visible);
    assert!(!outcome.new_order);

    let merged = active.get("7").unwrap();
    assert_eq!(merged.items.len(), 3);

    let a = merged.items.iter().find(|i| i.product_id == "A").unwrap();
    assert_eq!(a.change, ItemChange::Modified);
    assert_eq!(a.previous_quantity, Some(2));
    assert_eq!(a.quantity, 3);

    let c = merged.items.iter().find(|i| i.product_id == "C").unwrap();
    assert_eq!(c.change, ItemChange::Added);

    // Removed items are retained for the struck-through UI line.
    let b = merged.items.iter().find(|i| i.product_id == "B").unwrap();
    assert_eq!(b.change, ItemChange::Removed);
    assert_eq!(b.quantity, 1);
}

#[test]
fn duplicate_snapshot_is_silent_and_stable() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order(
        "9",
        "ORD-0009",
        vec![item("A", 2, ""), item("B", 1, "al clima")],
    ));

    let snapshot = order("9", "ORD-0009", vec![item("A", 2, ""), item("B", 1, "al clima")]);
    let first = active.apply_snapshot(snapshot.clone());
    assert!(!first.visible);
    let held_after_first: Vec<(String, u32, ItemChange)> = active
        .get("9")
        .unwrap()
        .items
        .iter()
        .map(|i| (i.product_id.clone(), i.quantity, i.change))
        .collect();

    let second = active.apply_snapshot(snapshot);
    assert!(!second.visible);
    let held_after_second: Vec<(String, u32, ItemChange)> = active
        .get("9")
        .unwrap()
        .items
        .iter()
        .map(|i| (i.product_id.clone(), i.quantity, i.change))
        .collect();

    assert_eq!(held_after_first, held_after_second);
}

#[test]
fn update_preserves_list_position() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order("1", "ORD-0001", vec![item("a", 1, "")]));
    active.apply_snapshot(order("2", "ORD-0002", vec![item("b", 1, "")]));
    active.apply_snapshot(order("3", "ORD-0003", vec![item("c", 1, "")]));

    // Order 1 sits at the tail; an update must not move it.
    active.apply_snapshot(order("1", "ORD-0001", vec![item("a", 5, "")]));
    let ids: Vec<&str> = active.orders().iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "2", "1"]);
}

#[test]
fn notes_distinguish_lines_with_same_product() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order("4", "ORD-0004", vec![item("A", 1, "sin cebolla")]));

    let outcome = active.apply_snapshot(order("4", "ORD-0004", vec![item("A", 1, "")]));
    assert!(outcome.visible);

    let merged = active.get("4").unwrap();
    let added = merged
        .items
        .iter()
        .find(|i| i.notes.is_empty())
        .unwrap();
    assert_eq!(added.change, ItemChange::Added);
    let removed = merged
        .items
        .iter()
        .find(|i| i.notes == "sin cebolla")
        .unwrap();
    assert_eq!(removed.change, ItemChange::Removed);
}

#[test]
fn tombstones_do_not_retrigger_visibility() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order(
        "5",
        "ORD-0005",
        vec![item("A", 2, ""), item("B", 1, "")],
    ));
    let first = active.apply_snapshot(order("5", "ORD-0005", vec![item("A", 2, "")]));
    assert!(first.visible);

    // The same reduced snapshot again: the earlier tombstone for B must not
    // count as a fresh change.
    let second = active.apply_snapshot(order("5", "ORD-0005", vec![item("A", 2, "")]));
    assert!(!second.visible);
    let merged = active.get("5").unwrap();
    assert!(merged.items.iter().all(|i| i.change == ItemChange::Unchanged));
}

#[test]
fn float_formatted_ids_match_canonical_ones() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order("39", "ORD-0039", vec![item("A", 1, "")]));

    let outcome = active.apply_snapshot(order("39.0", "ORD-0039", vec![item("A", 1, "")]));
    assert!(!outcome.new_order);
    assert_eq!(active.len(), 1);
}

#[test]
fn status_patch_applies_only_to_known_orders() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order("6", "ORD-0006", vec![item("A", 1, "")]));

    assert!(active.apply_status("6.0", OrderStatus::Preparing));
    assert_eq!(active.get("6").unwrap().status, OrderStatus::Preparing);
    // Same status again is a no-op.
    assert!(!active.apply_status("6", OrderStatus::Preparing));
    assert!(!active.apply_status("99", OrderStatus::Ready));
}

#[test]
fn cancelled_orders_are_marked_then_purged() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order("8", "ORD-0008", vec![item("A", 1, "")]));

    assert!(active.mark_cancelled("8"));
    assert_eq!(active.get("8").unwrap().status, OrderStatus::Cancelled);

    active.purge_cancelled();
    assert!(active.get("8").is_none());
    assert!(active.is_empty());
}

#[test]
fn replace_all_resets_change_tags() {
    let mut active = ActiveOrders::new();
    active.apply_snapshot(order("1", "ORD-0001", vec![item("A", 1, "")]));
    active.apply_snapshot(order("1", "ORD-0001", vec![item("A", 4, "")]));

    let mut reload = order("1.0", "ORD-0001", vec![item("A", 4, "")]);
    reload.items[0].change = ItemChange::Added;
    active.replace_all(vec![reload]);

    let held = active.get("1").unwrap();
    assert_eq!(held.id, "1");
    assert!(held.items.iter().all(|i| i.change == ItemChange::Unchanged));
}
