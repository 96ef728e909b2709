//! Ensures the order status state machine is enforced at the store layer AND
//! that failed updates leave the stored status untouched.

use dinedesk_schemas::{OrderDraft, OrderLine, OrderStatus};
use dinedesk_store::{OrderStore, StoreError};

async fn fresh_store() -> anyhow::Result<OrderStore> {
    let store = OrderStore::in_memory().await?;
    store.migrate().await?;
    store.seed_menu_if_empty().await?;
    Ok(store)
}

fn draft(customer: &str) -> OrderDraft {
    OrderDraft {
        customer: customer.to_string(),
        phone: None,
        email: None,
        lines: vec![OrderLine {
            menu_item_id: 1,
            qty: 2,
        }],
        total_cents: 2500,
        payment_method: "cash".to_string(),
        order_type: "dine-in".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn create_assigns_fresh_id_and_incoming_status() -> anyhow::Result<()> {
    let store = fresh_store().await?;

    let first = store.create_order(&draft("Alice")).await?;
    let second = store.create_order(&draft("Bob")).await?;

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    assert_eq!(first.status, OrderStatus::Incoming);

    let active = store.list_active_orders().await?;
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].id, first.id);
    assert_eq!(active[0].customer, "Alice");
    assert_eq!(active[0].lines, first.lines);
    Ok(())
}

#[tokio::test]
async fn forward_transitions_succeed_and_jumps_are_allowed() -> anyhow::Result<()> {
    let store = fresh_store().await?;
    let order = store.create_order(&draft("Alice")).await?;

    // incoming -> ready is a legal forward jump.
    let updated = store.update_status(order.id, OrderStatus::Ready).await?;
    assert_eq!(updated.status, OrderStatus::Ready);

    let updated = store.update_status(order.id, OrderStatus::Served).await?;
    assert_eq!(updated.status, OrderStatus::Served);
    Ok(())
}

#[tokio::test]
async fn backwards_transition_fails_and_leaves_status_unchanged() -> anyhow::Result<()> {
    let store = fresh_store().await?;
    let order = store.create_order(&draft("Alice")).await?;
    store.update_status(order.id, OrderStatus::Ready).await?;

    let err = store
        .update_status(order.id, OrderStatus::Incoming)
        .await
        .unwrap_err();
    match err {
        StoreError::InvalidTransition(t) => {
            assert_eq!(t.from, OrderStatus::Ready);
            assert_eq!(t.to, OrderStatus::Incoming);
        }
        other => panic!("expected InvalidTransition, got: {other}"),
    }

    let stored = store.fetch_order(order.id).await?;
    assert_eq!(stored.status, OrderStatus::Ready, "status must be unchanged");
    Ok(())
}

#[tokio::test]
async fn terminal_orders_reject_further_updates() -> anyhow::Result<()> {
    let store = fresh_store().await?;
    let order = store.create_order(&draft("Alice")).await?;
    store.update_status(order.id, OrderStatus::Cancelled).await?;

    let err = store
        .update_status(order.id, OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidTransition(_)));
    Ok(())
}

#[tokio::test]
async fn unknown_order_id_is_not_found() -> anyhow::Result<()> {
    let store = fresh_store().await?;
    let err = store
        .update_status(999, OrderStatus::Ready)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(999)));
    Ok(())
}

#[tokio::test]
async fn unknown_menu_item_rolls_back_whole_order() -> anyhow::Result<()> {
    let store = fresh_store().await?;

    let mut bad = draft("Alice");
    bad.lines.push(OrderLine {
        menu_item_id: 9999,
        qty: 1,
    });

    let err = store.create_order(&bad).await.unwrap_err();
    assert!(matches!(err, StoreError::UnknownMenuItem(9999)));

    // No partial write: neither the order row nor the first (valid) line landed.
    assert_eq!(store.count_orders().await?, 0);
    assert!(store.list_active_orders().await?.is_empty());
    Ok(())
}
