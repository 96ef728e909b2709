//! SSE live feed over the real router: backlog replay first, then live
//! events, read frame-by-frame off the streaming response body.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use dinedesk_schemas::{OrderDraft, OrderLine};
use dinedesk_server::{routes, state};
use dinedesk_store::OrderStore;
use http_body_util::BodyExt;
use tokio::time::timeout;
use tower::ServiceExt; // oneshot

async fn make_state() -> Arc<state::AppState> {
    let store = OrderStore::in_memory().await.expect("in-memory store");
    store.migrate().await.expect("migrate");
    store.seed_menu_if_empty().await.expect("seed");
    Arc::new(state::AppState::with_store(store))
}

fn draft(customer: &str) -> OrderDraft {
    OrderDraft {
        customer: customer.to_string(),
        phone: None,
        email: None,
        lines: vec![OrderLine {
            menu_item_id: 1,
            qty: 1,
        }],
        total_cents: 1250,
        payment_method: "cash".to_string(),
        order_type: "dine-in".to_string(),
        notes: None,
    }
}

/// Append body frames into `buf` until `predicate` holds. Panics after the
/// per-frame timeout — the stream is endless, so tests must never collect it.
async fn read_until(
    body: &mut axum::body::Body,
    buf: &mut String,
    predicate: impl Fn(&str) -> bool,
) {
    while !predicate(buf) {
        let frame = timeout(Duration::from_secs(2), body.frame())
            .await
            .expect("timed out waiting for SSE frame")
            .expect("stream ended unexpectedly")
            .expect("frame error");
        if let Ok(data) = frame.into_data() {
            buf.push_str(std::str::from_utf8(&data).expect("non-utf8 frame"));
        }
    }
}

#[tokio::test]
async fn stream_replays_backlog_then_pushes_live_events() {
    let st = make_state().await;

    // Two orders placed before any display connects.
    st.orders.place_order(draft("early-one")).await.unwrap();
    st.orders.place_order(draft("early-two")).await.unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/v1/orders/stream")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = routes::build_router(Arc::clone(&st))
        .oneshot(req)
        .await
        .expect("oneshot failed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let mut body = resp.into_body();
    let mut buf = String::new();

    // Backlog: one snapshot frame per pre-existing active order.
    read_until(&mut body, &mut buf, |b| {
        b.matches("event: snapshot").count() >= 2
    })
    .await;
    assert!(buf.contains("early-one"));
    assert!(buf.contains("early-two"));
    let one = buf.find("early-one").unwrap();
    let two = buf.find("early-two").unwrap();
    assert!(one < two, "backlog must replay in creation order");

    // A live placement while the stream is open is pushed without polling.
    st.orders.place_order(draft("live-order")).await.unwrap();
    read_until(&mut body, &mut buf, |b| b.contains("event: new_order")).await;
    assert!(buf.contains("live-order"));
    assert!(buf.contains("\"status\":\"incoming\""));

    // A status change arrives as its own event.
    st.orders
        .update_order_status(3, dinedesk_schemas::OrderStatus::Preparing)
        .await
        .unwrap();
    read_until(&mut body, &mut buf, |b| b.contains("event: status_changed")).await;
    assert!(buf.contains("\"status\":\"preparing\""));
}

#[tokio::test]
async fn stream_on_empty_store_starts_quiet_then_delivers() {
    let st = make_state().await;

    let req = Request::builder()
        .method("GET")
        .uri("/v1/orders/stream")
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = routes::build_router(Arc::clone(&st))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let mut body = resp.into_body();
    let mut buf = String::new();

    st.orders.place_order(draft("first-ever")).await.unwrap();
    read_until(&mut body, &mut buf, |b| b.contains("event: new_order")).await;

    assert!(buf.contains("first-ever"));
    assert_eq!(
        buf.matches("event: snapshot").count(),
        0,
        "no backlog expected on an empty store"
    );
}
