//! Axum router and all HTTP handlers for dinedesk-server.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use dinedesk_feed::{FeedItem, LiveFeedSession};
use dinedesk_schemas::{money, OrderDraft, OrderLine, OrderStatus};
use dinedesk_service::ServiceError;
use futures_util::{stream, Stream};
use tracing::{error, info};

use crate::{
    api_types::{
        ErrorResponse, HealthResponse, PlaceOrderRequest, PlaceOrderResponse, ReservationRequest,
        ReservationResponse, UpdateStatusRequest, UpdateStatusResponse,
    },
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/orders", post(place_order))
        .route("/v1/orders/:id/status", post(update_order_status))
        .route("/v1/orders/active", get(active_orders))
        .route("/v1/orders/stream", get(stream_orders))
        .route("/v1/menu", get(menu))
        .route(
            "/v1/reservations",
            post(create_reservation).get(list_reservations),
        )
        .route("/v1/dashboard", get(dashboard))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a service failure to its HTTP status. Storage failures are logged
/// here and returned as an opaque 500; everything else carries its reason.
fn error_response(err: ServiceError) -> Response {
    let status = match &err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidTransition(_) => StatusCode::CONFLICT,
        ServiceError::Storage(e) => {
            error!(error = %e, "storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let error = match &err {
        ServiceError::Storage(_) => "internal error".to_string(),
        other => other.to_string(),
    };
    (status, Json(ErrorResponse { error })).into_response()
}

fn bad_request(reason: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: reason })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/orders
// ---------------------------------------------------------------------------

pub(crate) async fn place_order(
    State(st): State<Arc<AppState>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Response {
    let total_cents = match money::amount_to_cents(req.total) {
        Ok(v) => v,
        Err(e) => return bad_request(format!("invalid total: {e}")),
    };

    let draft = OrderDraft {
        customer: req.customer,
        phone: req.phone,
        email: req.email,
        lines: req
            .items
            .iter()
            .map(|i| OrderLine {
                menu_item_id: i.id,
                qty: i.qty,
            })
            .collect(),
        total_cents,
        payment_method: req.payment_method,
        order_type: req.order_type,
        notes: req.notes,
    };

    match st.orders.place_order(draft).await {
        Ok(order) => (
            StatusCode::OK,
            Json(PlaceOrderResponse {
                success: true,
                order_id: order.id,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/orders/{id}/status
// ---------------------------------------------------------------------------

pub(crate) async fn update_order_status(
    State(st): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Response {
    let new_status = match OrderStatus::parse(&req.status) {
        Ok(s) => s,
        Err(e) => return bad_request(e.to_string()),
    };

    match st.orders.update_order_status(order_id, new_status).await {
        Ok(_) => (StatusCode::OK, Json(UpdateStatusResponse { success: true })).into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/orders/active
// ---------------------------------------------------------------------------

pub(crate) async fn active_orders(State(st): State<Arc<AppState>>) -> Response {
    match st.orders.active_orders().await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/orders/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream_orders(State(st): State<Arc<AppState>>) -> Response {
    // Session open = subscribe first, then snapshot; see OrderService::open_feed.
    let session = match st.orders.open_feed().await {
        Ok(s) => s,
        Err(err) => return error_response(err),
    };
    info!(
        subscribers = st.orders.feed().subscriber_count(),
        backlog = session.backlog_len(),
        "live feed session opened"
    );

    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let events = session_to_sse(session);
    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

/// Drive a session as an SSE stream: backlog first, then live events, ending
/// when the feed shuts down. Dropping the response (client disconnect) drops
/// the session, which deregisters it from the broadcaster.
fn session_to_sse(session: LiveFeedSession) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(session, |mut session| async move {
        let item = session.next_event().await?;
        let event = match item {
            FeedItem::Event(event) => {
                let frame = Event::default()
                    .event(event.kind.as_str())
                    .id(event.event_id.to_string());
                match frame.json_data(&event) {
                    Ok(frame) => frame,
                    Err(_) => Event::default().comment("unserializable event skipped"),
                }
            }
            FeedItem::Lagged(skipped) => Event::default()
                .event("lagged")
                .data(format!("{{\"skipped\":{skipped}}}")),
        };
        Some((Ok(event), session))
    })
}

// ---------------------------------------------------------------------------
// GET /v1/menu
// ---------------------------------------------------------------------------

pub(crate) async fn menu(State(st): State<Arc<AppState>>) -> Response {
    match st.orders.menu().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/reservations  GET /v1/reservations
// ---------------------------------------------------------------------------

pub(crate) async fn create_reservation(
    State(st): State<Arc<AppState>>,
    Json(req): Json<ReservationRequest>,
) -> Response {
    let draft = dinedesk_schemas::ReservationDraft {
        name: req.name,
        phone: req.phone,
        date: req.date,
        time: req.time,
        guests: req.guests,
    };

    match st.orders.create_reservation(draft).await {
        Ok(reservation) => (
            StatusCode::OK,
            Json(ReservationResponse {
                success: true,
                reservation_id: reservation.id,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_reservations(State(st): State<Arc<AppState>>) -> Response {
    match st.orders.list_reservations().await {
        Ok(reservations) => (StatusCode::OK, Json(reservations)).into_response(),
        Err(err) => error_response(err),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/dashboard
// ---------------------------------------------------------------------------

pub(crate) async fn dashboard(State(st): State<Arc<AppState>>) -> Response {
    match st.orders.dashboard_summary().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}
