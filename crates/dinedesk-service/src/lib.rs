//! dinedesk-service
//!
//! The single choke-point for all order mutations: every place-order and
//! status-update flows through [`OrderService`], which validates, persists
//! via the store, and only **after** a successful commit hands the resulting
//! event to the broadcaster. Nothing publishes to the feed directly, so the
//! feed can never carry an order the store does not hold.
//!
//! A crash between commit and publish leaves listeners stale until their next
//! backlog replay (on reconnect) — an accepted, bounded inconsistency window.

use dinedesk_feed::{LiveFeedSession, OrderFeed};
use dinedesk_schemas::{
    MenuItem, Order, OrderDraft, OrderEvent, OrderEventKind, OrderStatus, Reservation,
    ReservationDraft, TransitionError,
};
use dinedesk_store::{OrderStore, StoreError};
use serde::{Deserialize, Serialize};
use tracing::info;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejected input, reported before any persistence. `reasons` lists every
/// failed field check so the client can fix them all in one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub reasons: Vec<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed: {}", self.reasons.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Everything an [`OrderService`] operation can fail with.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected; nothing was written.
    Validation(ValidationError),
    /// Unknown order id; nothing was mutated.
    NotFound(i64),
    /// Status not reachable from the current one; nothing was mutated.
    InvalidTransition(TransitionError),
    /// Persistence-layer failure; the transaction rolled back fully.
    Storage(StoreError),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Validation(e) => write!(f, "{e}"),
            ServiceError::NotFound(id) => write!(f, "order {id} not found"),
            ServiceError::InvalidTransition(e) => write!(f, "{e}"),
            ServiceError::Storage(e) => write!(f, "storage failure: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Validation(e) => Some(e),
            ServiceError::InvalidTransition(e) => Some(e),
            ServiceError::Storage(e) => Some(e),
            ServiceError::NotFound(_) => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::InvalidTransition(t) => ServiceError::InvalidTransition(t),
            StoreError::UnknownMenuItem(id) => ServiceError::Validation(ValidationError {
                reasons: vec![format!("unknown menu item: {id}")],
            }),
            other => ServiceError::Storage(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Field checks for a new order. Runs before any store access.
pub fn validate_order_draft(draft: &OrderDraft) -> Result<(), ValidationError> {
    let mut reasons = Vec::new();

    if draft.customer.trim().is_empty() {
        reasons.push("customer is required".to_string());
    }
    if draft.lines.is_empty() {
        reasons.push("at least one line item is required".to_string());
    }
    for line in &draft.lines {
        if line.qty < 1 {
            reasons.push(format!(
                "line for menu item {} has quantity {}; must be at least 1",
                line.menu_item_id, line.qty
            ));
        }
    }
    if draft.total_cents < 0 {
        reasons.push("total must not be negative".to_string());
    }
    if draft.payment_method.trim().is_empty() {
        reasons.push("payment method is required".to_string());
    }
    if draft.order_type.trim().is_empty() {
        reasons.push("order type is required".to_string());
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { reasons })
    }
}

/// Field checks for a new reservation.
pub fn validate_reservation_draft(draft: &ReservationDraft) -> Result<(), ValidationError> {
    let mut reasons = Vec::new();

    for (label, value) in [
        ("name", &draft.name),
        ("phone", &draft.phone),
        ("date", &draft.date),
        ("time", &draft.time),
    ] {
        if value.trim().is_empty() {
            reasons.push(format!("{label} is required"));
        }
    }
    if draft.guests < 1 {
        reasons.push("guests must be at least 1".to_string());
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { reasons })
    }
}

// ---------------------------------------------------------------------------
// DashboardSummary
// ---------------------------------------------------------------------------

/// Counts for the front-desk landing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_orders: i64,
    pub active_orders: i64,
    pub reservations: i64,
}

// ---------------------------------------------------------------------------
// OrderService
// ---------------------------------------------------------------------------

/// Orchestrates the store and the feed. Cheap to clone.
#[derive(Clone)]
pub struct OrderService {
    store: OrderStore,
    feed: OrderFeed,
}

impl OrderService {
    pub fn new(store: OrderStore, feed: OrderFeed) -> Self {
        Self { store, feed }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn feed(&self) -> &OrderFeed {
        &self.feed
    }

    /// Validate, persist, then broadcast a `new_order` event carrying the
    /// full stored order.
    pub async fn place_order(&self, draft: OrderDraft) -> Result<Order, ServiceError> {
        validate_order_draft(&draft).map_err(ServiceError::Validation)?;

        let order = self.store.create_order(&draft).await?;
        info!(order_id = order.id, "order placed");

        self.feed
            .publish(OrderEvent::new(OrderEventKind::NewOrder, order.clone()));
        Ok(order)
    }

    /// Move an order forward (or cancel it), then broadcast the change.
    ///
    /// `NotFound` / `InvalidTransition` surface unchanged from the store;
    /// nothing is published on failure.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let order = self.store.update_status(order_id, new_status).await?;

        self.feed
            .publish(OrderEvent::new(OrderEventKind::StatusChanged, order.clone()));
        Ok(order)
    }

    /// Open a live feed session for one kitchen display.
    ///
    /// Registration happens **before** the snapshot read, so an event
    /// published in between is buffered rather than lost; it may duplicate a
    /// snapshot entry, which consumers de-duplicate by order id.
    pub async fn open_feed(&self) -> Result<LiveFeedSession, ServiceError> {
        let rx = self.feed.subscribe();
        let active = self.store.list_active_orders().await?;
        Ok(LiveFeedSession::with_backlog(active, rx))
    }

    pub async fn active_orders(&self) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list_active_orders().await?)
    }

    pub async fn menu(&self) -> Result<Vec<MenuItem>, ServiceError> {
        Ok(self.store.list_menu().await?)
    }

    pub async fn create_reservation(
        &self,
        draft: ReservationDraft,
    ) -> Result<Reservation, ServiceError> {
        validate_reservation_draft(&draft).map_err(ServiceError::Validation)?;
        let reservation = self.store.create_reservation(&draft).await?;
        info!(reservation_id = reservation.id, "reservation created");
        Ok(reservation)
    }

    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, ServiceError> {
        Ok(self.store.list_reservations().await?)
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ServiceError> {
        Ok(DashboardSummary {
            total_orders: self.store.count_orders().await?,
            active_orders: self.store.count_active_orders().await?,
            reservations: self.store.count_reservations().await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests — validation only; feed/store interplay lives in tests/
// ---------------------------------------------------------------------------
