//! dinedesk-schemas
//!
//! Shared data model for the DineDesk workspace: orders and their line items,
//! the validated order-status state machine, the live-feed event envelope,
//! and the front-desk records (menu items, reservations).
//!
//! This crate holds **no I/O** — every other crate in the workspace depends
//! on it, so it stays plain data + pure logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod money;
mod status;

pub use status::{OrderStatus, StatusParseError, TransitionError};

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// One line of an order: a menu item reference and a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub menu_item_id: i64,
    pub qty: i64,
}

/// A placed order as stored. The id is assigned by the store at creation and
/// never reused; `total_cents` is integer cents (see [`money`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub lines: Vec<OrderLine>,
    pub total_cents: i64,
    pub payment_method: String,
    pub order_type: String,
    pub notes: Option<String>,
    pub created_at_utc: DateTime<Utc>,
    pub status: OrderStatus,
}

/// Input fields for a new order, before the store has assigned an id.
///
/// Validation happens in the service layer; the store additionally rejects
/// line items that reference unknown menu items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub lines: Vec<OrderLine>,
    pub total_cents: i64,
    pub payment_method: String,
    pub order_type: String,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// OrderEvent — live feed payload
// ---------------------------------------------------------------------------

/// Why an [`OrderEvent`] was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    /// Backlog replay of an order that was already active when the session
    /// opened.
    Snapshot,
    /// A new order was just placed.
    NewOrder,
    /// An existing order moved to a new status.
    StatusChanged,
}

impl OrderEventKind {
    /// Stable wire label, also used as the SSE event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventKind::Snapshot => "snapshot",
            OrderEventKind::NewOrder => "new_order",
            OrderEventKind::StatusChanged => "status_changed",
        }
    }
}

/// One frame on the live order feed.
///
/// Carries the **full** order snapshot so a kitchen display never has to ask
/// the server for more context; consumers key frames on `order.id`, which
/// makes duplicate frames across the snapshot-to-live handoff harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: Uuid,
    pub kind: OrderEventKind,
    pub ts_utc: DateTime<Utc>,
    pub order: Order,
}

impl OrderEvent {
    pub fn new(kind: OrderEventKind, order: Order) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            ts_utc: Utc::now(),
            order,
        }
    }
}

// ---------------------------------------------------------------------------
// Front desk records
// ---------------------------------------------------------------------------

/// A dish on the menu. Seeded at first boot, referenced by order lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub category: String,
}

/// A table reservation taken at the front desk.
///
/// Date and time are kept as the strings the desk entered ("2026-08-08",
/// "19:30"); the service validates presence, not calendar semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub guests: i64,
    pub created_at_utc: DateTime<Utc>,
}

/// Input fields for a new reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub guests: i64,
}
