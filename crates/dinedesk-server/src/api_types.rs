//! Request and response types for all dinedesk-server HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests. No business logic lives here; conversion into
//! domain drafts happens in `routes`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

/// Serialize-only: the `&'static str` fields come from build metadata and
/// are never parsed back.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error body (any non-2xx)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// POST /v1/orders
// ---------------------------------------------------------------------------

/// One requested line item. `id` references a menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub id: i64,
    pub qty: i64,
}

/// Order submission payload. Field aliases accept the camelCase keys some
/// front-desk clients send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub items: Vec<LineItemRequest>,
    /// Display units (e.g. 25.00); converted to integer cents at this
    /// boundary and integer everywhere past it.
    pub total: f64,
    #[serde(alias = "paymentMethod")]
    pub payment_method: String,
    #[serde(alias = "orderType")]
    pub order_type: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub order_id: i64,
}

// ---------------------------------------------------------------------------
// POST /v1/orders/{id}/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// POST /v1/reservations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub guests: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub success: bool,
    pub reservation_id: i64,
}
