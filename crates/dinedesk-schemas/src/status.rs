//! Order status state machine.
//!
//! # Design
//!
//! Every status update goes through [`OrderStatus::check_transition`]; there
//! is no code path that assigns a raw status string. The machine enforces two
//! invariants:
//!
//! 1. **Forward only.** A ticket moves monotonically through the kitchen:
//!    `incoming → preparing → ready → served | completed`. Forward jumps are
//!    legal (a display may mark an `incoming` ticket `ready` directly); moving
//!    backwards is not.
//! 2. **Terminal states are sticky.** `served`, `completed` and `cancelled`
//!    accept no further transitions.
//!
//! `cancelled` is reachable from any non-terminal state.
//!
//! ```text
//!    incoming ──► preparing ──► ready ──► served    (terminal)
//!        │            │           └─────► completed (terminal)
//!        └────────────┴───────────┴─────► cancelled (terminal)
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// All valid states an order can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just placed; not yet picked up by the kitchen.
    Incoming,
    /// The kitchen is working the ticket.
    Preparing,
    /// Ready for pickup / service.
    Ready,
    /// Handed to the table. **Terminal.**
    Served,
    /// Handed out / closed (takeout, delivery). **Terminal.**
    Completed,
    /// Cancelled before completion. **Terminal.**
    Cancelled,
}

impl OrderStatus {
    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Served | Self::Completed | Self::Cancelled)
    }

    /// Position along the forward chain. `served` and `completed` share a
    /// rank: they are alternative final states, not a sequence.
    fn rank(&self) -> u8 {
        match self {
            OrderStatus::Incoming => 0,
            OrderStatus::Preparing => 1,
            OrderStatus::Ready => 2,
            OrderStatus::Served | OrderStatus::Completed => 3,
            // Cancelled never participates in forward-rank comparison.
            OrderStatus::Cancelled => u8::MAX,
        }
    }

    /// Check that moving from `self` to `to` is legal.
    ///
    /// # Errors
    /// Returns [`TransitionError`] when the move is backwards, sideways, or
    /// out of a terminal state. The caller's stored status must remain
    /// unchanged on error.
    pub fn check_transition(self, to: OrderStatus) -> Result<(), TransitionError> {
        let legal = if self.is_terminal() {
            false
        } else if to == OrderStatus::Cancelled {
            true
        } else {
            to.rank() > self.rank()
        };

        if legal {
            Ok(())
        } else {
            Err(TransitionError { from: self, to })
        }
    }

    /// Stable lowercase label, used on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Incoming => "incoming",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Served => "served",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StatusParseError> {
        match s {
            "incoming" => Ok(OrderStatus::Incoming),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "served" => Ok(OrderStatus::Served),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(StatusParseError {
                label: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Returned when a requested status is not reachable from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "illegal status transition: {} -> {}",
            self.from.as_str(),
            self.to.as_str()
        )
    }
}

impl std::error::Error for TransitionError {}

/// Returned when a wire/database status label is not one of the known states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusParseError {
    pub label: String,
}

impl std::fmt::Display for StatusParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown order status: {:?}", self.label)
    }
}

impl std::error::Error for StatusParseError {}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
