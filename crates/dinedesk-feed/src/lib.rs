//! dinedesk-feed
//!
//! Fan-out of order events to every connected kitchen display.
//!
//! [`OrderFeed`] owns a `tokio::sync::broadcast` channel: the channel is the
//! subscriber registry (no hand-maintained subscriber list), each receiver
//! gets its own bounded ring buffer, and closed receivers are dropped by the
//! channel itself. `publish` therefore never blocks and never fails — a
//! stalled or dead display cannot slow down order placement.
//!
//! [`LiveFeedSession`] is the per-connection consumption side: it yields a
//! backlog of snapshot events first (the orders that were already active when
//! the display connected), then live events until the connection or the feed
//! goes away.
//!
//! # Overflow policy
//!
//! A subscriber that stops draining overflows its ring buffer after
//! [`OrderFeed::DEFAULT_CAPACITY`] events. The channel then drops that
//! subscriber's **oldest** undelivered events, and the session surfaces a
//! [`FeedItem::Lagged`] marker so the display knows to resynchronize
//! (reconnect and replay the backlog). Dropping stale frames beats both
//! unbounded memory growth and blocking the publisher.

use std::collections::VecDeque;

use dinedesk_schemas::{Order, OrderEvent, OrderEventKind};
use tokio::sync::broadcast;
use tracing::debug;

// ---------------------------------------------------------------------------
// OrderFeed
// ---------------------------------------------------------------------------

/// The broadcaster. Cheap to clone; all clones publish into the same channel.
///
/// Dropping the last clone closes every live session (their `next_event`
/// resolves `None`), which is how shutdown tears the feed down.
#[derive(Clone)]
pub struct OrderFeed {
    tx: broadcast::Sender<OrderEvent>,
}

impl Default for OrderFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderFeed {
    /// Per-subscriber ring capacity. A kitchen display that falls more than
    /// this many events behind starts losing its oldest frames.
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Non-blocking, infallible: with zero subscribers the event is simply
    /// dropped (the store already holds the truth), and a subscriber whose
    /// receiver is gone is pruned by the channel.
    pub fn publish(&self, event: OrderEvent) {
        let receivers = self.tx.receiver_count();
        debug!(
            kind = event.kind.as_str(),
            order_id = event.order.id,
            receivers,
            "publish order event"
        );
        let _ = self.tx.send(event);
    }

    /// Register a new live receiver.
    ///
    /// Call this **before** snapshotting the store when opening a session —
    /// events published between the subscribe and the snapshot are then
    /// buffered rather than lost (they may duplicate a snapshot entry, which
    /// consumers tolerate).
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }

    /// Number of currently-subscribed sessions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ---------------------------------------------------------------------------
// LiveFeedSession
// ---------------------------------------------------------------------------

/// One item from a live feed session.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Event(OrderEvent),
    /// The session fell behind and `skipped` events were dropped (oldest
    /// first). The consumer should treat its view as stale and resync.
    Lagged(u64),
}

/// Per-connection cursor: backlog replay first, then live events.
///
/// Owned exclusively by its connection handler; dropping it deregisters the
/// receiver from the feed. `OPEN → CLOSED` is one-way: after `next_event`
/// returns `None` (feed shut down) it returns `None` forever.
pub struct LiveFeedSession {
    backlog: VecDeque<OrderEvent>,
    rx: broadcast::Receiver<OrderEvent>,
}

impl LiveFeedSession {
    /// Build a session from an already-subscribed receiver and the snapshot
    /// taken *after* subscribing. `active_orders` must be in creation-time
    /// order; each becomes one `snapshot` backlog event.
    pub fn with_backlog(active_orders: Vec<Order>, rx: broadcast::Receiver<OrderEvent>) -> Self {
        let backlog = active_orders
            .into_iter()
            .map(|order| OrderEvent::new(OrderEventKind::Snapshot, order))
            .collect();
        Self { backlog, rx }
    }

    /// Next item: every backlog event (in order) before any live event.
    ///
    /// Suspends awaiting the channel once the backlog is drained — the only
    /// blocking wait in the system; cancelled by dropping the session.
    /// Resolves `None` when the feed has shut down.
    pub async fn next_event(&mut self) -> Option<FeedItem> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(FeedItem::Event(event));
        }
        match self.rx.recv().await {
            Ok(event) => Some(FeedItem::Event(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "live feed session lagged");
                Some(FeedItem::Lagged(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Remaining backlog events not yet yielded.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dinedesk_schemas::{OrderLine, OrderStatus};
    use std::time::Duration;
    use tokio::time::timeout;

    fn order(id: i64) -> Order {
        Order {
            id,
            customer: format!("customer-{id}"),
            phone: None,
            email: None,
            lines: vec![OrderLine {
                menu_item_id: 1,
                qty: 1,
            }],
            total_cents: 1000,
            payment_method: "cash".to_string(),
            order_type: "dine-in".to_string(),
            notes: None,
            created_at_utc: Utc::now(),
            status: OrderStatus::Incoming,
        }
    }

    fn event(id: i64) -> OrderEvent {
        OrderEvent::new(OrderEventKind::NewOrder, order(id))
    }

    async fn next(session: &mut LiveFeedSession) -> Option<FeedItem> {
        timeout(Duration::from_secs(1), session.next_event())
            .await
            .expect("next_event timed out")
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_is_a_noop() {
        let feed = OrderFeed::new();
        assert_eq!(feed.subscriber_count(), 0);
        feed.publish(event(1)); // must not panic or block
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event_in_publish_order() {
        let feed = OrderFeed::new();
        let mut a = LiveFeedSession::with_backlog(Vec::new(), feed.subscribe());
        let mut b = LiveFeedSession::with_backlog(Vec::new(), feed.subscribe());
        assert_eq!(feed.subscriber_count(), 2);

        for id in 1..=3 {
            feed.publish(event(id));
        }

        for session in [&mut a, &mut b] {
            for expected in 1..=3 {
                match next(session).await {
                    Some(FeedItem::Event(e)) => assert_eq!(e.order.id, expected),
                    other => panic!("expected event {expected}, got {other:?}"),
                }
            }
        }
    }

    #[tokio::test]
    async fn backlog_is_replayed_before_live_events() {
        let feed = OrderFeed::new();

        // Subscribe first, then snapshot — the required session-open order.
        let rx = feed.subscribe();
        let snapshot = vec![order(1), order(2), order(3)];
        let mut session = LiveFeedSession::with_backlog(snapshot, rx);
        assert_eq!(session.backlog_len(), 3);

        feed.publish(event(4));

        let mut seen = Vec::new();
        for _ in 0..4 {
            match next(&mut session).await {
                Some(FeedItem::Event(e)) => seen.push((e.kind, e.order.id)),
                other => panic!("expected event, got {other:?}"),
            }
        }
        assert_eq!(
            seen,
            vec![
                (OrderEventKind::Snapshot, 1),
                (OrderEventKind::Snapshot, 2),
                (OrderEventKind::Snapshot, 3),
                (OrderEventKind::NewOrder, 4),
            ]
        );
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest_and_sees_lag_marker() {
        let feed = OrderFeed::with_capacity(2);
        let mut session = LiveFeedSession::with_backlog(Vec::new(), feed.subscribe());

        for id in 1..=5 {
            feed.publish(event(id));
        }

        // Ring capacity 2: events 1..=3 were dropped, oldest first.
        match next(&mut session).await {
            Some(FeedItem::Lagged(skipped)) => assert_eq!(skipped, 3),
            other => panic!("expected lag marker, got {other:?}"),
        }
        match next(&mut session).await {
            Some(FeedItem::Event(e)) => assert_eq!(e.order.id, 4),
            other => panic!("expected event 4, got {other:?}"),
        }
        match next(&mut session).await {
            Some(FeedItem::Event(e)) => assert_eq!(e.order.id, 5),
            other => panic!("expected event 5, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropping_the_feed_closes_sessions_after_backlog() {
        let feed = OrderFeed::new();
        let rx = feed.subscribe();
        let mut session = LiveFeedSession::with_backlog(vec![order(1)], rx);

        drop(feed);

        // Backlog still drains, then the session reports closed.
        match next(&mut session).await {
            Some(FeedItem::Event(e)) => assert_eq!(e.kind, OrderEventKind::Snapshot),
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert_eq!(next(&mut session).await, None);
        assert_eq!(next(&mut session).await, None, "closed is terminal");
    }

    #[tokio::test]
    async fn dropping_a_session_deregisters_it() {
        let feed = OrderFeed::new();
        let a = LiveFeedSession::with_backlog(Vec::new(), feed.subscribe());
        let _b = LiveFeedSession::with_backlog(Vec::new(), feed.subscribe());
        assert_eq!(feed.subscriber_count(), 2);

        drop(a);
        // Publishing to a set containing a dead receiver must not error.
        feed.publish(event(1));
        assert_eq!(feed.subscriber_count(), 1);
    }
}
