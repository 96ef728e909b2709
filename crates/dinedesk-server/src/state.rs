//! Shared runtime state for dinedesk-server.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The state owns the
//! service (store + feed); dropping the last reference at process exit drops
//! the feed sender, which closes every live session.

use dinedesk_feed::OrderFeed;
use dinedesk_service::OrderService;
use dinedesk_store::OrderStore;
use serde::Serialize;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub build: BuildInfo,
}

impl AppState {
    /// Production construction: open the configured database, migrate, seed
    /// the menu on first boot, and start with an empty subscriber set.
    pub async fn init_from_env() -> anyhow::Result<Self> {
        let store = OrderStore::connect_from_env().await?;
        store.migrate().await?;
        store.seed_menu_if_empty().await?;
        Ok(Self::with_store(store))
    }

    /// Wrap an already-migrated store (tests use an in-memory one).
    pub fn with_store(store: OrderStore) -> Self {
        Self {
            orders: OrderService::new(store, OrderFeed::new()),
            build: BuildInfo {
                service: "dinedesk-server",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
