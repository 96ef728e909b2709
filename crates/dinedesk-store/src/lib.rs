//! dinedesk-store
//!
//! Durable, authoritative record of every order (plus the front-desk menu and
//! reservation tables) on SQLite. Every non-terminal order is reconstructible
//! from here alone — the live feed is a delivery optimization layered on top,
//! never a second source of truth.
//!
//! All mutations run inside a transaction: an order row and its line rows
//! commit or roll back together, and a status update is a transactional
//! read-modify-write guarded by the `OrderStatus` transition table. Readers
//! only ever observe committed state.

use anyhow::Context;
use chrono::{DateTime, Utc};
use dinedesk_schemas::{
    MenuItem, Order, OrderDraft, OrderLine, OrderStatus, Reservation, ReservationDraft,
    TransitionError,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

pub const ENV_DB_URL: &str = "DINEDESK_DATABASE_URL";

/// Default on-disk database next to the binary, created on first boot.
pub const DEFAULT_DB_URL: &str = "sqlite://dinedesk.db?mode=rwc";

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Typed failures surfaced by store operations.
///
/// `NotFound` / `InvalidTransition` / `UnknownMenuItem` are domain outcomes
/// the service maps to client errors; `Db` is infrastructure failure and
/// surfaces as a generic server error.
#[derive(Debug)]
pub enum StoreError {
    /// No order with this id exists.
    NotFound(i64),
    /// The requested status is not reachable from the current one. The
    /// stored status is unchanged.
    InvalidTransition(TransitionError),
    /// An order line referenced a menu item id that does not exist.
    UnknownMenuItem(i64),
    /// Underlying database failure; the enclosing transaction rolled back.
    Db(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "order {id} not found"),
            StoreError::InvalidTransition(e) => write!(f, "{e}"),
            StoreError::UnknownMenuItem(id) => write!(f, "unknown menu item: {id}"),
            StoreError::Db(e) => write!(f, "database error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::InvalidTransition(e) => Some(e),
            StoreError::Db(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Db(e)
    }
}

// ---------------------------------------------------------------------------
// OrderStore
// ---------------------------------------------------------------------------

/// Handle to the SQLite pool. Cheap to clone; all methods take `&self`.
#[derive(Clone)]
pub struct OrderStore {
    pool: SqlitePool,
}

impl OrderStore {
    /// Connect to the database at `url` (e.g. `sqlite://dinedesk.db?mode=rwc`).
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .with_context(|| format!("failed to open database at {url}"))?;
        Ok(Self { pool })
    }

    /// Connect using `DINEDESK_DATABASE_URL`, falling back to
    /// [`DEFAULT_DB_URL`].
    pub async fn connect_from_env() -> anyhow::Result<Self> {
        let url = std::env::var(ENV_DB_URL).unwrap_or_else(|_| DEFAULT_DB_URL.to_string());
        Self::connect(&url).await
    }

    /// Private in-memory database for tests. Single connection — every
    /// SQLite `:memory:` connection is its own database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("failed to open in-memory database")?;
        Ok(Self { pool })
    }

    /// Run embedded migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("db migrate failed")?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    /// Persist a new order with status `incoming`, assigning its id.
    ///
    /// The order row and all line rows are written in one transaction; a
    /// line referencing an unknown menu item rolls the whole order back.
    pub async fn create_order(&self, draft: &OrderDraft) -> Result<Order, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for line in &draft.lines {
            let known: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM menu_items WHERE id = ?1")
                    .bind(line.menu_item_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if known.is_none() {
                return Err(StoreError::UnknownMenuItem(line.menu_item_id));
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
              customer, phone, email, total_cents, payment_method, order_type,
              notes, created_at_utc, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&draft.customer)
        .bind(&draft.phone)
        .bind(&draft.email)
        .bind(draft.total_cents)
        .bind(&draft.payment_method)
        .bind(&draft.order_type)
        .bind(&draft.notes)
        .bind(now)
        .bind(OrderStatus::Incoming.as_str())
        .execute(&mut *tx)
        .await?;

        let order_id = result.last_insert_rowid();

        for line in &draft.lines {
            sqlx::query("INSERT INTO order_lines (order_id, menu_item_id, qty) VALUES (?1, ?2, ?3)")
                .bind(order_id)
                .bind(line.menu_item_id)
                .bind(line.qty)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(order_id, customer = %draft.customer, "order created");

        Ok(Order {
            id: order_id,
            customer: draft.customer.clone(),
            phone: draft.phone.clone(),
            email: draft.email.clone(),
            lines: draft.lines.clone(),
            total_cents: draft.total_cents,
            payment_method: draft.payment_method.clone(),
            order_type: draft.order_type.clone(),
            notes: draft.notes.clone(),
            created_at_utc: now,
            status: OrderStatus::Incoming,
        })
    }

    /// Move an order to `new_status`, enforcing the transition table.
    ///
    /// Read-modify-write inside one transaction, so two concurrent updates
    /// to the same order cannot interleave. On any error the stored status
    /// is unchanged.
    pub async fn update_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(ORDER_SELECT_BY_ID)
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        let row = row.ok_or(StoreError::NotFound(order_id))?;
        let mut order = order_from_row(&row)?;
        order.lines = fetch_lines(&mut tx, order_id).await?;

        order
            .status
            .check_transition(new_status)
            .map_err(StoreError::InvalidTransition)?;

        sqlx::query("UPDATE orders SET status = ?1 WHERE id = ?2")
            .bind(new_status.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(
            order_id,
            from = order.status.as_str(),
            to = new_status.as_str(),
            "order status updated"
        );

        order.status = new_status;
        Ok(order)
    }

    /// Fetch one order with its lines.
    pub async fn fetch_order(&self, order_id: i64) -> Result<Order, StoreError> {
        let row = sqlx::query(ORDER_SELECT_BY_ID)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        let row = row.ok_or(StoreError::NotFound(order_id))?;
        let mut order = order_from_row(&row)?;

        let line_rows =
            sqlx::query("SELECT menu_item_id, qty FROM order_lines WHERE order_id = ?1 ORDER BY id")
                .bind(order_id)
                .fetch_all(&self.pool)
                .await?;
        order.lines = line_rows
            .iter()
            .map(|r| {
                Ok(OrderLine {
                    menu_item_id: r.try_get("menu_item_id")?,
                    qty: r.try_get("qty")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()?;

        Ok(order)
    }

    /// All orders not in a terminal status, creation time ascending (id as
    /// tiebreaker). This ordering is what backlog replay uses to reconstruct
    /// the kitchen display.
    pub async fn list_active_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer, phone, email, total_cents, payment_method,
                   order_type, notes, created_at_utc, status
            FROM orders
            WHERE status NOT IN ('served', 'completed', 'cancelled')
            ORDER BY created_at_utc ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            orders.push(order_from_row(row)?);
        }

        // One pass over all active lines instead of a query per order.
        let line_rows = sqlx::query(
            r#"
            SELECT l.order_id, l.menu_item_id, l.qty
            FROM order_lines l
            JOIN orders o ON o.id = l.order_id
            WHERE o.status NOT IN ('served', 'completed', 'cancelled')
            ORDER BY l.order_id, l.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: std::collections::HashMap<i64, &mut Order> =
            orders.iter_mut().map(|o| (o.id, o)).collect();
        for row in &line_rows {
            let order_id: i64 = row.try_get("order_id")?;
            if let Some(order) = by_id.get_mut(&order_id) {
                order.lines.push(OrderLine {
                    menu_item_id: row.try_get("menu_item_id")?,
                    qty: row.try_get("qty")?,
                });
            }
        }

        Ok(orders)
    }

    /// Total number of orders ever placed.
    pub async fn count_orders(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Number of orders currently in a non-terminal status.
    pub async fn count_active_orders(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM orders WHERE status NOT IN ('served', 'completed', 'cancelled')",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    // -----------------------------------------------------------------------
    // Menu
    // -----------------------------------------------------------------------

    /// Seed the starter menu when the table is empty. Idempotent; returns
    /// the number of items inserted (0 on every boot after the first).
    pub async fn seed_menu_if_empty(&self) -> Result<usize, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM menu_items")
            .fetch_one(&self.pool)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        let starter: &[(&str, i64, &str)] = &[
            ("Burger", 1250, "Main"),
            ("Fries", 400, "Side"),
            ("Coke", 250, "Drink"),
            ("Salad", 800, "Main"),
        ];

        let mut tx = self.pool.begin().await?;
        for (name, price_cents, category) in starter {
            sqlx::query("INSERT INTO menu_items (name, price_cents, category) VALUES (?1, ?2, ?3)")
                .bind(name)
                .bind(price_cents)
                .bind(category)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!(items = starter.len(), "menu seeded");
        Ok(starter.len())
    }

    pub async fn list_menu(&self) -> Result<Vec<MenuItem>, StoreError> {
        let rows =
            sqlx::query("SELECT id, name, price_cents, category FROM menu_items ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|row| {
                Ok(MenuItem {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    price_cents: row.try_get("price_cents")?,
                    category: row.try_get("category")?,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Reservations
    // -----------------------------------------------------------------------

    pub async fn create_reservation(
        &self,
        draft: &ReservationDraft,
    ) -> Result<Reservation, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO reservations (name, phone, date, time, guests, created_at_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(&draft.date)
        .bind(&draft.time)
        .bind(draft.guests)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Reservation {
            id: result.last_insert_rowid(),
            name: draft.name.clone(),
            phone: draft.phone.clone(),
            date: draft.date.clone(),
            time: draft.time.clone(),
            guests: draft.guests,
            created_at_utc: now,
        })
    }

    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, phone, date, time, guests, created_at_utc
            FROM reservations
            ORDER BY date, time, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(Reservation {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    phone: row.try_get("phone")?,
                    date: row.try_get("date")?,
                    time: row.try_get("time")?,
                    guests: row.try_get("guests")?,
                    created_at_utc: row.try_get("created_at_utc")?,
                })
            })
            .collect()
    }

    pub async fn count_reservations(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reservations")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const ORDER_SELECT_BY_ID: &str = r#"
SELECT id, customer, phone, email, total_cents, payment_method, order_type,
       notes, created_at_utc, status
FROM orders
WHERE id = ?1
"#;

fn order_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Order, StoreError> {
    let status_label: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_label)
        .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?;

    Ok(Order {
        id: row.try_get("id")?,
        customer: row.try_get("customer")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        lines: Vec::new(),
        total_cents: row.try_get("total_cents")?,
        payment_method: row.try_get("payment_method")?,
        order_type: row.try_get("order_type")?,
        notes: row.try_get("notes")?,
        created_at_utc: row.try_get::<DateTime<Utc>, _>("created_at_utc")?,
        status,
    })
}

async fn fetch_lines(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> Result<Vec<OrderLine>, StoreError> {
    let rows =
        sqlx::query("SELECT menu_item_id, qty FROM order_lines WHERE order_id = ?1 ORDER BY id")
            .bind(order_id)
            .fetch_all(&mut **tx)
            .await?;
    rows.iter()
        .map(|row| {
            Ok(OrderLine {
                menu_item_id: row.try_get("menu_item_id")?,
                qty: row.try_get("qty")?,
            })
        })
        .collect()
}
