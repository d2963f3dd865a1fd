//! # SQLite Transaction Gateway
//!
//! Implements [`TransactionGateway`] and [`StockSnapshotProvider`] on SQLite.
//!
//! ## One Operation, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_sale(command)                                                   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├─ idempotency key seen? ──yes──► ROLLBACK, return original receipt  │
//! │   ├─ next sale_number for venue                                        │
//! │   ├─ INSERT sales                                                      │
//! │   ├─ for each line:                                                    │
//! │   │    UPDATE products SET available = available - qty                 │
//! │   │      WHERE id = ? AND available >= qty  ── 0 rows ──► ROLLBACK     │
//! │   │    INSERT sale_items (name + price snapshot)                       │
//! │   ├─ recompute subtotal / total ── total < 0 ──► ROLLBACK              │
//! │  COMMIT                                                                 │
//! │   └─ publish SaleChange { Create }                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every statement inside an operation runs on the transaction's connection,
//! never on the pool; a single-connection pool would otherwise deadlock.
//! Dropping the transaction without `commit` rolls it back, so every `?`
//! inside an operation is an all-or-nothing exit.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::feed::SaleChangeFeed;
use crate::repository::product::{fetch_product, ProductRepository};
use tally_core::command::ItemPatch;
use tally_core::lifecycle;
use tally_core::pricing;
use tally_core::validation::{validate_id, validate_price, validate_quantity, validate_reason};
use tally_core::{
    ChangeOperation, CoreError, CreateSaleCommand, GatewayResult, Money, PaymentMethod, Product,
    ProductFilter, Sale, SaleChange, SaleFilter, SaleItem, SaleReceipt, SaleStatus,
    StockSnapshotProvider, TransactionGateway,
};

/// Default page size when a sale filter has no limit.
const DEFAULT_SALE_LIMIT: i64 = 500;

const SALE_COLUMNS: &str = "id, venue_id, sale_number, subtotal_cents, discount_cents, \
     tax_cents, total_cents, payment_method, status, employee_id, employee_name, notes, \
     refund_reason, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, product_name_snapshot, unit_price_cents, \
     quantity, line_total_cents, created_at";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    venue_id: String,
    sale_number: i64,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    payment_method: String,
    status: String,
    employee_id: String,
    employee_name: String,
    notes: Option<String>,
    refund_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SaleRow {
    fn status(&self) -> DbResult<SaleStatus> {
        SaleStatus::from_str(&self.status).map_err(|e| DbError::corrupt("sales", e.to_string()))
    }

    fn into_sale(self, items: Vec<SaleItem>) -> DbResult<Sale> {
        let status = self.status()?;
        let payment_method = PaymentMethod::from_str(&self.payment_method)
            .map_err(|e| DbError::corrupt("sales", e.to_string()))?;

        Ok(Sale {
            id: self.id,
            venue_id: self.venue_id,
            sale_number: self.sale_number,
            items,
            subtotal_cents: self.subtotal_cents,
            discount_cents: self.discount_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            payment_method,
            status,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            notes: self.notes,
            refund_reason: self.refund_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    product_id: String,
    product_name_snapshot: String,
    unit_price_cents: i64,
    quantity: i64,
    line_total_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            product_name_snapshot: row.product_name_snapshot,
            unit_price_cents: row.unit_price_cents,
            quantity: row.quantity,
            line_total_cents: row.line_total_cents,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Statement Helpers
// =============================================================================

async fn fetch_sale_row(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<SaleRow> {
    let row: Option<SaleRow> =
        sqlx::query_as(&format!("SELECT {} FROM sales WHERE id = ?", SALE_COLUMNS))
            .bind(sale_id)
            .fetch_optional(&mut *conn)
            .await?;

    row.ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()).into())
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let rows: Vec<SaleItemRow> = sqlx::query_as(&format!(
        "SELECT {} FROM sale_items WHERE sale_id = ? ORDER BY created_at, rowid",
        ITEM_COLUMNS
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(SaleItem::from).collect())
}

async fn fetch_item(conn: &mut SqliteConnection, item_id: &str) -> DbResult<SaleItem> {
    let row: Option<SaleItemRow> =
        sqlx::query_as(&format!("SELECT {} FROM sale_items WHERE id = ?", ITEM_COLUMNS))
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(SaleItem::from)
        .ok_or_else(|| CoreError::SaleItemNotFound(item_id.to_string()).into())
}

async fn fetch_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Sale> {
    let row = fetch_sale_row(conn, sale_id).await?;
    let items = fetch_items(conn, sale_id).await?;
    row.into_sale(items)
}

/// Loads a product that may be sold at `venue_id`.
async fn fetch_sellable_product(
    conn: &mut SqliteConnection,
    product_id: &str,
    venue_id: &str,
) -> DbResult<Product> {
    let product = fetch_product(conn, product_id)
        .await?
        .filter(|p| p.venue_id == venue_id)
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

    if !product.is_active {
        return Err(CoreError::ProductInactive(product_id.to_string()).into());
    }
    Ok(product)
}

/// Takes `quantity` units off the shelf, or fails without touching the row.
async fn decrement_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET available_quantity = available_quantity - ?, updated_at = ? \
         WHERE id = ? AND available_quantity >= ?",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let available: Option<i64> =
        sqlx::query_scalar("SELECT available_quantity FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    Err(match available {
        None => CoreError::ProductNotFound(product_id.to_string()),
        Some(available) => CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available,
            requested: quantity,
        },
    }
    .into())
}

async fn restore_stock(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET available_quantity = available_quantity + ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }
    Ok(())
}

async fn insert_item(
    conn: &mut SqliteConnection,
    sale_id: &str,
    product: &Product,
    quantity: i64,
    unit_price: Money,
) -> DbResult<String> {
    let item_id = Uuid::new_v4().to_string();
    let line_total = pricing::line_total(quantity, unit_price);

    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, product_name_snapshot,
            unit_price_cents, quantity, line_total_cents, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item_id)
    .bind(sale_id)
    .bind(&product.id)
    .bind(&product.name)
    .bind(unit_price.cents())
    .bind(quantity)
    .bind(line_total.cents())
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(item_id)
}

/// Recomputes subtotal and total from the stored lines.
///
/// Fails with `NegativeTotal` (rolling the caller's transaction back) when
/// the new total would drop below zero.
async fn refresh_totals(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Money> {
    let subtotal: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(line_total_cents), 0) FROM sale_items WHERE sale_id = ?",
    )
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;

    let (discount, tax): (i64, i64) =
        sqlx::query_as("SELECT discount_cents, tax_cents FROM sales WHERE id = ?")
            .bind(sale_id)
            .fetch_one(&mut *conn)
            .await?;

    let total = pricing::ensure_non_negative_total(pricing::total(
        Money::from_cents(subtotal),
        Money::from_cents(discount),
        Money::from_cents(tax),
    ))?;

    sqlx::query("UPDATE sales SET subtotal_cents = ?, total_cents = ?, updated_at = ? WHERE id = ?")
        .bind(subtotal)
        .bind(total.cents())
        .bind(Utc::now())
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    Ok(total)
}

// =============================================================================
// Gateway
// =============================================================================

/// SQLite-backed Transaction Gateway and Stock Snapshot Provider.
///
/// Cheap to clone; clones share the pool and the change feed.
#[derive(Debug, Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
    feed: SaleChangeFeed,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool, feed: SaleChangeFeed) -> Self {
        SqliteGateway { pool, feed }
    }

    pub fn feed(&self) -> &SaleChangeFeed {
        &self.feed
    }

    fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    fn publish(&self, venue_id: &str, operation: ChangeOperation, sale_id: &str) {
        self.feed
            .publish(SaleChange::new(venue_id, operation, sale_id));
    }

    // -------------------------------------------------------------------------
    // Operations (each one transaction)
    // -------------------------------------------------------------------------

    async fn create_sale_tx(&self, command: &CreateSaleCommand) -> DbResult<SaleReceipt> {
        command.validate()?;
        let key = command.idempotency_key.as_str();

        debug!(
            idempotency_key = %key,
            venue_id = %command.venue_id,
            lines = command.items.len(),
            "Creating sale"
        );

        match self.insert_sale_tx(command).await {
            // A concurrent submission with the same key committed first.
            Err(err) if is_idempotency_conflict(&err) => {
                let mut conn = self.pool.acquire().await?;
                fetch_receipt(&mut conn, key)
                    .await?
                    .ok_or(err)
                    .map(|receipt| deduplicated(receipt, key))
            }
            other => other,
        }
    }

    async fn insert_sale_tx(&self, command: &CreateSaleCommand) -> DbResult<SaleReceipt> {
        let key = command.idempotency_key.as_str();
        let mut tx = self.pool.begin().await?;

        // Writing first takes the database write lock, so the key lookup
        // below sees every committed sale.
        let sale_number: i64 = sqlx::query_scalar(
            "INSERT INTO sale_sequences (venue_id, last_number) VALUES (?, 1) \
             ON CONFLICT(venue_id) DO UPDATE SET last_number = last_number + 1 \
             RETURNING last_number",
        )
        .bind(&command.venue_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(receipt) = fetch_receipt(&mut tx, key).await? {
            // Dropping the transaction rolls back the sequence bump.
            return Ok(deduplicated(receipt, key));
        }

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, venue_id, sale_number, idempotency_key,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                payment_method, status, employee_id, employee_name,
                notes, refund_reason, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 0, ?, ?, 0, ?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(&sale_id)
        .bind(&command.venue_id)
        .bind(sale_number)
        .bind(key)
        .bind(command.discount_cents)
        .bind(command.tax_cents)
        .bind(command.payment_method.as_str())
        .bind(command.initial_status.as_str())
        .bind(command.attribution.id())
        .bind(command.attribution.name())
        .bind(&command.notes)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for line in &command.items {
            let product = fetch_sellable_product(&mut tx, &line.product_id, &command.venue_id).await?;
            decrement_stock(&mut tx, &line.product_id, line.quantity).await?;
            insert_item(
                &mut tx,
                &sale_id,
                &product,
                line.quantity,
                Money::from_cents(line.unit_price_cents),
            )
            .await?;
        }

        let total = refresh_totals(&mut tx, &sale_id).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            sale_number,
            total = %total,
            status = %command.initial_status,
            "Sale created"
        );
        self.publish(&command.venue_id, ChangeOperation::Create, &sale_id);

        Ok(SaleReceipt {
            sale_id,
            sale_number,
            deduplicated: false,
        })
    }

    async fn add_item_tx(
        &self,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Option<Money>,
    ) -> DbResult<String> {
        validate_id("product_id", product_id)?;
        validate_quantity(quantity)?;
        if let Some(price) = unit_price {
            validate_price(price)?;
        }

        debug!(sale_id = %sale_id, product_id = %product_id, quantity, "Adding sale item");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale_row(&mut tx, sale_id).await?;
        lifecycle::ensure_editable(sale_id, sale.status()?)?;

        let product = fetch_sellable_product(&mut tx, product_id, &sale.venue_id).await?;
        decrement_stock(&mut tx, product_id, quantity).await?;
        let item_id = insert_item(
            &mut tx,
            sale_id,
            &product,
            quantity,
            unit_price.unwrap_or_else(|| product.unit_price()),
        )
        .await?;

        let total = refresh_totals(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, item_id = %item_id, total = %total, "Sale item added");
        self.publish(&sale.venue_id, ChangeOperation::Update, sale_id);

        Ok(item_id)
    }

    async fn update_item_tx(&self, item_id: &str, patch: ItemPatch) -> DbResult<()> {
        patch.validate()?;

        debug!(item_id = %item_id, ?patch, "Updating sale item");

        let mut tx = self.pool.begin().await?;

        let item = fetch_item(&mut tx, item_id).await?;
        let sale = fetch_sale_row(&mut tx, &item.sale_id).await?;
        lifecycle::ensure_editable(&item.sale_id, sale.status()?)?;

        let quantity = patch.quantity.unwrap_or(item.quantity);
        let delta = quantity - item.quantity;
        if delta > 0 {
            decrement_stock(&mut tx, &item.product_id, delta).await?;
        } else if delta < 0 {
            restore_stock(&mut tx, &item.product_id, -delta).await?;
        }

        let unit_price = patch.unit_price.unwrap_or_else(|| item.unit_price());
        sqlx::query(
            "UPDATE sale_items SET quantity = ?, unit_price_cents = ?, line_total_cents = ? \
             WHERE id = ?",
        )
        .bind(quantity)
        .bind(unit_price.cents())
        .bind(pricing::line_total(quantity, unit_price).cents())
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        let total = refresh_totals(&mut tx, &item.sale_id).await?;
        tx.commit().await?;

        info!(
            sale_id = %item.sale_id,
            item_id = %item_id,
            stock_delta = -delta,
            total = %total,
            "Sale item updated"
        );
        self.publish(&sale.venue_id, ChangeOperation::Update, &item.sale_id);

        Ok(())
    }

    async fn remove_item_tx(&self, item_id: &str) -> DbResult<()> {
        debug!(item_id = %item_id, "Removing sale item");

        let mut tx = self.pool.begin().await?;

        let item = fetch_item(&mut tx, item_id).await?;
        let sale = fetch_sale_row(&mut tx, &item.sale_id).await?;
        lifecycle::ensure_editable(&item.sale_id, sale.status()?)?;

        sqlx::query("DELETE FROM sale_items WHERE id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        restore_stock(&mut tx, &item.product_id, item.quantity).await?;

        let total = refresh_totals(&mut tx, &item.sale_id).await?;
        tx.commit().await?;

        info!(
            sale_id = %item.sale_id,
            item_id = %item_id,
            restored = item.quantity,
            total = %total,
            "Sale item removed"
        );
        self.publish(&sale.venue_id, ChangeOperation::Update, &item.sale_id);

        Ok(())
    }

    async fn transition_status_tx(
        &self,
        sale_id: &str,
        new_status: SaleStatus,
        reason: Option<&str>,
    ) -> DbResult<()> {
        debug!(sale_id = %sale_id, to = %new_status, "Transitioning sale");

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale_row(&mut tx, sale_id).await?;
        let from = sale.status()?;
        lifecycle::transition(sale_id, from, new_status)?;

        let reason = if lifecycle::requires_reason(new_status) {
            Some(validate_reason(reason.unwrap_or(""))?)
        } else {
            None
        };

        let mut restored = 0;
        if lifecycle::restores_stock(new_status) {
            for item in fetch_items(&mut tx, sale_id).await? {
                restore_stock(&mut tx, &item.product_id, item.quantity).await?;
                restored += item.quantity;
            }
        }

        sqlx::query(
            "UPDATE sales SET status = ?, refund_reason = COALESCE(?, refund_reason), \
             updated_at = ? WHERE id = ?",
        )
        .bind(new_status.as_str())
        .bind(&reason)
        .bind(Utc::now())
        .bind(sale_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, from = %from, to = %new_status, restored, "Sale transitioned");
        self.publish(&sale.venue_id, ChangeOperation::Update, sale_id);

        Ok(())
    }

    async fn list_sales_inner(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM sales WHERE venue_id = ", SALE_COLUMNS));
        builder.push_bind(&filter.venue_id);

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(employee_id) = &filter.employee_id {
            builder.push(" AND employee_id = ").push_bind(employee_id);
        }
        if let Some(from) = filter.from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND created_at < ").push_bind(to);
        }
        builder
            .push(" ORDER BY created_at DESC, sale_number DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_SALE_LIMIT).max(0));

        let rows: Vec<SaleRow> = builder.build_query_as().fetch_all(&mut *conn).await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = fetch_items(&mut conn, &row.id).await?;
            sales.push(row.into_sale(items)?);
        }

        debug!(venue_id = %filter.venue_id, count = sales.len(), "Listed sales");
        Ok(sales)
    }

    async fn get_sale_inner(&self, sale_id: &str) -> DbResult<Sale> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, sale_id).await
    }

    async fn get_product_inner(&self, product_id: &str) -> DbResult<Product> {
        self.products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }
}

/// Receipt of the sale already created under `key`, if any.
async fn fetch_receipt(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<SaleReceipt>> {
    let existing: Option<(String, i64)> =
        sqlx::query_as("SELECT id, sale_number FROM sales WHERE idempotency_key = ?")
            .bind(key)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(existing.map(|(sale_id, sale_number)| SaleReceipt {
        sale_id,
        sale_number,
        deduplicated: false,
    }))
}

fn deduplicated(receipt: SaleReceipt, key: &str) -> SaleReceipt {
    info!(sale_id = %receipt.sale_id, idempotency_key = %key, "Duplicate submission deduplicated");
    SaleReceipt {
        deduplicated: true,
        ..receipt
    }
}

fn is_idempotency_conflict(err: &DbError) -> bool {
    matches!(err, DbError::UniqueViolation { field, .. } if field == "sales.idempotency_key")
}

/// Logs the outcome of a gateway operation and converts the error.
fn observe<T>(operation: &'static str, result: DbResult<T>) -> GatewayResult<T> {
    match &result {
        Err(DbError::Domain(err)) => warn!(operation, error = %err, "Gateway rejected operation"),
        Err(err) => error!(operation, error = %err, "Gateway operation failed"),
        Ok(_) => {}
    }
    Ok(result?)
}

// =============================================================================
// Trait Implementations
// =============================================================================

#[async_trait]
impl TransactionGateway for SqliteGateway {
    async fn create_sale(&self, command: &CreateSaleCommand) -> GatewayResult<SaleReceipt> {
        observe("create_sale", self.create_sale_tx(command).await)
    }

    async fn add_item(
        &self,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Option<Money>,
    ) -> GatewayResult<String> {
        observe(
            "add_item",
            self.add_item_tx(sale_id, product_id, quantity, unit_price)
                .await,
        )
    }

    async fn update_item(
        &self,
        item_id: &str,
        quantity: Option<i64>,
        unit_price: Option<Money>,
    ) -> GatewayResult<()> {
        let patch = ItemPatch {
            quantity,
            unit_price,
        };
        observe("update_item", self.update_item_tx(item_id, patch).await)
    }

    async fn remove_item(&self, item_id: &str) -> GatewayResult<()> {
        observe("remove_item", self.remove_item_tx(item_id).await)
    }

    async fn transition_status(
        &self,
        sale_id: &str,
        new_status: SaleStatus,
        reason: Option<&str>,
    ) -> GatewayResult<()> {
        observe(
            "transition_status",
            self.transition_status_tx(sale_id, new_status, reason).await,
        )
    }

    async fn get_sale(&self, sale_id: &str) -> GatewayResult<Sale> {
        observe("get_sale", self.get_sale_inner(sale_id).await)
    }

    async fn list_sales(&self, filter: &SaleFilter) -> GatewayResult<Vec<Sale>> {
        observe("list_sales", self.list_sales_inner(filter).await)
    }
}

#[async_trait]
impl StockSnapshotProvider for SqliteGateway {
    async fn list(&self, filter: &ProductFilter) -> GatewayResult<Vec<Product>> {
        observe("list_products", self.products().list(filter).await)
    }

    async fn get(&self, product_id: &str) -> GatewayResult<Product> {
        observe("get_product", self.get_product_inner(product_id).await)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
