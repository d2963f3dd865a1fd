//! # Product Repository
//!
//! Stock snapshots and catalog seeding.
//!
//! Catalog management itself lives outside Tally; this repository only
//! writes products for the seed binary and tests. Stock is moved exclusively
//! by [`crate::SqliteGateway`] inside sale transactions.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::validation::{validate_price, validate_search_query};
use tally_core::{Product, ProductFilter};

/// Default page size when a filter has no limit.
const DEFAULT_LIST_LIMIT: i64 = 200;

pub(crate) const PRODUCT_COLUMNS: &str = "id, venue_id, name, category, unit_price_cents, \
     available_quantity, is_active, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: String,
    venue_id: String,
    name: String,
    category: Option<String>,
    unit_price_cents: i64,
    available_quantity: i64,
    is_active: bool,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            venue_id: row.venue_id,
            name: row.name,
            category: row.category,
            unit_price_cents: row.unit_price_cents,
            available_quantity: row.available_quantity,
            is_active: row.is_active,
            updated_at: row.updated_at,
        }
    }
}

/// Loads one product on an existing connection or transaction.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Product>> {
    let row: Option<ProductRow> =
        sqlx::query_as(&format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(row.map(Product::from))
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// repo.upsert(&product).await?;
/// let beers = repo.list(&ProductFilter { query: Some("lager".into()), ..filter }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products for a venue ordered by name.
    ///
    /// The name query is a case-insensitive substring match.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let query = validate_search_query(filter.query.as_deref().unwrap_or(""))
            .map_err(DbError::from)?;

        debug!(venue_id = %filter.venue_id, query = %query, "Listing products");

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM products WHERE venue_id = ", PRODUCT_COLUMNS));
        builder.push_bind(&filter.venue_id);

        if !query.is_empty() {
            builder
                .push(" AND name LIKE ")
                .push_bind(format!("%{}%", query))
                .push(" COLLATE NOCASE");
        }
        if filter.in_stock_only {
            builder.push(" AND available_quantity > 0");
        }
        if !filter.include_inactive {
            builder.push(" AND is_active = 1");
        }

        builder
            .push(" ORDER BY name LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0));

        let rows: Vec<ProductRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Product list returned");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Inserts a product or overwrites the existing row with the same id.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        validate_price(product.unit_price())?;
        debug!(id = %product.id, name = %product.name, "Upserting product");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, venue_id, name, category, unit_price_cents,
                available_quantity, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                venue_id = excluded.venue_id,
                name = excluded.name,
                category = excluded.category,
                unit_price_cents = excluded.unit_price_cents,
                available_quantity = excluded.available_quantity,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.venue_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.unit_price_cents)
        .bind(product.available_quantity)
        .bind(product.is_active)
        .bind(now)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts active products of a venue (for diagnostics).
    pub async fn count(&self, venue_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE venue_id = ? AND is_active = 1")
                .bind(venue_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{CoreError, ValidationError, DEFAULT_VENUE_ID};

    fn product(name: &str, available: i64) -> Product {
        Product {
            id: generate_product_id(),
            venue_id: DEFAULT_VENUE_ID.to_string(),
            name: name.to_string(),
            category: Some("Beer".to_string()),
            unit_price_cents: 650,
            available_quantity: available,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut lager = product("Lager", 24);
        repo.upsert(&lager).await.unwrap();

        lager.available_quantity = 12;
        repo.upsert(&lager).await.unwrap();

        let stored = repo.get_by_id(&lager.id).await.unwrap().unwrap();
        assert_eq!(stored.available_quantity, 12);
        assert_eq!(repo.count(DEFAULT_VENUE_ID).await.unwrap(), 1);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_rejects_out_of_range_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut bottle = product("Vintage Champagne", 1);
        bottle.unit_price_cents = i64::MAX;

        let err = repo.upsert(&bottle).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(repo.count(DEFAULT_VENUE_ID).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.upsert(&product("Lager", 24)).await.unwrap();
        repo.upsert(&product("Pale Ale", 0)).await.unwrap();
        let mut retired = product("Old Stout", 5);
        retired.is_active = false;
        repo.upsert(&retired).await.unwrap();

        let all = repo
            .list(&ProductFilter::for_venue(DEFAULT_VENUE_ID))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Lager");

        let in_stock = repo
            .list(&ProductFilter {
                in_stock_only: true,
                ..ProductFilter::for_venue(DEFAULT_VENUE_ID)
            })
            .await
            .unwrap();
        assert_eq!(in_stock.len(), 1);

        let search = repo
            .list(&ProductFilter {
                query: Some("  ale ".to_string()),
                ..ProductFilter::for_venue(DEFAULT_VENUE_ID)
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "Pale Ale");

        let other_venue = repo.list(&ProductFilter::for_venue("elsewhere")).await.unwrap();
        assert!(other_venue.is_empty());
    }
}
