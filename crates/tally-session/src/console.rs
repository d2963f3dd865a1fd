//! # Console
//!
//! Builds one console session from a [`ConsoleConfig`] and owns its parts.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Console                                        │
//! │                                                                         │
//! │  [database] ──► DbConfig ──► Database ──► SqliteGateway (shared Arc)    │
//! │                                                 │                       │
//! │        ┌────────────────────────────────────────┼──────────────────┐    │
//! │        ▼                                        ▼                  ▼    │
//! │  SaleLifecycleManager           ChangeFeedSubscriber     DashboardService│
//! │  [sales].default_status         [venue].id               [dashboard]    │
//! │                                 [sales].working_set_limit [venue].name  │
//! │                                                                         │
//! │  start()    subscribe to the feed, load the working set, spawn the loop │
//! │  shutdown() stop the loop                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tally_core::{Attributable, ChangeFeed, Sale, SaleDraft, StockSnapshotProvider};
use tally_db::{Database, DbConfig, SqliteGateway};
use tracing::{debug, info};

use crate::config::ConsoleConfig;
use crate::dashboard::DashboardService;
use crate::error::{SaleOperation, SessionError, SessionResult};
use crate::manager::SaleLifecycleManager;
use crate::subscriber::{ChangeFeedSubscriber, SubscriberHandle};

pub struct Console {
    config: Arc<ConsoleConfig>,
    db: Arc<Database>,
    gateway: Arc<SqliteGateway>,
    manager: SaleLifecycleManager<SqliteGateway>,
    subscriber: ChangeFeedSubscriber<SqliteGateway>,
    dashboard: DashboardService<SqliteGateway>,
    feed_handle: Option<SubscriberHandle>,
}

impl Console {
    /// Opens the configured database and builds the session on it.
    pub async fn open(config: ConsoleConfig) -> SessionResult<Self> {
        config.validate()?;
        let db = Database::new(DbConfig::from(&config.database)).await?;
        Ok(Self::new(config, Arc::new(db)))
    }

    /// Builds the session on an already open database.
    pub fn new(config: ConsoleConfig, db: Arc<Database>) -> Self {
        let gateway = Arc::new(db.gateway());

        let manager = SaleLifecycleManager::new(Arc::clone(&gateway));
        let subscriber = ChangeFeedSubscriber::new(Arc::clone(&gateway), config.venue_id())
            .with_window(config.sales.working_set_limit);
        let dashboard = DashboardService::new(
            Arc::clone(&gateway),
            config.venue_id(),
            config.dashboard.clone(),
        )
        .with_venue_name(config.venue_name());

        debug!(
            venue_id = %config.venue_id(),
            default_status = %config.default_status(),
            "Console built"
        );

        Console {
            config: Arc::new(config),
            db,
            gateway,
            manager,
            subscriber,
            dashboard,
            feed_handle: None,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn manager(&self) -> &SaleLifecycleManager<SqliteGateway> {
        &self.manager
    }

    pub fn subscriber(&self) -> &ChangeFeedSubscriber<SqliteGateway> {
        &self.subscriber
    }

    pub fn dashboard(&self) -> &DashboardService<SqliteGateway> {
        &self.dashboard
    }

    pub fn is_running(&self) -> bool {
        self.feed_handle.is_some()
    }

    // -------------------------------------------------------------------------
    // Register
    // -------------------------------------------------------------------------

    /// An empty draft for this console's venue.
    pub fn new_draft(&self) -> SaleDraft {
        SaleDraft::for_venue(self.config.venue_id())
    }

    /// Adds one unit of a product, using a fresh stock snapshot as the
    /// ceiling. Returns the line's quantity.
    pub async fn add_product(&self, draft: &mut SaleDraft, product_id: &str) -> SessionResult<i64> {
        let op = SaleOperation::AddItem;
        let product = self
            .gateway
            .get(product_id)
            .await
            .map_err(|e| SessionError::gateway(op, e))?;
        draft.add_item(&product).map_err(|e| SessionError::core(op, e))
    }

    /// Submits with the configured initial status and puts the stored sale
    /// into the working set.
    pub async fn submit(&self, draft: &mut SaleDraft, attribution: Attributable) -> SessionResult<Sale> {
        let sale = self
            .manager
            .submit(draft, attribution, self.config.default_status())
            .await?;
        self.subscriber.replace(sale.clone()).await;
        Ok(sale)
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Subscribes to the change feed, loads the working set and starts the
    /// subscriber loop. Returns the working set size.
    pub async fn start(&mut self) -> SessionResult<usize> {
        if self.is_running() {
            return Ok(self.subscriber.sales().await.len());
        }

        // Subscribe before loading so no commit falls in between
        let subscription = self.db.feed().subscribe(self.config.venue_id());
        let loaded = self.subscriber.load().await?;
        self.feed_handle = Some(self.subscriber.spawn(subscription));

        info!(
            venue_id = %self.config.venue_id(),
            venue = %self.config.venue_name(),
            sales = loaded,
            "Console started"
        );
        Ok(loaded)
    }

    /// Stops the subscriber loop. The working set stays readable.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.feed_handle.take() {
            handle.shutdown().await;
            info!(venue_id = %self.config.venue_id(), "Console stopped");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tally_core::command::{CreateSaleCommand, IdempotencyKey, NewSaleLine};
    use tally_core::{
        PaymentMethod, Product, SaleStatus, TransactionGateway, DEFAULT_VENUE_ID,
    };

    async fn console(config: ConsoleConfig) -> Console {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .upsert(&Product {
                id: "p-mojito".into(),
                venue_id: config.venue_id().into(),
                name: "Mojito".into(),
                category: Some("Cocktails".into()),
                unit_price_cents: 1200,
                available_quantity: 2,
                is_active: true,
                updated_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        Console::new(config, Arc::new(db))
    }

    fn bartender() -> Attributable {
        Attributable::Employee {
            id: "e-7".into(),
            name: "Lu".into(),
            category: "bartender".into(),
        }
    }

    #[tokio::test]
    async fn test_submit_uses_configured_status() {
        let mut config = ConsoleConfig::default();
        config.sales.default_status = SaleStatus::Pending;
        let mut console = console(config).await;
        assert_eq!(console.start().await.unwrap(), 0);

        let mut draft = console.new_draft();
        console.add_product(&mut draft, "p-mojito").await.unwrap();
        assert_eq!(console.add_product(&mut draft, "p-mojito").await.unwrap(), 2);
        // Ceiling is the snapshot's stock
        assert_eq!(console.add_product(&mut draft, "p-mojito").await.unwrap(), 2);

        let sale = console.submit(&mut draft, bartender()).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(sale.total_cents, 2400);
        assert!(draft.is_empty());
        assert_eq!(console.subscriber().sale(&sale.id).await.unwrap(), sale);

        console.shutdown().await;
        assert!(!console.is_running());
    }

    #[tokio::test]
    async fn test_components_follow_config() {
        let mut config = ConsoleConfig::default();
        config.venue.name = "Rooftop".into();
        config.sales.working_set_limit = 25;
        let console = console(config).await;

        assert_eq!(console.subscriber().venue_id(), DEFAULT_VENUE_ID);
        assert_eq!(console.subscriber().window(), 25);
        assert_eq!(console.new_draft().venue_id, DEFAULT_VENUE_ID);

        let now = chrono::Utc::now();
        let period = crate::dashboard::ReportPeriod::ending_at(now, chrono::Duration::hours(8)).unwrap();
        let report = console.dashboard().report(period).await.unwrap();
        assert_eq!(report.venue_name, "Rooftop");
    }

    #[tokio::test]
    async fn test_started_console_sees_other_sessions() {
        let mut console = console(ConsoleConfig::default()).await;
        console.start().await.unwrap();

        // Another register on the same store
        let other = console.db.gateway();
        let receipt = other
            .create_sale(&CreateSaleCommand {
                idempotency_key: IdempotencyKey::new(),
                venue_id: DEFAULT_VENUE_ID.into(),
                attribution: bartender(),
                items: vec![NewSaleLine {
                    product_id: "p-mojito".into(),
                    quantity: 1,
                    unit_price_cents: 1200,
                }],
                payment_method: PaymentMethod::Cash,
                discount_cents: 0,
                tax_cents: 0,
                notes: None,
                initial_status: SaleStatus::Completed,
            })
            .await
            .unwrap();

        let mut seen = false;
        for _ in 0..100 {
            if console.subscriber().sale(&receipt.sale_id).await.is_some() {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen);
        console.shutdown().await;
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let mut config = ConsoleConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(
            Console::open(config).await,
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_open_creates_configured_database() {
        let dir = std::env::temp_dir().join(format!("tally-console-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut config = ConsoleConfig::default();
        config.database.path = dir.join("venue.db");
        config.database.max_connections = 2;

        let mut console = Console::open(config).await.unwrap();
        assert_eq!(console.start().await.unwrap(), 0);
        assert!(PathBuf::from(&console.config().database.path).exists());

        console.shutdown().await;
        console.db.close().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
