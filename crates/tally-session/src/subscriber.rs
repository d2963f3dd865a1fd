//! # Change Feed Subscriber
//!
//! Keeps a console's working set of sales in line with changes committed by
//! other sessions.
//!
//! ## Event Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ChangeSubscription::next()                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  other venue? ───────────────────────────────────────────► Ignored      │
//! │       │                                                                 │
//! │  sale has an open edit session? ─── count it, drop it ───► Suppressed   │
//! │       │                                                                 │
//! │  Delete ───────────────────────── evict from working set ─► Removed     │
//! │       │                                                                 │
//! │  Create / Update ── refetch ── found ──── upsert ─────────► Merged      │
//! │                               not found ─ evict ─────────► Removed     │
//! │                                                                         │
//! │  end_edit_session(token) ── reconcile the window, then refetch the      │
//! │                              ended session's sale                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Edit Sessions
//! While a user has a sale open for editing, remote events for that sale
//! must not overwrite what they are looking at. Each open editor holds an
//! [`EditSessionToken`]; events for a sale with at least one open token are
//! dropped. Ending a session refetches the newest `window` sales plus the
//! edited sale itself, so nothing missed while the editor was open is lost.
//!
//! The working set lock is never held across a gateway call. Every merge
//! bumps a revision counter; a reconcile keeps the local copy of any sale
//! merged after its fetch started.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally_core::{
    ChangeOperation, ChangeSubscription, CoreError, GatewayError, Sale, SaleChange, SaleFilter,
    TransactionGateway,
};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SaleOperation, SessionError, SessionResult};

/// Newest sales a reconcile fetches unless configured otherwise.
pub const DEFAULT_WORKING_SET_LIMIT: i64 = 500;

// =============================================================================
// Types
// =============================================================================

/// Proof that an editor is open for one sale.
///
/// Not `Clone`: ending a session consumes the token, so a session cannot be
/// ended twice.
#[derive(Debug, PartialEq, Eq)]
pub struct EditSessionToken {
    id: Uuid,
    sale_id: String,
}

impl EditSessionToken {
    pub fn sale_id(&self) -> &str {
        &self.sale_id
    }
}

/// What [`ChangeFeedSubscriber::apply`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// Refetched and upserted.
    Merged,
    /// Evicted from the working set.
    Removed,
    /// Dropped because the sale has an open edit session.
    Suppressed,
    /// Scoped to another venue.
    Ignored,
}

#[derive(Debug, Default)]
struct WorkingSet {
    sales: HashMap<String, Sale>,
    sessions: HashMap<Uuid, String>,
    suppressed: u64,
    revision: u64,
    /// Revision at which each sale was last merged or evicted.
    touched: HashMap<String, u64>,
}

impl WorkingSet {
    fn is_editing(&self, sale_id: &str) -> bool {
        self.sessions.values().any(|id| id == sale_id)
    }

    fn touch(&mut self, sale_id: &str) {
        self.revision += 1;
        self.touched.insert(sale_id.to_string(), self.revision);
    }

    fn touched_since(&self, sale_id: &str, revision: u64) -> bool {
        self.touched.get(sale_id).is_some_and(|r| *r > revision)
    }

    fn merge(&mut self, sale: Sale) {
        self.touch(&sale.id);
        self.sales.insert(sale.id.clone(), sale);
    }

    fn evict(&mut self, sale_id: &str) {
        self.touch(sale_id);
        self.sales.remove(sale_id);
    }

    /// Installs the result of refetching one sale.
    fn install(
        &mut self,
        sale_id: &str,
        fetched: Result<Sale, GatewayError>,
    ) -> SessionResult<ApplyOutcome> {
        match fetched {
            Ok(sale) => {
                debug!(sale_id = %sale.id, status = %sale.status, "Sale merged");
                self.merge(sale);
                Ok(ApplyOutcome::Merged)
            }
            Err(GatewayError::Domain(CoreError::SaleNotFound(_))) => {
                self.evict(sale_id);
                debug!(sale_id = %sale_id, "Sale no longer exists; evicted");
                Ok(ApplyOutcome::Removed)
            }
            Err(err) => Err(SessionError::gateway(SaleOperation::Reconcile, err)),
        }
    }

    fn suppress(&mut self, change: &SaleChange) -> ApplyOutcome {
        self.suppressed += 1;
        warn!(
            sale_id = %change.sale_id,
            operation = ?change.operation,
            "Dropping change for sale under edit"
        );
        ApplyOutcome::Suppressed
    }
}

// =============================================================================
// Subscriber
// =============================================================================

/// Change Feed Subscriber for one venue.
///
/// Cheap to clone; clones share the working set and the open sessions.
pub struct ChangeFeedSubscriber<G> {
    gateway: Arc<G>,
    venue_id: String,
    window: i64,
    state: Arc<RwLock<WorkingSet>>,
}

impl<G> Clone for ChangeFeedSubscriber<G> {
    fn clone(&self) -> Self {
        ChangeFeedSubscriber {
            gateway: Arc::clone(&self.gateway),
            venue_id: self.venue_id.clone(),
            window: self.window,
            state: Arc::clone(&self.state),
        }
    }
}

impl<G: TransactionGateway + 'static> ChangeFeedSubscriber<G> {
    pub fn new(gateway: Arc<G>, venue_id: impl Into<String>) -> Self {
        ChangeFeedSubscriber {
            gateway,
            venue_id: venue_id.into(),
            window: DEFAULT_WORKING_SET_LIMIT,
            state: Arc::new(RwLock::new(WorkingSet::default())),
        }
    }

    /// Sets how many of the newest sales a reconcile fetches. Older sales
    /// stay reachable through [`ChangeFeedSubscriber::apply`] and edit
    /// sessions.
    pub fn with_window(mut self, limit: i64) -> Self {
        self.window = limit.max(1);
        self
    }

    pub fn venue_id(&self) -> &str {
        &self.venue_id
    }

    pub fn window(&self) -> i64 {
        self.window
    }

    /// Initial full fetch of the venue's sales. Returns the working set size.
    pub async fn load(&self) -> SessionResult<usize> {
        self.reconcile().await
    }

    /// Replaces the working set with the newest `window` sales, keeping the
    /// local copy of every sale that has an open edit session or was merged
    /// while the fetch was in flight.
    async fn reconcile(&self) -> SessionResult<usize> {
        let started = self.state.read().await.revision;
        let filter = SaleFilter {
            limit: Some(self.window),
            ..SaleFilter::for_venue(&self.venue_id)
        };
        let fetched = self
            .gateway
            .list_sales(&filter)
            .await
            .map_err(|e| SessionError::gateway(SaleOperation::Reconcile, e))?;

        let mut state = self.state.write().await;
        let keep_local = |state: &WorkingSet, sale_id: &str| {
            state.is_editing(sale_id) || state.touched_since(sale_id, started)
        };

        let mut sales: HashMap<String, Sale> = HashMap::with_capacity(fetched.len());
        for sale in fetched {
            if !keep_local(&*state, &sale.id) {
                sales.insert(sale.id.clone(), sale);
            }
        }
        let local: Vec<String> = state
            .sales
            .keys()
            .filter(|id| keep_local(&*state, id.as_str()))
            .cloned()
            .collect();
        for sale_id in local {
            if let Some(sale) = state.sales.remove(&sale_id) {
                sales.insert(sale_id, sale);
            }
        }
        state.sales = sales;
        state.touched.retain(|_, revision| *revision > started);

        info!(venue_id = %self.venue_id, sales = state.sales.len(), "Working set reconciled");
        Ok(state.sales.len())
    }

    /// Applies one feed event to the working set.
    pub async fn apply(&self, change: &SaleChange) -> SessionResult<ApplyOutcome> {
        if change.venue_id != self.venue_id {
            debug!(venue_id = %change.venue_id, "Ignoring change for other venue");
            return Ok(ApplyOutcome::Ignored);
        }

        {
            let mut state = self.state.write().await;
            if state.is_editing(&change.sale_id) {
                return Ok(state.suppress(change));
            }
            if change.operation == ChangeOperation::Delete {
                state.evict(&change.sale_id);
                debug!(sale_id = %change.sale_id, "Sale evicted");
                return Ok(ApplyOutcome::Removed);
            }
        }

        let fetched = self.gateway.get_sale(&change.sale_id).await;

        let mut state = self.state.write().await;
        // An editor may have opened while the fetch was in flight
        if state.is_editing(&change.sale_id) {
            return Ok(state.suppress(change));
        }
        state.install(&change.sale_id, fetched)
    }

    // -------------------------------------------------------------------------
    // Edit Sessions
    // -------------------------------------------------------------------------

    /// Opens an edit session for `sale_id`. Feed events for the sale are
    /// dropped until every session on it has ended.
    pub async fn begin_edit_session(&self, sale_id: &str) -> EditSessionToken {
        let token = EditSessionToken {
            id: Uuid::new_v4(),
            sale_id: sale_id.to_string(),
        };
        self.state
            .write()
            .await
            .sessions
            .insert(token.id, token.sale_id.clone());

        debug!(sale_id = %sale_id, session = %token.id, "Edit session opened");
        token
    }

    /// Closes an edit session, reconciles the working set and refetches the
    /// edited sale, which may be older than the reconcile window.
    pub async fn end_edit_session(&self, token: EditSessionToken) -> SessionResult<usize> {
        let removed = self.state.write().await.sessions.remove(&token.id);
        if removed.is_none() {
            return Err(SessionError::UnknownEditSession(token.id.to_string()));
        }

        debug!(sale_id = %token.sale_id, session = %token.id, "Edit session closed");
        self.reconcile().await?;

        let fetched = self
            .gateway
            .get_sale(&token.sale_id)
            .await
            .and_then(|sale| {
                if sale.venue_id == self.venue_id {
                    Ok(sale)
                } else {
                    Err(CoreError::SaleNotFound(token.sale_id.clone()).into())
                }
            });

        let mut state = self.state.write().await;
        if !state.is_editing(&token.sale_id) {
            state.install(&token.sale_id, fetched)?;
        }
        Ok(state.sales.len())
    }

    /// Puts an authoritative copy (usually a Lifecycle Manager result) into
    /// the working set, even while the sale is being edited.
    pub async fn replace(&self, sale: Sale) {
        if sale.venue_id == self.venue_id {
            self.state.write().await.merge(sale);
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub async fn sale(&self, sale_id: &str) -> Option<Sale> {
        self.state.read().await.sales.get(sale_id).cloned()
    }

    /// Working set, newest first.
    pub async fn sales(&self) -> Vec<Sale> {
        let mut sales: Vec<Sale> = self.state.read().await.sales.values().cloned().collect();
        sales.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.sale_number.cmp(&a.sale_number))
        });
        sales
    }

    /// Events dropped because of open edit sessions since creation.
    pub async fn suppressed_count(&self) -> u64 {
        self.state.read().await.suppressed
    }

    pub async fn is_editing(&self, sale_id: &str) -> bool {
        self.state.read().await.is_editing(sale_id)
    }

    // -------------------------------------------------------------------------
    // Background Loop
    // -------------------------------------------------------------------------

    /// Runs the event loop on a tokio task until the feed closes or the
    /// handle is shut down. Dropping the subscription on exit unsubscribes.
    pub fn spawn(&self, mut subscription: Box<dyn ChangeSubscription>) -> SubscriberHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let subscriber = self.clone();

        let task = tokio::spawn(async move {
            info!(venue_id = %subscriber.venue_id, "Change feed subscriber started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Change feed subscriber shutting down");
                        break;
                    }
                    change = subscription.next() => {
                        let Some(change) = change else {
                            info!("Change feed closed");
                            break;
                        };
                        if let Err(e) = subscriber.apply(&change).await {
                            warn!(sale_id = %change.sale_id, error = %e, "Failed to apply change");
                        }
                    }
                }
            }
        });

        SubscriberHandle { shutdown_tx, task }
    }
}

/// Handle to a running subscriber loop.
pub struct SubscriberHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SubscriberHandle {
    /// Stops the loop and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Change feed subscriber task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
