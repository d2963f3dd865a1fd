//! # Sale Change Feed
//!
//! In-process fan-out of committed sale changes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SqliteGateway ── commit ──► publish(SaleChange) ──► broadcast channel  │
//! │                                                            │            │
//! │                         ┌──────────────────────────────────┼──────┐     │
//! │                         ▼                                  ▼      ▼     │
//! │              subscribe("venue-a")             subscribe("venue-b") ...  │
//! │              only venue-a events              only venue-b events       │
//! │                                                                         │
//! │  Dropping a subscription drops its receiver: that is the unsubscribe.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use tally_core::{ChangeFeed, ChangeSubscription, SaleChange};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Events buffered per subscriber before it starts lagging.
pub const DEFAULT_FEED_CAPACITY: usize = 256;

/// Broadcast-backed [`ChangeFeed`].
#[derive(Debug, Clone)]
pub struct SaleChangeFeed {
    sender: broadcast::Sender<SaleChange>,
}

impl SaleChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        SaleChangeFeed { sender }
    }

    /// Sends `change` to every live subscription. Having no subscribers is
    /// not an error.
    pub fn publish(&self, change: SaleChange) {
        debug!(
            venue_id = %change.venue_id,
            sale_id = %change.sale_id,
            operation = ?change.operation,
            "Publishing sale change"
        );
        if self.sender.send(change).is_err() {
            debug!("No change feed subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SaleChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for SaleChangeFeed {
    fn subscribe(&self, venue_id: &str) -> Box<dyn ChangeSubscription> {
        Box::new(VenueSubscription {
            venue_id: venue_id.to_string(),
            receiver: self.sender.subscribe(),
        })
    }
}

/// One venue's view of the feed.
struct VenueSubscription {
    venue_id: String,
    receiver: broadcast::Receiver<SaleChange>,
}

#[async_trait]
impl ChangeSubscription for VenueSubscription {
    async fn next(&mut self) -> Option<SaleChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.venue_id == self.venue_id => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(venue_id = %self.venue_id, skipped, "Change feed receiver lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ChangeOperation;

    #[tokio::test]
    async fn test_subscription_filters_by_venue() {
        let feed = SaleChangeFeed::new();
        let mut sub = feed.subscribe("venue-a");

        feed.publish(SaleChange::new("venue-b", ChangeOperation::Create, "s-1"));
        feed.publish(SaleChange::new("venue-a", ChangeOperation::Update, "s-2"));

        let change = sub.next().await.unwrap();
        assert_eq!(change.sale_id, "s-2");
        assert_eq!(change.operation, ChangeOperation::Update);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let feed = SaleChangeFeed::new();
        let sub = feed.subscribe("venue-a");
        assert_eq!(feed.subscriber_count(), 1);

        drop(sub);
        assert_eq!(feed.subscriber_count(), 0);

        // Publishing without subscribers is fine
        feed.publish(SaleChange::new("venue-a", ChangeOperation::Delete, "s-1"));
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = SaleChangeFeed::new();
        let mut sub = feed.subscribe("venue-a");
        drop(feed);
        assert!(sub.next().await.is_none());
    }
}
