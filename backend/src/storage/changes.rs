//! Change notification feed for committed writes.
//!
//! The original client kept list views fresh by re-fetching collections on a
//! fixed interval. Consumers here may do the same, or subscribe to this feed
//! for push-style updates; either way staleness stays bounded and no durable
//! subscription is relied on for correctness. Events are fired only after
//! the owning write batch has committed.

use tokio::sync::broadcast;

/// The collections an account's documents live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Apartments,
    Dues,
    Budget,
    LedgerEntries,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub account_id: String,
    pub collection: Collection,
}

/// Broadcast fan-out of committed changes. Lossy for slow receivers, which
/// is acceptable: a receiver that lags can always re-fetch.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish a committed change. Send errors only mean nobody is
    /// listening, which is fine.
    pub fn publish(&self, account_id: &str, collection: Collection) {
        let _ = self.sender.send(ChangeEvent {
            account_id: account_id.to_string(),
            collection,
        });
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_published_events() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish("acct-1", Collection::Dues);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.account_id, "acct-1");
        assert_eq!(event.collection, Collection::Dues);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_does_not_fail() {
        let feed = ChangeFeed::new();
        feed.publish("acct-1", Collection::Budget);
    }
}
