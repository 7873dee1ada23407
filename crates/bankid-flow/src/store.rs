//! Durable, TTL-bounded order storage.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::order::{Order, TransactionId};

/// Storage contract the stateless request path resumes polling through.
///
/// Entries are keyed by transaction id and bounded by the ttl given at save
/// time; expiry must behave identically to [`OrderStore::delete`].
/// Implementations must be safe under concurrent saves and loads for the
/// same key. Last save wins for racing writers; no cross-key ordering is
/// required. An implementation wanting at-most-once finalize semantics under
/// racing duplicate checks can add a compare-and-swap step; the engine does
/// not require one.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist `order` under its transaction id for at most `ttl`.
    async fn save(&self, order: &Order, ttl: Duration) -> Result<(), Error>;

    /// Fetch the order stored under `transaction_id`, if it exists and has
    /// not expired.
    async fn load(&self, transaction_id: &TransactionId) -> Result<Option<Order>, Error>;

    /// Remove the order stored under `transaction_id`, if any.
    async fn delete(&self, transaction_id: &TransactionId) -> Result<(), Error>;
}

/// Reference in-memory store.
///
/// Expired entries are filtered on load and swept on save; no background
/// reaper is needed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<TransactionId, (Order, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn save(&self, order: &Order, ttl: Duration) -> Result<(), Error> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.1 > now);
        entries.insert(order.transaction_id, (order.clone(), now + ttl));
        Ok(())
    }

    async fn load(&self, transaction_id: &TransactionId) -> Result<Option<Order>, Error> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(transaction_id)
            .filter(|entry| entry.1 > Instant::now())
            .map(|entry| entry.0.clone()))
    }

    async fn delete(&self, transaction_id: &TransactionId) -> Result<(), Error> {
        self.entries.write().await.remove(transaction_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderKind, OrderStatus};

    fn pending_order() -> Order {
        Order {
            transaction_id: TransactionId::new(),
            order_ref: "131daac9-16c6-4618-beb0-365768f37288".to_owned(),
            kind: OrderKind::Auth,
            action_name: "LOGIN".to_owned(),
            status: OrderStatus::Pending,
            hint_code: None,
            auto_start_token: "7c40b5c9-fa74-49cf-b98c-bfe651f9a7c6".to_owned(),
            qr_start_token: "67df3917-fa0d-44e5-b327-edcc928297f8".to_owned(),
            qr_start_secret: "d28db9a7-4cde-429e-a983-359be676944c".to_owned(),
            started_at: 0,
            qr: None,
            context: None,
            completion_data: None,
            finalize_data: None,
            detail: None,
        }
    }

    #[tokio::test]
    async fn saved_orders_load_back() {
        let store = MemoryStore::new();
        let order = pending_order();
        store.save(&order, Duration::from_secs(60)).await.unwrap();
        let loaded = store.load(&order.transaction_id).await.unwrap();
        assert_eq!(loaded, Some(order));
    }

    #[tokio::test]
    async fn deleted_orders_are_gone() {
        let store = MemoryStore::new();
        let order = pending_order();
        store.save(&order, Duration::from_secs(60)).await.unwrap();
        store.delete(&order.transaction_id).await.unwrap();
        assert_eq!(store.load(&order.transaction_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expiry_behaves_like_delete() {
        let store = MemoryStore::new();
        let order = pending_order();
        store.save(&order, Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.load(&order.transaction_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_save_wins_for_the_same_key() {
        let store = MemoryStore::new();
        let mut order = pending_order();
        store.save(&order, Duration::from_secs(60)).await.unwrap();
        order.status = OrderStatus::Complete;
        store.save(&order, Duration::from_secs(60)).await.unwrap();
        let loaded = store.load(&order.transaction_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Complete);
    }
}
