//! Per-session read-through cache over the order store
//!
//! Each slot keeps two entries: the fresh value, dropped on invalidation, and the last
//! value successfully fetched in this session. Reads hit the fresh entry first, then the
//! store; when the store fails the last good value is served instead. Entries never
//! expire on their own; the whole cache goes away with its session.

use moka::future::Cache;
use std::future::Future;
use std::time::Duration;

use crate::models::catalog::CatalogEntry;
use crate::models::common::ReadSource;
use crate::models::order::{Order, OrderDetail, OrderItem};
use crate::services::sheets_store::{OrderStore, StoreError};

const ORDERS_KEY: &str = "orders";
const ITEMS_KEY: &str = "items";
const CATALOG_KEY: &str = "catalog";

fn detail_key(order_number: &str) -> String {
    format!("detail:{}", order_number)
}

/// Result of a cached read: the data, where it came from, and why it is degraded
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    pub source: ReadSource,
    pub error: Option<StoreError>,
}

impl<T> Fetched<T> {
    /// User-facing notice when the read was degraded
    pub fn notice(&self) -> Option<&'static str> {
        self.error.as_ref().map(StoreError::notice)
    }

    pub fn is_degraded(&self) -> bool {
        self.source.is_degraded()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            source: self.source,
            error: self.error,
        }
    }
}

#[derive(Clone)]
struct ReadThrough<V>
where
    V: Clone + Send + Sync + 'static,
{
    fresh: Cache<String, V>,
    last_good: Cache<String, V>,
}

impl<V> ReadThrough<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            fresh: Cache::builder().build(),
            last_good: Cache::builder().build(),
        }
    }

    /// `fetch` returning `Ok(None)` means "does not exist"; that answer is not cached
    async fn read<F, Fut>(&self, key: String, fetch: F) -> Fetched<Option<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, StoreError>>,
    {
        if let Some(value) = self.fresh.get(&key).await {
            tracing::debug!("Cache hit for {}", key);
            return Fetched {
                data: Some(value),
                source: ReadSource::Cache,
                error: None,
            };
        }

        match fetch().await {
            Ok(Some(value)) => {
                self.fresh.insert(key.clone(), value.clone()).await;
                self.last_good.insert(key, value.clone()).await;
                Fetched {
                    data: Some(value),
                    source: ReadSource::Remote,
                    error: None,
                }
            }
            Ok(None) => Fetched {
                data: None,
                source: ReadSource::Remote,
                error: None,
            },
            Err(e) => match self.last_good.get(&key).await {
                Some(value) => {
                    tracing::warn!("Serving stale {} after read failure: {}", key, e);
                    Fetched {
                        data: Some(value),
                        source: ReadSource::StaleCache,
                        error: Some(e),
                    }
                }
                None => {
                    tracing::warn!("No cached {} to fall back to: {}", key, e);
                    Fetched {
                        data: None,
                        source: ReadSource::Unavailable,
                        error: Some(e),
                    }
                }
            },
        }
    }

    async fn invalidate(&self, key: &str) {
        self.fresh.invalidate(key).await;
    }

    fn invalidate_all(&self) {
        self.fresh.invalidate_all();
    }
}

/// Cache owned by one user session
#[derive(Clone)]
pub struct SessionCache {
    orders: ReadThrough<Vec<Order>>,
    items: ReadThrough<Vec<OrderItem>>,
    catalog: ReadThrough<Vec<CatalogEntry>>,
    details: ReadThrough<OrderDetail>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            orders: ReadThrough::new(),
            items: ReadThrough::new(),
            catalog: ReadThrough::new(),
            details: ReadThrough::new(),
        }
    }

    pub async fn get_orders_table(&self, store: &OrderStore) -> Fetched<Vec<Order>> {
        self.orders
            .read(ORDERS_KEY.to_string(), || async { store.read_orders().await.map(Some) })
            .await
            .map(Option::unwrap_or_default)
    }

    pub async fn get_items_table(&self, store: &OrderStore) -> Fetched<Vec<OrderItem>> {
        self.items
            .read(ITEMS_KEY.to_string(), || async { store.read_items().await.map(Some) })
            .await
            .map(Option::unwrap_or_default)
    }

    pub async fn get_catalog(&self, store: &OrderStore) -> Fetched<Vec<CatalogEntry>> {
        self.catalog
            .read(CATALOG_KEY.to_string(), || async { store.read_catalog().await.map(Some) })
            .await
            .map(Option::unwrap_or_default)
    }

    pub async fn get_order_detail(&self, store: &OrderStore, order_number: &str) -> Fetched<Option<OrderDetail>> {
        self.details
            .read(detail_key(order_number), || store.get_order_with_items(order_number))
            .await
    }

    pub async fn invalidate_orders(&self) {
        self.orders.invalidate(ORDERS_KEY).await;
    }

    pub async fn invalidate_items(&self) {
        self.items.invalidate(ITEMS_KEY).await;
    }

    pub async fn invalidate_detail(&self, order_number: &str) {
        self.details.invalidate(&detail_key(order_number)).await;
    }

    /// Drop every fresh entry, e.g. after the whole remote was rewritten
    pub fn invalidate_all(&self) {
        self.orders.invalidate_all();
        self.items.invalidate_all();
        self.catalog.invalidate_all();
        self.details.invalidate_all();
    }
}

/// Session id -> cache. A session's cache is dropped after it has been idle for
/// `idle_timeout`.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Cache<String, SessionCache>,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Cache::builder().time_to_idle(idle_timeout).build(),
        }
    }

    pub async fn session(&self, session_id: &str) -> SessionCache {
        self.sessions
            .get_with(session_id.to_string(), async {
                tracing::debug!("Starting session cache for {}", session_id);
                SessionCache::new()
            })
            .await
    }

    /// End a session explicitly
    pub async fn end(&self, session_id: &str) {
        self.sessions.invalidate(session_id).await;
    }

    /// Drop every session, e.g. when the spreadsheet itself changed
    pub fn clear(&self) {
        self.sessions.invalidate_all();
    }
}
