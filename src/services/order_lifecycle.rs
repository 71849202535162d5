//! Order lifecycle: numbering, creation, lookup, filtering and status changes
//!
//! Writes always land in the local mirror first (after a backup) and are then pushed to
//! the remote spreadsheet. A failed push does not undo the local write; it is reported
//! back as a `RemoteSync::Failed` warning. Writes are serialized and start from freshly
//! read tables. Reads go through the caller's session cache and never fail.

use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::catalog::{CatalogEntry, CatalogQuery};
use crate::models::config::{BackupInfo, RestoreBackupResponse};
use crate::models::dashboard::DashboardSummary;
use crate::models::order::{
    next_order_number, timestamp, CreateOrderRequest, CreateOrderResponse, Order, OrderDetail,
    OrderFilter, OrderItem, OrderStatus, RemoteSync, StatusUpdateResponse, Urgency,
};
use crate::services::local_mirror::{LocalMirror, MirrorError};
use crate::services::session_cache::{Fetched, SessionCache};
use crate::services::sheets_store::{OrderStore, StoreError, QUOTA_NOTICE};

#[derive(Debug)]
pub enum OrderError {
    Validation(String),
    NotFound(String),
    Store(StoreError),
    Mirror(MirrorError),
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderError::Validation(msg) => write!(f, "Invalid order: {}", msg),
            OrderError::NotFound(number) => write!(f, "Order {} not found", number),
            OrderError::Store(e) => write!(f, "{}", e),
            OrderError::Mirror(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OrderError {}

impl From<StoreError> for OrderError {
    fn from(e: StoreError) -> Self {
        OrderError::Store(e)
    }
}

impl From<MirrorError> for OrderError {
    fn from(e: MirrorError) -> Self {
        OrderError::Mirror(e)
    }
}

#[derive(Clone)]
pub struct OrderService {
    store: OrderStore,
    mirror: LocalMirror,
    /// Held from reading the tables until the local and remote writes are done
    write_lock: Arc<Mutex<()>>,
}

impl OrderService {
    pub fn new(store: OrderStore, mirror: LocalMirror) -> Self {
        Self {
            store,
            mirror,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    /// Number the next order would get. Falls back to REQ-001 when the orders table
    /// cannot be read.
    pub async fn generate_order_number(&self, cache: &SessionCache) -> String {
        let orders = cache.get_orders_table(&self.store).await;
        next_order_number(&orders.data)
    }

    /// Both tables read straight from the store. Session caches may be stale (another
    /// session's write only invalidates its own cache) and a failed read must not pass
    /// for an empty table, so writes never start from cached data.
    async fn current_tables(&self) -> Result<(Vec<Order>, Vec<OrderItem>), OrderError> {
        let orders = self.store.read_orders().await?;
        let items = self.store.read_items().await?;
        Ok((orders, items))
    }

    pub async fn create_order(
        &self,
        cache: &SessionCache,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, OrderError> {
        validate(&request)?;

        let _guard = self.write_lock.lock().await;
        let (mut orders, mut items) = self.current_tables().await?;
        let order_number = next_order_number(&orders);
        let now = timestamp();

        let order = Order {
            order_number: order_number.clone(),
            created_at: now.clone(),
            client: request.client.trim().to_string(),
            rack: request.rack.trim().to_string(),
            location: request.location.trim().to_string(),
            requester: request.requester.trim().to_string(),
            notes: request.notes.unwrap_or_default(),
            urgent: Urgency::from_flag(request.urgent),
            status: OrderStatus::Pending,
            last_updated_at: now,
            last_updated_by: request.requester.trim().to_string(),
        };
        let new_items: Vec<OrderItem> = request
            .items
            .into_iter()
            .map(|item| OrderItem {
                order_number: order_number.clone(),
                part_code: item.part_code,
                cable_code: item.cable_code,
                section: item.section,
                color: item.color,
                quantity: item.quantity,
            })
            .collect();

        orders.push(order.clone());
        items.extend(new_items.iter().cloned());

        self.mirror.backup().await?;
        self.mirror.persist(&orders, &items).await?;
        tracing::info!(
            "Created order {} with {} items for {}",
            order_number,
            new_items.len(),
            order.client
        );

        let remote = remote_outcome(
            self.store.append_order(&order, &new_items).await,
            &order_number,
        );

        cache.invalidate_orders().await;
        cache.invalidate_items().await;

        Ok(CreateOrderResponse {
            order_number,
            remote,
        })
    }

    /// Orders matching every given filter. Degraded reads give stale or empty data.
    pub async fn find_orders(&self, cache: &SessionCache, filter: &OrderFilter) -> Fetched<Vec<Order>> {
        cache
            .get_orders_table(&self.store)
            .await
            .map(|orders| filter_orders(orders, filter))
    }

    pub async fn get_order_detail(&self, cache: &SessionCache, order_number: &str) -> Fetched<Option<OrderDetail>> {
        cache.get_order_detail(&self.store, order_number).await
    }

    /// Set a new status. The order and table caches are invalidated whatever the
    /// outcome.
    pub async fn update_status(
        &self,
        cache: &SessionCache,
        order_number: &str,
        new_status: OrderStatus,
        updated_by: &str,
    ) -> Result<StatusUpdateResponse, OrderError> {
        let result = self
            .apply_status_update(order_number, new_status, updated_by)
            .await;

        cache.invalidate_orders().await;
        cache.invalidate_items().await;
        cache.invalidate_detail(order_number).await;

        result
    }

    async fn apply_status_update(
        &self,
        order_number: &str,
        new_status: OrderStatus,
        updated_by: &str,
    ) -> Result<StatusUpdateResponse, OrderError> {
        let updated_by = updated_by.trim();
        if updated_by.is_empty() {
            return Err(OrderError::Validation("updated_by is required".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let (mut orders, items) = self.current_tables().await?;
        let order = orders
            .iter_mut()
            .find(|o| o.order_number == order_number)
            .ok_or_else(|| OrderError::NotFound(order_number.to_string()))?;

        let previous = order.status;
        let updates = order.apply_status(new_status, updated_by, &timestamp());
        let order = order.clone();

        self.mirror.backup().await?;
        self.mirror.persist(&orders, &items).await?;
        tracing::info!(
            "Order {} moved from {} to {} by {}",
            order_number,
            previous,
            new_status,
            updated_by
        );

        let remote = remote_outcome(
            self.store.update_order_fields(order_number, &updates).await,
            order_number,
        );

        Ok(StatusUpdateResponse { order, remote })
    }

    pub async fn dashboard(&self, cache: &SessionCache) -> DashboardSummary {
        let fetched = self.find_orders(cache, &OrderFilter::default()).await;
        let mut summary = DashboardSummary::from_orders(&fetched.data);
        summary.notice = fetched.notice().map(str::to_string);
        summary
    }

    pub async fn catalog(&self, cache: &SessionCache, query: &CatalogQuery) -> Fetched<Vec<CatalogEntry>> {
        cache
            .get_catalog(&self.store)
            .await
            .map(|entries| entries.into_iter().filter(|e| e.matches(query)).collect())
    }

    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, OrderError> {
        Ok(self.mirror.list_backups().await?)
    }

    /// Put a backup back in place locally and rewrite the remote tables from it
    pub async fn restore_backup(&self, cache: &SessionCache, name: &str) -> Result<RestoreBackupResponse, OrderError> {
        let _guard = self.write_lock.lock().await;
        let (orders, items) = self.mirror.restore(name).await?;

        let remote = match self.store.write_full(&orders, &items).await {
            Ok(()) => RemoteSync::Synced,
            Err(e) => {
                tracing::warn!("Backup {} restored locally only: {}", name, e);
                failed_sync(&e)
            }
        };
        cache.invalidate_all();

        Ok(RestoreBackupResponse {
            name: name.to_string(),
            orders: orders.len(),
            items: items.len(),
            remote,
        })
    }
}

fn validate(request: &CreateOrderRequest) -> Result<(), OrderError> {
    if request.client.trim().is_empty() {
        return Err(OrderError::Validation("client is required".to_string()));
    }
    if request.requester.trim().is_empty() {
        return Err(OrderError::Validation("requester is required".to_string()));
    }
    if request.items.is_empty() {
        return Err(OrderError::Validation("an order needs at least one item".to_string()));
    }
    if let Some(item) = request.items.iter().find(|item| item.quantity == 0) {
        return Err(OrderError::Validation(format!(
            "quantity of {} must be at least 1",
            item.part_code
        )));
    }
    Ok(())
}

fn remote_outcome(result: Result<(), StoreError>, order_number: &str) -> RemoteSync {
    match result {
        Ok(()) => RemoteSync::Synced,
        Err(e) => {
            tracing::warn!("Order {} saved locally only: {}", order_number, e);
            failed_sync(&e)
        }
    }
}

fn failed_sync(e: &StoreError) -> RemoteSync {
    let warning = if e.is_quota() {
        format!("Dados salvos localmente. {}", QUOTA_NOTICE)
    } else {
        format!("Dados salvos localmente, mas o Google Sheets não foi atualizado: {}", e)
    };
    RemoteSync::Failed {
        warning,
        quota: e.is_quota(),
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Number, client and status filters first, then the date bounds and the urgent
/// filter. Empty text filters are ignored.
pub fn filter_orders(orders: Vec<Order>, filter: &OrderFilter) -> Vec<Order> {
    let number = filter.order_number.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let client = filter.client.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let dated = filter.created_from.is_some() || filter.created_to.is_some();

    orders
        .into_iter()
        .filter(|o| number.is_none_or(|n| contains_ignore_case(&o.order_number, n)))
        .filter(|o| client.is_none_or(|c| contains_ignore_case(&o.client, c)))
        .filter(|o| filter.status.is_none_or(|s| o.status == s))
        .filter(|o| {
            if !dated {
                return true;
            }
            let Some(date) = o.created_date() else {
                return false;
            };
            filter.created_from.is_none_or(|from| date >= from)
                && filter.created_to.is_none_or(|to| date <= to)
        })
        .filter(|o| !filter.urgent_pending || o.is_urgent_pending())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::ReadSource;
    use crate::models::order::{columns, CreateOrderItem};
    use crate::models::sheet::Grid;
    use crate::services::sheets_memory::{ops, InMemorySheets};
    use crate::services::sheets_store::worksheets;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn orders_grid(rows: &[(&str, &str, &str, &str, &str)]) -> Grid {
        let mut grid = vec![columns::ORDER_HEADERS.iter().map(|h| h.to_string()).collect()];
        for (number, created_at, client, urgent, status) in rows {
            grid.push(
                [*number, *created_at, *client, "R1", "A-01", "Bruno", "", *urgent, *status, *created_at, "Bruno"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            );
        }
        grid
    }

    fn items_grid(rows: &[(&str, &str, &str)]) -> Grid {
        let mut grid = vec![columns::ITEM_HEADERS.iter().map(|h| h.to_string()).collect()];
        for (number, part, quantity) in rows {
            grid.push(
                [*number, *part, "C-1", "0.35", "Preto", *quantity]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
            );
        }
        grid
    }

    fn service(sheets: Arc<InMemorySheets>) -> (OrderService, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = OrderStore::new(Some(sheets), Some("doc".to_string()));
        (OrderService::new(store, LocalMirror::new(dir.path())), dir)
    }

    fn seeded() -> Arc<InMemorySheets> {
        Arc::new(
            InMemorySheets::new()
                .with_worksheet(
                    worksheets::ORDERS,
                    orders_grid(&[
                        ("REQ-001", "03/03/2025 08:00", "Acme Motors", "Sim", "Pendente"),
                        ("REQ-002", "04/03/2025 09:00", "Beta", "Não", "Pendente"),
                        ("REQ-003", "05/03/2025 10:00", "ACME", "Não", "Concluído"),
                        ("REQ-010", "06/03/2025 11:00", "Acme", "Não", "Pendente"),
                        ("REQ-007", "07/03/2025 12:00", "acme", "Não", "Pendente"),
                    ]),
                )
                .with_worksheet(
                    worksheets::ITEMS,
                    items_grid(&[("REQ-001", "7001", "2"), ("REQ-002", "7002", "1")]),
                ),
        )
    }

    fn request(items: Vec<CreateOrderItem>) -> CreateOrderRequest {
        CreateOrderRequest {
            client: "Acme".to_string(),
            rack: "R9".to_string(),
            location: "Z-09".to_string(),
            requester: "Carla".to_string(),
            notes: None,
            urgent: true,
            items,
        }
    }

    fn item(part: &str, quantity: u32) -> CreateOrderItem {
        CreateOrderItem {
            part_code: part.to_string(),
            cable_code: "C-7".to_string(),
            section: "0.5".to_string(),
            color: "Azul".to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_order_number_follows_last_row() {
        let (svc, _dir) = service(seeded());
        assert_eq!(svc.generate_order_number(&SessionCache::new()).await, "REQ-008");
    }

    #[tokio::test]
    async fn test_order_number_fallbacks() {
        let (svc, _dir) = service(Arc::new(InMemorySheets::new()));
        assert_eq!(svc.generate_order_number(&SessionCache::new()).await, "REQ-001");

        let sheets = Arc::new(
            InMemorySheets::new()
                .with_worksheet(worksheets::ORDERS, orders_grid(&[("REQ-x1", "", "Acme", "Não", "Pendente")])),
        );
        let (svc, _dir) = service(sheets);
        assert_eq!(svc.generate_order_number(&SessionCache::new()).await, "REQ-001");

        let sheets = seeded();
        sheets.fail_always(ops::GET_VALUES, "[503] backend unavailable");
        let (svc, _dir) = service(sheets);
        assert_eq!(svc.generate_order_number(&SessionCache::new()).await, "REQ-001");
    }

    #[tokio::test]
    async fn test_done_completes_urgent_flag() {
        let sheets = seeded();
        let (svc, _dir) = service(sheets.clone());
        let cache = SessionCache::new();

        let updated = svc
            .update_status(&cache, "REQ-001", OrderStatus::Done, "Alice")
            .await
            .unwrap();

        assert_eq!(updated.order.status, OrderStatus::Done);
        assert_eq!(updated.order.urgent, Urgency::CompletedUrgent);
        assert_eq!(updated.order.last_updated_by, "Alice");
        assert!(updated.remote.is_synced());

        let grid = sheets.worksheet(worksheets::ORDERS).unwrap();
        assert_eq!(grid[1][7], "Concluido Urgente");
        assert_eq!(grid[1][8], "Concluído");
        assert_eq!(grid[1][10], "Alice");

        let (mirrored, _) = svc.mirror().load().await.unwrap();
        assert_eq!(mirrored[0].status, OrderStatus::Done);
    }

    #[tokio::test]
    async fn test_done_leaves_normal_flag() {
        let (svc, _dir) = service(seeded());
        let updated = svc
            .update_status(&SessionCache::new(), "REQ-002", OrderStatus::Done, "Alice")
            .await
            .unwrap();
        assert_eq!(updated.order.urgent, Urgency::Normal);
    }

    #[tokio::test]
    async fn test_detail_refetch_is_cached() {
        let sheets = seeded();
        let (svc, _dir) = service(sheets.clone());
        let cache = SessionCache::new();

        let first = svc.get_order_detail(&cache, "REQ-001").await;
        let calls = sheets.total_calls();
        let second = svc.get_order_detail(&cache, "REQ-001").await;

        assert_eq!(first.data, second.data);
        assert_eq!(second.source, ReadSource::Cache);
        assert_eq!(sheets.total_calls(), calls);
        assert_eq!(first.data.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_status_update_invalidates_detail() {
        let (svc, _dir) = service(seeded());
        let cache = SessionCache::new();

        let before = svc.get_order_detail(&cache, "REQ-002").await.data.unwrap();
        assert_eq!(before.status(), OrderStatus::Pending);

        svc.update_status(&cache, "REQ-002", OrderStatus::InProgress, "Rui")
            .await
            .unwrap();

        let after = svc.get_order_detail(&cache, "REQ-002").await;
        assert_eq!(after.source, ReadSource::Remote);
        assert_eq!(after.data.unwrap().status(), OrderStatus::InProgress);
    }

    #[tokio::test]
    async fn test_quota_error_serves_cached_orders() {
        let sheets = seeded();
        let (svc, _dir) = service(sheets.clone());
        let cache = SessionCache::new();

        let first = svc.find_orders(&cache, &OrderFilter::default()).await;
        cache.invalidate_orders().await;
        sheets.fail_always(ops::GET_VALUES, "Sheets API error [429]: Quota exceeded");

        let second = svc.find_orders(&cache, &OrderFilter::default()).await;
        assert_eq!(second.data, first.data);
        assert_eq!(second.source, ReadSource::StaleCache);
        assert_eq!(second.notice(), Some(QUOTA_NOTICE));
    }

    #[tokio::test]
    async fn test_filters_compose() {
        let (svc, _dir) = service(seeded());
        let filter = OrderFilter {
            order_number: Some("REQ-00".to_string()),
            client: Some("Acme".to_string()),
            status: Some(OrderStatus::Pending),
            ..Default::default()
        };

        let found = svc.find_orders(&SessionCache::new(), &filter).await.data;
        let numbers: Vec<&str> = found.iter().map(|o| o.order_number.as_str()).collect();
        // REQ-003 is done, REQ-010 fails the number filter, REQ-002 is Beta
        assert_eq!(numbers, vec!["REQ-001", "REQ-007"]);
    }

    #[tokio::test]
    async fn test_date_and_urgent_filters() {
        let (svc, _dir) = service(seeded());
        let cache = SessionCache::new();

        let filter = OrderFilter {
            created_from: NaiveDate::from_ymd_opt(2025, 3, 4),
            created_to: NaiveDate::from_ymd_opt(2025, 3, 6),
            ..Default::default()
        };
        let found = svc.find_orders(&cache, &filter).await.data;
        assert_eq!(found.len(), 3);

        let filter = OrderFilter {
            urgent_pending: true,
            ..Default::default()
        };
        let found = svc.find_orders(&cache, &filter).await.data;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].order_number, "REQ-001");
    }

    #[tokio::test]
    async fn test_empty_remote_gives_empty_result() {
        let sheets = Arc::new(
            InMemorySheets::new().with_worksheet(worksheets::ORDERS, orders_grid(&[])),
        );
        let (svc, _dir) = service(sheets);
        let filter = OrderFilter {
            client: Some("Acme".to_string()),
            ..Default::default()
        };
        let found = svc.find_orders(&SessionCache::new(), &filter).await;
        assert!(found.data.is_empty());
        assert_eq!(found.source, ReadSource::Remote);
    }

    #[tokio::test]
    async fn test_create_order_appends_and_mirrors() {
        let sheets = seeded();
        let (svc, _dir) = service(sheets.clone());
        let cache = SessionCache::new();

        let created = svc
            .create_order(&cache, request(vec![item("7100", 4), item("7101", 1)]))
            .await
            .unwrap();
        assert_eq!(created.order_number, "REQ-008");
        assert!(created.remote.is_synced());

        let grid = sheets.worksheet(worksheets::ORDERS).unwrap();
        let last = grid.last().unwrap();
        assert_eq!(last[0], "REQ-008");
        assert_eq!(last[7], "Sim");
        assert_eq!(last[8], "Pendente");
        assert_eq!(last[10], "Carla");
        assert_eq!(sheets.worksheet(worksheets::ITEMS).unwrap().len(), 5);

        let (orders, items) = svc.mirror().load().await.unwrap();
        assert_eq!(orders.len(), 6);
        assert_eq!(items.len(), 4);

        // Caches were invalidated, so the next number sees the new row
        assert_eq!(svc.generate_order_number(&cache).await, "REQ-009");
    }

    #[tokio::test]
    async fn test_create_order_on_blank_spreadsheet() {
        let sheets = Arc::new(InMemorySheets::new());
        let (svc, _dir) = service(sheets.clone());

        let created = svc
            .create_order(&SessionCache::new(), request(vec![item("7100", 1)]))
            .await
            .unwrap();
        assert_eq!(created.order_number, "REQ-001");

        let grid = sheets.worksheet(worksheets::ORDERS).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0][0], columns::ORDER_NUMBER);
    }

    #[tokio::test]
    async fn test_create_order_refuses_unreadable_tables() {
        let sheets = seeded();
        sheets.fail_always(ops::GET_VALUES, "[503] backend unavailable");
        let (svc, _dir) = service(sheets.clone());

        let result = svc
            .create_order(&SessionCache::new(), request(vec![item("7100", 1)]))
            .await;

        assert!(matches!(result, Err(OrderError::Store(StoreError::Remote(_)))));
        assert_eq!(sheets.calls(ops::APPEND_ROWS), 0);
        assert!(svc.mirror().load().await.unwrap().0.is_empty());
    }

    #[tokio::test]
    async fn test_writes_ignore_other_sessions_stale_tables() {
        let sheets = seeded();
        let (svc, _dir) = service(sheets.clone());
        let first = SessionCache::new();
        let second = SessionCache::new();

        let a = svc.create_order(&first, request(vec![item("7100", 1)])).await.unwrap();
        svc.find_orders(&first, &OrderFilter::default()).await;
        let b = svc.create_order(&second, request(vec![item("7101", 1)])).await.unwrap();
        let c = svc.create_order(&first, request(vec![item("7102", 1)])).await.unwrap();

        assert_eq!(a.order_number, "REQ-008");
        assert_eq!(b.order_number, "REQ-009");
        assert_eq!(c.order_number, "REQ-010");

        let grid = sheets.worksheet(worksheets::ORDERS).unwrap();
        let numbers: Vec<&str> = grid[1..].iter().map(|r| r[0].as_str()).collect();
        assert_eq!(&numbers[5..], &["REQ-008", "REQ-009", "REQ-010"]);

        let (orders, items) = svc.mirror().load().await.unwrap();
        assert_eq!(orders.len(), 8);
        assert_eq!(items.len(), 5);
    }

    #[tokio::test]
    async fn test_status_update_keeps_orders_from_other_sessions() {
        let (svc, _dir) = service(seeded());
        let first = SessionCache::new();
        let second = SessionCache::new();

        svc.find_orders(&first, &OrderFilter::default()).await;
        svc.create_order(&second, request(vec![item("7100", 1)])).await.unwrap();
        svc.update_status(&first, "REQ-001", OrderStatus::InProgress, "Rui")
            .await
            .unwrap();

        let (orders, _) = svc.mirror().load().await.unwrap();
        assert_eq!(orders.len(), 6);
        assert_eq!(orders.last().unwrap().order_number, "REQ-008");
        assert_eq!(orders[0].status, OrderStatus::InProgress);
    }

    #[tokio::test]
    async fn test_hand_edited_row_does_not_block_writes() {
        let sheets = Arc::new(InMemorySheets::new().with_worksheet(
            worksheets::ORDERS,
            orders_grid(&[
                ("REQ-001", "03/03/2025 08:00", "Acme", "Não", "Pendente"),
                ("REQ-002", "04/03/2025 09:00", "Beta", "Não", ""),
            ]),
        ));
        let (svc, _dir) = service(sheets);
        let cache = SessionCache::new();

        let found = svc.find_orders(&cache, &OrderFilter::default()).await;
        assert_eq!(found.source, ReadSource::Remote);
        assert_eq!(found.data.len(), 2);

        let created = svc.create_order(&cache, request(vec![item("7100", 1)])).await.unwrap();
        assert_eq!(created.order_number, "REQ-003");

        let updated = svc
            .update_status(&cache, "REQ-001", OrderStatus::Done, "Alice")
            .await
            .unwrap();
        assert!(updated.remote.is_synced());
    }

    #[tokio::test]
    async fn test_create_order_keeps_local_copy_when_push_fails() {
        let sheets = seeded();
        sheets.fail_always(ops::APPEND_ROWS, "Sheets API error [429]: RESOURCE_EXHAUSTED");
        let (svc, _dir) = service(sheets);

        let created = svc
            .create_order(&SessionCache::new(), request(vec![item("7100", 2)]))
            .await
            .unwrap();

        assert!(matches!(created.remote, RemoteSync::Failed { quota: true, .. }));
        let (orders, _) = svc.mirror().load().await.unwrap();
        assert_eq!(orders.last().unwrap().order_number, "REQ-008");
    }

    #[tokio::test]
    async fn test_create_order_validation() {
        let (svc, _dir) = service(seeded());
        let cache = SessionCache::new();

        let result = svc.create_order(&cache, request(Vec::new())).await;
        assert!(matches!(result, Err(OrderError::Validation(_))));

        let result = svc.create_order(&cache, request(vec![item("7100", 0)])).await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_status_errors() {
        let sheets = seeded();
        let (svc, _dir) = service(sheets.clone());
        let cache = SessionCache::new();

        let result = svc
            .update_status(&cache, "REQ-404", OrderStatus::Done, "Alice")
            .await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));

        let result = svc
            .update_status(&cache, "REQ-001", OrderStatus::Done, "  ")
            .await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(sheets.calls(ops::UPDATE_CELL), 0);
    }

    #[tokio::test]
    async fn test_update_status_reports_remote_failure() {
        let sheets = seeded();
        sheets.fail_always(ops::UPDATE_CELL, "Sheets API error [500]: internal");
        let (svc, _dir) = service(sheets);

        let updated = svc
            .update_status(&SessionCache::new(), "REQ-002", OrderStatus::Done, "Alice")
            .await
            .unwrap();

        assert!(matches!(updated.remote, RemoteSync::Failed { quota: false, .. }));
        let (orders, _) = svc.mirror().load().await.unwrap();
        assert_eq!(orders[1].status, OrderStatus::Done);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let (svc, _dir) = service(seeded());
        let summary = svc.dashboard(&SessionCache::new()).await;

        assert_eq!(summary.totals.total, 5);
        assert_eq!(summary.totals.pending, 4);
        assert_eq!(summary.totals.done, 1);
        assert_eq!(summary.totals.urgent_pending, 1);
        assert!(summary.notice.is_none());
    }

    #[tokio::test]
    async fn test_restore_backup_rewrites_remote() {
        let sheets = seeded();
        let (svc, _dir) = service(sheets.clone());
        let cache = SessionCache::new();

        svc.create_order(&cache, request(vec![item("7100", 1)])).await.unwrap();
        svc.create_order(&cache, request(vec![item("7101", 1)])).await.unwrap();

        // Only the second creation found a mirror to back up
        let backups = svc.list_backups().await.unwrap();
        assert_eq!(backups.len(), 1);

        let restored = svc.restore_backup(&cache, &backups[0].name).await.unwrap();
        assert_eq!(restored.orders, 6);
        assert!(restored.remote.is_synced());

        let grid = sheets.worksheet(worksheets::ORDERS).unwrap();
        assert_eq!(grid.len(), 7);
        assert_eq!(svc.generate_order_number(&cache).await, "REQ-009");
    }
}
