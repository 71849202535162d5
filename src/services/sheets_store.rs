//! Order store backed by a remote spreadsheet
//!
//! Maps orders and items onto the "Pedidos" and "Itens" worksheets and the catalog onto
//! "Projeto". Every failure is classified so callers can tell quota exhaustion apart from
//! other errors.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::models::catalog::CatalogEntry;
use crate::models::order::{columns, Order, OrderDetail, OrderItem};
use crate::models::sheet::{column_index, grid_with_header, parse_records, records_from_grid, Grid, RowError};
use crate::services::sheets_client::{SheetsClient, SheetsError};

/// Worksheet names
pub mod worksheets {
    pub const ORDERS: &str = "Pedidos";
    pub const ITEMS: &str = "Itens";
    pub const CATALOG: &str = "Projeto";
}

/// Markers in remote error text that mean the quota is exhausted
const QUOTA_MARKERS: [&str; 3] = ["[429]", "Quota exceeded", "RESOURCE_EXHAUSTED"];

/// Error text of a read against a worksheet that does not exist
const MISSING_WORKSHEET_MARKER: &str = "Unable to parse range";

/// Shown to users when the remote quota is exhausted
pub const QUOTA_NOTICE: &str =
    "Por favor, recarregue a página e aguarde um minuto antes de tentar novamente.";

/// Shown to users for any other read failure
pub const UNAVAILABLE_NOTICE: &str =
    "Não foi possível carregar os pedidos. Por favor, tente novamente em alguns instantes.";

/// Size of worksheets created on first write
const NEW_WORKSHEET_ROWS: u32 = 100;
const NEW_WORKSHEET_COLS: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No client or no spreadsheet URL
    NotConfigured(String),
    /// Rate limit / quota exhausted
    Quota(String),
    NotFound(String),
    MissingColumn(String),
    InvalidRow(String),
    Remote(String),
}

impl StoreError {
    /// Classify the text of a remote failure
    pub fn from_remote(message: &str) -> Self {
        if QUOTA_MARKERS.iter().any(|marker| message.contains(marker)) {
            StoreError::Quota(message.to_string())
        } else {
            StoreError::Remote(message.to_string())
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, StoreError::Quota(_))
    }

    /// Message suitable for end users
    pub fn notice(&self) -> &'static str {
        if self.is_quota() { QUOTA_NOTICE } else { UNAVAILABLE_NOTICE }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotConfigured(msg) => write!(f, "Google Sheets not configured: {}", msg),
            StoreError::Quota(msg) => write!(f, "Google Sheets quota exceeded: {}", msg),
            StoreError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StoreError::MissingColumn(msg) => write!(f, "Missing column: {}", msg),
            StoreError::InvalidRow(msg) => write!(f, "Invalid row: {}", msg),
            StoreError::Remote(msg) => write!(f, "Google Sheets error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<SheetsError> for StoreError {
    fn from(e: SheetsError) -> Self {
        StoreError::from_remote(&e.message)
    }
}

impl From<RowError> for StoreError {
    fn from(e: RowError) -> Self {
        match e {
            RowError::MissingColumn(column) => StoreError::MissingColumn(column.to_string()),
            other => StoreError::InvalidRow(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct OrderStore {
    client: Option<Arc<dyn SheetsClient>>,
    document: Arc<RwLock<Option<String>>>,
}

impl OrderStore {
    pub fn new(client: Option<Arc<dyn SheetsClient>>, document: Option<String>) -> Self {
        Self {
            client,
            document: Arc::new(RwLock::new(document)),
        }
    }

    pub fn document_id(&self) -> Option<String> {
        self.document.read().clone()
    }

    pub fn set_document(&self, document: Option<String>) {
        *self.document.write() = document;
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some() && self.document_id().is_some()
    }

    fn connection(&self) -> Result<(&dyn SheetsClient, String), StoreError> {
        let client = self.client.as_deref().ok_or_else(|| {
            StoreError::NotConfigured(
                "client not initialized, check the credentials".to_string(),
            )
        })?;
        let document = self
            .document_id()
            .ok_or_else(|| StoreError::NotConfigured("spreadsheet URL not set".to_string()))?;
        Ok((client, document))
    }

    /// Open the document and list its worksheets
    pub async fn check_connection(&self) -> Result<Vec<String>, StoreError> {
        let (client, document) = self.connection()?;
        Ok(client.worksheet_titles(&document).await?)
    }

    async fn read_grid(&self, worksheet: &str) -> Result<Grid, StoreError> {
        let (client, document) = self.connection()?;
        match client.get_values(&document, worksheet).await {
            Ok(grid) => Ok(grid),
            // A worksheet that was never written reads as an empty table
            Err(e) if e.message.contains(MISSING_WORKSHEET_MARKER) => {
                tracing::debug!("Worksheet '{}' does not exist yet", worksheet);
                Ok(Grid::new())
            }
            Err(e) => {
                tracing::warn!("Failed to read '{}': {}", worksheet, e);
                Err(StoreError::from(e))
            }
        }
    }

    /// All orders. Sheets created before the audit columns existed read with empty
    /// audit fields.
    pub async fn read_orders(&self) -> Result<Vec<Order>, StoreError> {
        let grid = self.read_grid(worksheets::ORDERS).await?;
        let orders = parse_records(&grid, worksheets::ORDERS, Order::from_record)?;

        tracing::debug!("Read {} orders", orders.len());
        Ok(orders)
    }

    pub async fn read_items(&self) -> Result<Vec<OrderItem>, StoreError> {
        let grid = self.read_grid(worksheets::ITEMS).await?;
        let items = parse_records(&grid, worksheets::ITEMS, OrderItem::from_record)?;

        tracing::debug!("Read {} order items", items.len());
        Ok(items)
    }

    pub async fn read_catalog(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let grid = self.read_grid(worksheets::CATALOG).await?;
        Ok(records_from_grid(&grid)
            .iter()
            .map(CatalogEntry::from_record)
            .collect())
    }

    async fn ensure_worksheet(
        &self,
        client: &dyn SheetsClient,
        document: &str,
        title: &str,
    ) -> Result<(), StoreError> {
        let titles = client.worksheet_titles(document).await?;
        if !titles.iter().any(|t| t == title) {
            client
                .add_worksheet(document, title, NEW_WORKSHEET_ROWS, NEW_WORKSHEET_COLS)
                .await?;
        }
        Ok(())
    }

    /// Replace both worksheets with the given tables, then restyle the header rows
    pub async fn write_full(&self, orders: &[Order], items: &[OrderItem]) -> Result<(), StoreError> {
        let (client, document) = self.connection()?;

        let tables = [
            (
                worksheets::ORDERS,
                grid_with_header(&columns::ORDER_HEADERS, orders.iter().map(Order::to_row)),
            ),
            (
                worksheets::ITEMS,
                grid_with_header(&columns::ITEM_HEADERS, items.iter().map(OrderItem::to_row)),
            ),
        ];

        for (title, grid) in tables {
            self.ensure_worksheet(client, &document, title).await?;
            client.clear(&document, title).await?;
            client.append_rows(&document, title, grid).await?;
        }

        for title in [worksheets::ORDERS, worksheets::ITEMS] {
            if let Err(e) = client.format_header(&document, title).await {
                tracing::warn!("Could not format header of '{}': {}", title, e);
            }
        }

        tracing::info!(
            "Wrote {} orders and {} items to Google Sheets",
            orders.len(),
            items.len()
        );
        Ok(())
    }

    /// Append one order and its items after the existing rows.
    ///
    /// Empty worksheets get a header row first. Columns the existing header lacks are
    /// added at its end.
    pub async fn append_order(&self, order: &Order, items: &[OrderItem]) -> Result<(), StoreError> {
        let (client, document) = self.connection()?;

        self.append_aligned(
            client,
            &document,
            worksheets::ORDERS,
            &columns::ORDER_HEADERS,
            vec![order.to_row()],
        )
        .await?;

        self.append_aligned(
            client,
            &document,
            worksheets::ITEMS,
            &columns::ITEM_HEADERS,
            items.iter().map(OrderItem::to_row).collect(),
        )
        .await?;

        tracing::info!(
            "Appended order {} with {} items to Google Sheets",
            order.order_number,
            items.len()
        );
        Ok(())
    }

    async fn append_aligned(
        &self,
        client: &dyn SheetsClient,
        document: &str,
        worksheet: &str,
        headers: &[&str],
        rows: Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        self.ensure_worksheet(client, document, worksheet).await?;
        let grid = client.get_values(document, worksheet).await?;

        let existing: Vec<String> = grid.first().cloned().unwrap_or_default();
        if existing.iter().all(|h| h.trim().is_empty()) {
            let fresh = grid_with_header(headers, rows);
            client.append_rows(document, worksheet, fresh).await?;
            if let Err(e) = client.format_header(document, worksheet).await {
                tracing::warn!("Could not format header of '{}': {}", worksheet, e);
            }
            return Ok(());
        }

        let mut header = existing;
        for name in headers {
            if !header.iter().any(|h| h.trim() == *name) {
                header.push(name.to_string());
                client
                    .update_cell(document, worksheet, 1, header.len(), name)
                    .await?;
                tracing::info!("Added missing column '{}' to '{}'", name, worksheet);
            }
        }

        let aligned = rows
            .into_iter()
            .map(|row| {
                header
                    .iter()
                    .map(|h| {
                        headers
                            .iter()
                            .position(|name| h.trim() == *name)
                            .and_then(|i| row.get(i).cloned())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        client.append_rows(document, worksheet, aligned).await?;
        Ok(())
    }

    /// Update named cells of one order row in place.
    ///
    /// Fails before writing anything when the order or any of the headers is missing.
    pub async fn update_order_fields(
        &self,
        order_number: &str,
        updates: &[(&str, String)],
    ) -> Result<(), StoreError> {
        let (client, document) = self.connection()?;
        let grid = client.get_values(&document, worksheets::ORDERS).await?;

        let id_col = column_index(&grid, columns::ORDER_NUMBER)
            .ok_or_else(|| StoreError::MissingColumn(columns::ORDER_NUMBER.to_string()))?;

        // +2: one for the header, one because sheet rows start at 1
        let row = grid
            .iter()
            .skip(1)
            .position(|r| r.get(id_col).is_some_and(|v| v.trim() == order_number))
            .map(|pos| pos + 2)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order_number)))?;

        let targets = updates
            .iter()
            .map(|(header, value)| {
                column_index(&grid, header)
                    .map(|col| (col + 1, value))
                    .ok_or_else(|| StoreError::MissingColumn(header.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (col, value) in targets {
            client
                .update_cell(&document, worksheets::ORDERS, row, col, value)
                .await?;
        }

        tracing::info!(
            "Updated {} fields of order {} in Google Sheets",
            updates.len(),
            order_number
        );
        Ok(())
    }

    /// One order and its items, `None` when the number is unknown
    pub async fn get_order_with_items(&self, order_number: &str) -> Result<Option<OrderDetail>, StoreError> {
        let orders = self.read_orders().await?;
        let Some(order) = orders.into_iter().find(|o| o.order_number == order_number) else {
            return Ok(None);
        };

        let items = self
            .read_items()
            .await?
            .into_iter()
            .filter(|item| item.order_number == order_number)
            .collect();

        Ok(Some(OrderDetail { order, items }))
    }
}
