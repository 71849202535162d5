//! Order ("pedido") and line item ("item") models
//!
//! Rows of the "Pedidos" and "Itens" worksheets, the request/response bodies of the
//! /api/orders endpoints, and the status state machine.

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::sheet::{Record, RowError};

/// Display format used for every timestamp stored in the sheets
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Prefix of every order number (REQ-001, REQ-002, ...)
pub const ORDER_NUMBER_PREFIX: &str = "REQ";

/// Column headers of the "Pedidos" and "Itens" worksheets
pub mod columns {
    pub const ORDER_NUMBER: &str = "Numero_Pedido";
    pub const CREATED_AT: &str = "Data";
    pub const CLIENT: &str = "Cliente";
    pub const RACK: &str = "RACK";
    pub const LOCATION: &str = "Localizacao";
    pub const REQUESTER: &str = "Solicitante";
    pub const NOTES: &str = "Observacoes";
    pub const URGENT: &str = "Urgente";
    pub const STATUS: &str = "Status";
    pub const LAST_UPDATED_AT: &str = "Ultima_Atualizacao";
    pub const LAST_UPDATED_BY: &str = "Responsavel_Atualizacao";

    pub const PART_CODE: &str = "cod_yazaki";
    pub const CABLE_CODE: &str = "codigo_cabo";
    pub const SECTION: &str = "seccao";
    pub const COLOR: &str = "cor";
    pub const QUANTITY: &str = "quantidade";

    /// "Pedidos" header row, in sheet order
    pub const ORDER_HEADERS: [&str; 11] = [
        ORDER_NUMBER,
        CREATED_AT,
        CLIENT,
        RACK,
        LOCATION,
        REQUESTER,
        NOTES,
        URGENT,
        STATUS,
        LAST_UPDATED_AT,
        LAST_UPDATED_BY,
    ];

    /// "Itens" header row, in sheet order
    pub const ITEM_HEADERS: [&str; 6] = [ORDER_NUMBER, PART_CODE, CABLE_CODE, SECTION, COLOR, QUANTITY];
}

/// Current local time in the sheet display format
pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "Pendente")]
    Pending,
    #[serde(rename = "Em Processamento")]
    InProgress,
    #[serde(rename = "Concluído")]
    Done,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pendente",
            OrderStatus::InProgress => "Em Processamento",
            OrderStatus::Done => "Concluído",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pendente" => Ok(OrderStatus::Pending),
            "Em Processamento" => Ok(OrderStatus::InProgress),
            // Hand-edited sheets sometimes lose the accent
            "Concluído" | "Concluido" => Ok(OrderStatus::Done),
            other => Err(format!("Unknown order status: '{}'", other)),
        }
    }
}

/// Urgency flag: "Sim", "Não", or "Concluido Urgente" once an urgent order is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "Sim")]
    Urgent,
    #[serde(rename = "Não")]
    Normal,
    #[serde(rename = "Concluido Urgente")]
    CompletedUrgent,
}

impl Urgency {
    pub fn from_flag(urgent: bool) -> Self {
        if urgent { Urgency::Urgent } else { Urgency::Normal }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Urgent => "Sim",
            Urgency::Normal => "Não",
            Urgency::CompletedUrgent => "Concluido Urgente",
        }
    }

    /// Lenient parse of a sheet cell. Anything unrecognised counts as not urgent.
    pub fn parse_cell(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "sim" => Urgency::Urgent,
            "concluido urgente" | "concluído urgente" => Urgency::CompletedUrgent,
            _ => Urgency::Normal,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the "Pedidos" worksheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_number: String,
    pub created_at: String,
    pub client: String,
    pub rack: String,
    pub location: String,
    pub requester: String,
    pub notes: String,
    pub urgent: Urgency,
    pub status: OrderStatus,
    pub last_updated_at: String,
    pub last_updated_by: String,
}

impl Order {
    /// Build an order from a header -> value record.
    ///
    /// The audit columns and the optional columns may be absent from older sheets and
    /// default to empty strings. A blank or unknown status reads as `Pendente`, so the
    /// row keeps its place in the table and in the numbering.
    pub fn from_record(record: &Record) -> Result<Self, RowError> {
        let order_number = required(record, columns::ORDER_NUMBER)?.trim().to_string();
        let status = required(record, columns::STATUS)?.parse::<OrderStatus>().unwrap_or_else(|e| {
            tracing::warn!("Order {}: {}, reading it as {}", order_number, e, OrderStatus::Pending);
            OrderStatus::Pending
        });

        Ok(Self {
            order_number,
            created_at: optional(record, columns::CREATED_AT),
            client: optional(record, columns::CLIENT),
            rack: optional(record, columns::RACK),
            location: optional(record, columns::LOCATION),
            requester: optional(record, columns::REQUESTER),
            notes: optional(record, columns::NOTES),
            urgent: Urgency::parse_cell(&optional(record, columns::URGENT)),
            status,
            last_updated_at: optional(record, columns::LAST_UPDATED_AT),
            last_updated_by: optional(record, columns::LAST_UPDATED_BY),
        })
    }

    /// Cells in `columns::ORDER_HEADERS` order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.order_number.clone(),
            self.created_at.clone(),
            self.client.clone(),
            self.rack.clone(),
            self.location.clone(),
            self.requester.clone(),
            self.notes.clone(),
            self.urgent.as_str().to_string(),
            self.status.as_str().to_string(),
            self.last_updated_at.clone(),
            self.last_updated_by.clone(),
        ]
    }

    /// Creation date parsed from the display format, if well formed
    pub fn created_date(&self) -> Option<NaiveDate> {
        NaiveDateTime::parse_from_str(self.created_at.trim(), TIMESTAMP_FORMAT)
            .ok()
            .map(|dt| dt.date())
    }

    pub fn is_urgent_pending(&self) -> bool {
        self.status == OrderStatus::Pending && self.urgent == Urgency::Urgent
    }

    /// Apply a status transition and return the cells that changed, keyed by header.
    ///
    /// Any status may follow any other. Moving to `Concluído` while the order is
    /// flagged "Sim" also flips the flag to "Concluido Urgente".
    pub fn apply_status(
        &mut self,
        new_status: OrderStatus,
        updated_by: &str,
        updated_at: &str,
    ) -> Vec<(&'static str, String)> {
        self.status = new_status;
        self.last_updated_at = updated_at.to_string();
        self.last_updated_by = updated_by.to_string();

        let mut updates = vec![
            (columns::STATUS, new_status.as_str().to_string()),
            (columns::LAST_UPDATED_AT, self.last_updated_at.clone()),
            (columns::LAST_UPDATED_BY, self.last_updated_by.clone()),
        ];

        if new_status == OrderStatus::Done && self.urgent == Urgency::Urgent {
            self.urgent = Urgency::CompletedUrgent;
            updates.push((columns::URGENT, self.urgent.as_str().to_string()));
        }

        updates
    }
}

/// One row of the "Itens" worksheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_number: String,
    pub part_code: String,
    pub cable_code: String,
    pub section: String,
    pub color: String,
    pub quantity: u32,
}

impl OrderItem {
    pub fn from_record(record: &Record) -> Result<Self, RowError> {
        let quantity_cell = required(record, columns::QUANTITY)?;
        let quantity = parse_quantity(quantity_cell).ok_or_else(|| RowError::InvalidValue {
            column: columns::QUANTITY,
            value: quantity_cell.to_string(),
        })?;

        Ok(Self {
            order_number: required(record, columns::ORDER_NUMBER)?.trim().to_string(),
            part_code: optional(record, columns::PART_CODE),
            cable_code: optional(record, columns::CABLE_CODE),
            section: optional(record, columns::SECTION),
            color: optional(record, columns::COLOR),
            quantity,
        })
    }

    /// Cells in `columns::ITEM_HEADERS` order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.order_number.clone(),
            self.part_code.clone(),
            self.cable_code.clone(),
            self.section.clone(),
            self.color.clone(),
            self.quantity.to_string(),
        ]
    }
}

/// Sheets with USER_ENTERED input may hand numbers back as "3" or "3.0"
fn parse_quantity(cell: &str) -> Option<u32> {
    let trimmed = cell.trim();
    trimmed.parse::<u32>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|q| q.fract() == 0.0 && *q >= 0.0 && *q <= u32::MAX as f64)
            .map(|q| q as u32)
    })
}

fn required<'a>(record: &'a Record, column: &'static str) -> Result<&'a str, RowError> {
    record
        .get(column)
        .map(String::as_str)
        .ok_or(RowError::MissingColumn(column))
}

fn optional(record: &Record, column: &str) -> String {
    record.get(column).cloned().unwrap_or_default()
}

/// Next number after the last row's, or REQ-001 when there is nothing to continue from.
///
/// The suffix is padded to three digits but grows past REQ-999.
pub fn next_order_number(orders: &[Order]) -> String {
    let next = orders
        .last()
        .and_then(|last| last.order_number.split('-').nth(1))
        .and_then(|suffix| suffix.trim().parse::<u64>().ok())
        .and_then(|n| n.checked_add(1))
        .unwrap_or(1);

    format!("{}-{:03}", ORDER_NUMBER_PREFIX, next)
}

/// An order together with its line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderDetail {
    pub fn status(&self) -> OrderStatus {
        self.order.status
    }
}

/// Line item of a POST /api/orders body, copied from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderItem {
    pub part_code: String,
    pub cable_code: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub color: String,
    pub quantity: u32,
}

/// Body of POST /api/orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub client: String,
    pub rack: String,
    pub location: String,
    pub requester: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    pub items: Vec<CreateOrderItem>,
}

/// Query parameters for GET /api/orders
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// Case-insensitive substring of the order number
    pub order_number: Option<String>,
    /// Case-insensitive substring of the client
    pub client: Option<String>,
    /// Exact status
    pub status: Option<OrderStatus>,
    /// Inclusive creation date bounds (YYYY-MM-DD)
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    /// Only pending orders flagged urgent
    #[serde(default)]
    pub urgent_pending: bool,
}

/// Body of PUT /api/orders/{order_number}/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub updated_by: String,
}

/// Outcome of pushing a local change to the remote spreadsheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RemoteSync {
    Synced,
    Failed { warning: String, quota: bool },
}

impl RemoteSync {
    pub fn is_synced(&self) -> bool {
        matches!(self, RemoteSync::Synced)
    }
}

/// Response of POST /api/orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_number: String,
    pub remote: RemoteSync,
}

/// Response of PUT /api/orders/{order_number}/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub order: Order,
    pub remote: RemoteSync,
}

/// Response of GET /api/orders/next-number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextOrderNumberResponse {
    pub order_number: String,
}
