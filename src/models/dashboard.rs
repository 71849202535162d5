use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::order::{Order, OrderStatus};

/// Order counts for one group of orders
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTotals {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub urgent_pending: usize, // pending and flagged "Sim"
}

impl StatusTotals {
    fn add(&mut self, order: &Order) {
        self.total += 1;
        match order.status {
            OrderStatus::Done => self.done += 1,
            OrderStatus::InProgress => self.in_progress += 1,
            OrderStatus::Pending => self.pending += 1,
        }
        if order.is_urgent_pending() {
            self.urgent_pending += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientTotals {
    pub client: String,
    pub totals: StatusTotals,
}

/// Response of GET /api/dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub totals: StatusTotals,
    /// Sorted by client name
    pub clients: Vec<ClientTotals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl DashboardSummary {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut totals = StatusTotals::default();
        let mut by_client: BTreeMap<&str, StatusTotals> = BTreeMap::new();

        for order in orders {
            totals.add(order);
            by_client.entry(order.client.as_str()).or_default().add(order);
        }

        Self {
            totals,
            clients: by_client
                .into_iter()
                .map(|(client, totals)| ClientTotals {
                    client: client.to_string(),
                    totals,
                })
                .collect(),
            notice: None,
        }
    }
}
