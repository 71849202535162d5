use axum::{extract::State, http::HeaderMap, Json};

use crate::{handlers::session_cache, models::dashboard::DashboardSummary, AppState};

/// Handler for GET /api/dashboard
/// Order counts overall and per client
pub async fn get_dashboard(State(state): State<AppState>, headers: HeaderMap) -> Json<DashboardSummary> {
    let cache = session_cache(&state, &headers).await;
    let summary = state.orders.dashboard(&cache).await;

    tracing::debug!(
        "Dashboard: {} orders across {} clients",
        summary.totals.total,
        summary.clients.len()
    );

    Json(summary)
}
