use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};

use crate::{
    handlers::session_cache,
    models::{
        catalog::{CatalogEntry, CatalogQuery},
        common::ReadResponse,
    },
    AppState,
};

/// Handler for GET /api/catalog
/// Catalog rows, optionally narrowed to one client and rack
pub async fn get_catalog(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CatalogQuery>,
) -> Json<ReadResponse<Vec<CatalogEntry>>> {
    let cache = session_cache(&state, &headers).await;
    let fetched = state.orders.catalog(&cache, &query).await;

    Json(ReadResponse {
        notice: fetched.notice().map(str::to_string),
        source: fetched.source,
        data: fetched.data,
    })
}
