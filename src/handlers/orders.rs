use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    handlers::{api_error, session_cache, store_error_status, ApiError},
    models::{
        common::ReadResponse,
        order::{
            CreateOrderRequest, CreateOrderResponse, NextOrderNumberResponse, Order, OrderDetail,
            OrderFilter, StatusUpdateResponse, UpdateStatusRequest,
        },
    },
    AppState,
};

/// Handler for GET /api/orders
/// Lists orders matching the query filters; never fails, degraded reads carry a notice
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<OrderFilter>,
) -> Json<ReadResponse<Vec<Order>>> {
    tracing::debug!("Listing orders with filter: {:?}", filter);

    let cache = session_cache(&state, &headers).await;
    let fetched = state.orders.find_orders(&cache, &filter).await;

    Json(ReadResponse {
        notice: fetched.notice().map(str::to_string),
        source: fetched.source,
        data: fetched.data,
    })
}

/// Handler for POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    tracing::info!(
        "Creating order for {} with {} items",
        request.client,
        request.items.len()
    );

    let cache = session_cache(&state, &headers).await;
    let created = state.orders.create_order(&cache, request).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for GET /api/orders/next-number
pub async fn next_order_number(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<NextOrderNumberResponse> {
    let cache = session_cache(&state, &headers).await;
    Json(NextOrderNumberResponse {
        order_number: state.orders.generate_order_number(&cache).await,
    })
}

/// Handler for GET /api/orders/{order_number}
pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_number): Path<String>,
) -> Result<Json<ReadResponse<OrderDetail>>, ApiError> {
    let cache = session_cache(&state, &headers).await;
    let fetched = state.orders.get_order_detail(&cache, &order_number).await;
    let notice = fetched.notice().map(str::to_string);

    match (fetched.data, fetched.error) {
        (Some(detail), _) => Ok(Json(ReadResponse {
            data: detail,
            source: fetched.source,
            notice,
        })),
        // Store unreachable and nothing cached
        (None, Some(e)) => Err(api_error(store_error_status(&e), e.notice())),
        (None, None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Order {} not found", order_number),
        )),
    }
}

/// Handler for PUT /api/orders/{order_number}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_number): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    let cache = session_cache(&state, &headers).await;
    let updated = state
        .orders
        .update_status(&cache, &order_number, request.status, &request.updated_by)
        .await?;

    Ok(Json(updated))
}
