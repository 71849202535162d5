// src/lib.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use config::AppConfig;
use parking_lot::RwLock;
use services::{order_lifecycle::OrderService, session_cache::SessionRegistry};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// A session's cache is dropped after this long without requests
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub sessions: SessionRegistry,
    pub config: Arc<RwLock<AppConfig>>,
}

impl AppState {
    pub fn new(orders: OrderService, config: AppConfig) -> Self {
        Self {
            orders,
            sessions: SessionRegistry::new(SESSION_IDLE_TIMEOUT),
            config: Arc::new(RwLock::new(config)),
        }
    }
}

pub mod config;

pub mod services {
    pub mod sheets_client;
    pub mod google_sheets;
    #[cfg(any(test, feature = "test-util"))]
    pub mod sheets_memory;
    pub mod sheets_store;
    pub mod session_cache;
    pub mod local_mirror;
    pub mod order_lifecycle;
}

pub mod models;
pub mod handlers;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(hello_pedidos))
        .route(
            "/api/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/api/orders/next-number", get(handlers::orders::next_order_number))
        .route("/api/orders/{order_number}", get(handlers::orders::get_order))
        .route(
            "/api/orders/{order_number}/status",
            put(handlers::orders::update_order_status),
        )
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/api/catalog", get(handlers::catalog::get_catalog))
        .route("/api/config/status", get(handlers::config::get_sheets_status))
        .route("/api/config/sheets-url", put(handlers::config::update_sheets_url))
        .route("/api/backups", get(handlers::backups::list_backups))
        .route("/api/backups/{name}/restore", post(handlers::backups::restore_backup))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn hello_pedidos() -> &'static str {
    "Pedidos backend is running"
}
