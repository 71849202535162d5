use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pedidos_backend::{
    config::AppConfig,
    models::order::columns,
    router,
    services::{
        local_mirror::LocalMirror, order_lifecycle::OrderService, sheets_memory::InMemorySheets,
        sheets_store::{worksheets, OrderStore},
    },
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Admin password of every test app
pub const ADMIN_PASSWORD: &str = "segredo-de-teste";

/// Router wired to an in-memory spreadsheet and a temporary data directory
pub struct TestApp {
    pub router: Router,
    pub sheets: Arc<InMemorySheets>,
    pub state: AppState,
    // Keeps the directory alive for the duration of the test
    _dir: TempDir,
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// Spreadsheet with three orders, their items and a small catalog
pub fn seeded_sheets() -> Arc<InMemorySheets> {
    let mut orders = vec![row(&columns::ORDER_HEADERS)];
    orders.push(row(&["REQ-001", "03/03/2025 08:00", "Acme", "R1", "A-01", "Ana", "", "Sim", "Pendente", "03/03/2025 08:00", "Ana"]));
    orders.push(row(&["REQ-002", "04/03/2025 09:00", "Beta", "R2", "B-02", "Rui", "", "Não", "Em Processamento", "04/03/2025 09:00", "Rui"]));
    orders.push(row(&["REQ-003", "05/03/2025 10:00", "Acme", "R1", "A-01", "Ana", "", "Não", "Concluído", "05/03/2025 10:00", "Ana"]));

    let mut items = vec![row(&columns::ITEM_HEADERS)];
    items.push(row(&["REQ-001", "7001", "C-1", "0.35", "Preto", "2"]));
    items.push(row(&["REQ-002", "7002", "C-2", "0.5", "Azul", "1"]));
    items.push(row(&["REQ-003", "7003", "C-3", "0.75", "Verde", "4"]));

    let catalog = vec![
        row(&["RACK", "CÓD Yazaki", "Codigo Cabo", "Secção", "Cor", "Cliente", "Locação", "Projeto", "Cod OES"]),
        row(&["R1", "7001", "C-1", "0.35", "Preto", "Acme", "A-01", "P1", "OES-1"]),
        row(&["R2", "7002", "C-2", "0.5", "Azul", "Beta", "B-02", "P2", "OES-2"]),
        row(&["R1", "7004", "C-4", "1.0", "Branco", "Acme", "A-02", "P1", "OES-3"]),
    ];

    Arc::new(
        InMemorySheets::new()
            .with_worksheet(worksheets::ORDERS, orders)
            .with_worksheet(worksheets::ITEMS, items)
            .with_worksheet(worksheets::CATALOG, catalog),
    )
}

pub fn setup_test_app(sheets: Arc<InMemorySheets>) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = AppConfig::with_paths(dir.path().join("config.json"), dir.path().join("pedidos"))
        .expect("Failed to create test config");
    config.admin_password = Some(ADMIN_PASSWORD.to_string());

    let store = OrderStore::new(Some(sheets.clone()), Some("test-document".to_string()));
    let mirror = LocalMirror::new(&config.data_dir);
    let state = AppState::new(OrderService::new(store, mirror), config);

    TestApp {
        router: router(state.clone()),
        sheets,
        state,
        _dir: dir,
    }
}

/// Send one request and decode the JSON body (`Value::Null` when it is not JSON)
pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (status, json)
}

pub fn get(uri: &str, session: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-session-id", session)
        .body(Body::empty())
        .unwrap()
}

pub fn with_json(method: &str, uri: &str, session: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-session-id", session)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Same request carrying the admin password
pub fn as_admin(mut request: Request<Body>) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-admin-password", ADMIN_PASSWORD.parse().unwrap());
    request
}
