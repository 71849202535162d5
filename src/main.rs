use pedidos_backend::{
    config::{document_id_from_url, AppConfig},
    router,
    services::{
        google_sheets::client_from_config, local_mirror::LocalMirror,
        order_lifecycle::OrderService, sheets_store::OrderStore,
    },
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pedidos_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();

    let client = client_from_config(&config);
    let document = document_id_from_url(config.sheets_url());
    if document.is_none() {
        tracing::warn!("No Google Sheets URL configured, set it via PUT /api/config/sheets-url");
    }
    if config.admin_password.is_none() {
        tracing::warn!("ADMIN_PASSWORD not set, config and backup endpoints are disabled");
    }
    let store = OrderStore::new(client, document);

    let mirror = LocalMirror::new(&config.data_dir);
    mirror.init().await?;
    tracing::info!("Local mirror at {}", mirror.file_path().display());

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(OrderService::new(store, mirror), config);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
