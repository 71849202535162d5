use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pedidos_backend::config::{document_id_from_url, AppConfig};
use pedidos_backend::models::order::RemoteSync;
use pedidos_backend::services::google_sheets::client_from_config;
use pedidos_backend::services::local_mirror::LocalMirror;
use pedidos_backend::services::order_lifecycle::OrderService;
use pedidos_backend::services::session_cache::SessionCache;
use pedidos_backend::services::sheets_store::OrderStore;

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

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin restore_backup list");
        eprintln!("       cargo run --bin restore_backup <backup_name>");
        eprintln!("Example: cargo run --bin restore_backup pedidos_backup_20250305_143000_123.json");
        std::process::exit(1);
    }

    let config = AppConfig::from_env();
    let store = OrderStore::new(client_from_config(&config), document_id_from_url(config.sheets_url()));
    let service = OrderService::new(store, LocalMirror::new(&config.data_dir));

    if args[1] == "list" {
        let backups = service.list_backups().await?;
        if backups.is_empty() {
            println!("No backups in {}", config.data_dir.display());
        }
        for backup in backups {
            println!("{}  ({} bytes)", backup.name, backup.size_bytes);
        }
        return Ok(());
    }

    let name = &args[1];
    tracing::info!("Restoring {} into {}", name, config.data_dir.display());

    let restored = service.restore_backup(&SessionCache::new(), name).await?;
    match restored.remote {
        RemoteSync::Synced => tracing::info!(
            "Restored {} orders and {} items, Google Sheets updated",
            restored.orders,
            restored.items
        ),
        RemoteSync::Failed { warning, .. } => tracing::warn!(
            "Restored {} orders and {} items locally only: {}",
            restored.orders,
            restored.items,
            warning
        ),
    }

    Ok(())
}
