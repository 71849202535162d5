use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{
    handlers::{require_admin, session_cache, ApiError},
    models::config::{BackupInfo, RestoreBackupResponse},
    AppState,
};

/// Handler for GET /api/backups
/// Local backups, newest first. Requires the admin password.
pub async fn list_backups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BackupInfo>>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.orders.list_backups().await?))
}

/// Handler for POST /api/backups/{name}/restore
/// Rewrites the remote tables from the backup. Requires the admin password.
pub async fn restore_backup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<RestoreBackupResponse>, ApiError> {
    require_admin(&state, &headers)?;
    tracing::info!("Restoring backup {}", name);

    let cache = session_cache(&state, &headers).await;
    let restored = state.orders.restore_backup(&cache, &name).await?;

    // Other sessions hold tables from before the restore
    state.sessions.clear();

    Ok(Json(restored))
}
