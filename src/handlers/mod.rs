pub mod backups;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod orders;

use axum::{
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    models::common::ErrorResponse,
    services::{
        local_mirror::MirrorError, order_lifecycle::OrderError, session_cache::SessionCache,
        sheets_store::StoreError,
    },
    AppState,
};

/// Request header identifying the UI session
pub const SESSION_HEADER: &str = "x-session-id";

/// Session used by requests without a session header
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Request header carrying the admin password
pub const ADMIN_HEADER: &str = "x-admin-password";

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Cache of the session named by the request headers
pub async fn session_cache(state: &AppState, headers: &HeaderMap) -> SessionCache {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(ANONYMOUS_SESSION);

    state.sessions.session(session_id).await
}

/// Gate for endpoints that repoint or rewrite the spreadsheet.
/// 401 for a missing or wrong password, 403 when no admin password is configured.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config.read().admin_password.clone() else {
        tracing::warn!("Admin request refused: ADMIN_PASSWORD is not set");
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "Admin actions are disabled on this server",
        ));
    };

    let given = headers.get(ADMIN_HEADER).and_then(|v| v.to_str().ok());
    if given != Some(expected.as_str()) {
        tracing::warn!("Admin request refused: wrong or missing password");
        return Err(api_error(StatusCode::UNAUTHORIZED, "Senha incorreta"));
    }
    Ok(())
}

pub fn store_error_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Quota(_) => StatusCode::TOO_MANY_REQUESTS,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::MissingColumn(_) | StoreError::InvalidRow(_) | StoreError::Remote(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        let status = match &e {
            OrderError::Validation(_) => StatusCode::BAD_REQUEST,
            OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::Store(store) => store_error_status(store),
            OrderError::Mirror(MirrorError::InvalidBackupName(_)) => StatusCode::BAD_REQUEST,
            OrderError::Mirror(MirrorError::BackupNotFound(_)) => StatusCode::NOT_FOUND,
            OrderError::Mirror(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", e);
        }

        let error = match &e {
            OrderError::Store(store) if store.is_quota() => store.notice().to_string(),
            _ => e.to_string(),
        };
        api_error(status, error)
    }
}
