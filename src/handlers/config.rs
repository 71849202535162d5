use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    config::document_id_from_url,
    handlers::{api_error, require_admin, ApiError},
    models::config::{SheetsStatusResponse, UpdateSheetsUrlRequest},
    AppState,
};

async fn sheets_status(state: &AppState) -> SheetsStatusResponse {
    let store = state.orders.store();
    let document_id = store.document_id();

    if !store.is_configured() {
        return SheetsStatusResponse {
            configured: false,
            connected: false,
            document_id,
            error: None,
        };
    }

    match store.check_connection().await {
        Ok(worksheets) => {
            tracing::debug!("Spreadsheet reachable, worksheets: {:?}", worksheets);
            SheetsStatusResponse {
                configured: true,
                connected: true,
                document_id,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!("Spreadsheet connection check failed: {}", e);
            SheetsStatusResponse {
                configured: true,
                connected: false,
                document_id,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Handler for GET /api/config/status
/// Whether credentials and a spreadsheet are configured, and whether it can be opened
pub async fn get_sheets_status(State(state): State<AppState>) -> Json<SheetsStatusResponse> {
    Json(sheets_status(&state).await)
}

/// Handler for PUT /api/config/sheets-url
/// Saves a new spreadsheet URL and switches to it. Every session cache is dropped.
/// Requires the admin password.
pub async fn update_sheets_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateSheetsUrlRequest>,
) -> Result<Json<SheetsStatusResponse>, ApiError> {
    require_admin(&state, &headers)?;

    let document_id = document_id_from_url(&request.sheets_url).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid Google Sheets URL: '{}'", request.sheets_url),
        )
    })?;

    state
        .config
        .write()
        .save_sheets_url(&request.sheets_url)
        .map_err(|e| {
            tracing::error!("Failed to save spreadsheet URL: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    tracing::info!("Switching to spreadsheet {}", document_id);
    state.orders.store().set_document(Some(document_id));
    state.sessions.clear();

    Ok(Json(sheets_status(&state).await))
}
