use serde::{Deserialize, Serialize};

/// Response of GET /api/config/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsStatusResponse {
    pub configured: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of PUT /api/config/sheets-url
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSheetsUrlRequest {
    pub sheets_url: String,
}

/// One file of the backup directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub name: String,
    pub size_bytes: u64,
}

/// Response of POST /api/backups/{name}/restore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreBackupResponse {
    pub name: String,
    pub orders: usize,
    pub items: usize,
    pub remote: crate::models::order::RemoteSync,
}
