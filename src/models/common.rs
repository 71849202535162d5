use serde::{Deserialize, Serialize};

/// Where the data of a read came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadSource {
    /// Fetched from the remote spreadsheet just now
    Remote,
    /// Served from the session cache
    Cache,
    /// Remote read failed, last value fetched in this session was served
    StaleCache,
    /// Remote read failed and nothing was cached, data is empty
    Unavailable,
}

impl ReadSource {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ReadSource::StaleCache | ReadSource::Unavailable)
    }
}

/// Envelope for read endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResponse<T> {
    pub data: T,
    pub source: ReadSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
