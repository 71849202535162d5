//! Google Sheets v4 REST client
//!
//! Authenticates as a service account (RS256-signed JWT exchanged for an OAuth access
//! token) and implements `SheetsClient` on top of the values and batchUpdate endpoints.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::{AppConfig, ServiceAccountKey};
use crate::services::sheets_client::{column_letters, SheetsClient, SheetsError};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";

/// Tokens are refreshed this long before Google says they expire
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Header styling covers columns A..Z
const HEADER_COLUMNS: u32 = 26;

#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    key: Arc<ServiceAccountKey>,
    signing_key: Arc<EncodingKey>,
    base_url: String,
    token: Arc<RwLock<Option<AccessToken>>>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl GoogleSheetsClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self, SheetsError> {
        Self::with_base_url(key, SHEETS_API_BASE.to_string())
    }

    pub fn with_base_url(key: ServiceAccountKey, base_url: String) -> Result<Self, SheetsError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetsError::new(format!("Invalid service account private key: {}", e)))?;

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            key: Arc::new(key),
            signing_key: Arc::new(signing_key),
            base_url,
            token: Arc::new(RwLock::new(None)),
        })
    }

    async fn access_token(&self) -> Result<String, SheetsError> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref() {
                if token.expires_at > Utc::now() + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS) {
                    return Ok(token.value.clone());
                }
            }
        }

        tracing::debug!("Requesting Google access token for {}", self.key.client_email);

        let now = Utc::now();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: (now + ChronoDuration::hours(1)).timestamp(),
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| SheetsError::new(format!("Failed to sign token request: {}", e)))?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(SheetsError::new(format!(
                "Google token error [{}]: {}",
                status.as_u16(),
                error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        let value = token.access_token.clone();

        *self.token.write().await = Some(AccessToken {
            value: token.access_token,
            expires_at: now + ChronoDuration::seconds(token.expires_in),
        });

        Ok(value)
    }

    /// Attach the bearer token, send, and turn non-2xx answers into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(SheetsError::new(format!(
                "Sheets API error [{}]: {}",
                status.as_u16(),
                error_text
            )));
        }

        Ok(response)
    }

    /// `{base}/{document}/values/{range}{suffix}` with the range percent-encoded
    fn values_url(&self, document: &str, range: &str, suffix: &str) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, document))
            .map_err(|e| SheetsError::new(format!("Invalid spreadsheet URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::new("Spreadsheet URL cannot be a base"))?
            .push("values")
            .push(&format!("{}{}", range, suffix));
        Ok(url)
    }

    async fn batch_update(&self, document: &str, requests: serde_json::Value) -> Result<(), SheetsError> {
        let url = format!("{}/{}:batchUpdate", self.base_url, document);
        self.send(self.client.post(&url).json(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    async fn sheet_properties(&self, document: &str) -> Result<Vec<SheetProperties>, SheetsError> {
        let url = format!("{}/{}", self.base_url, document);
        let response = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("fields", "sheets.properties(sheetId,title)")]),
            )
            .await?;

        let meta: SpreadsheetMeta = response.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }
}

/// Client for the configured service account. Missing or unusable credentials are
/// logged and leave the store unconfigured instead of stopping the server.
pub fn client_from_config(config: &AppConfig) -> Option<Arc<dyn SheetsClient>> {
    let key = match config.credentials() {
        Ok(Some(key)) => key,
        Ok(None) => {
            tracing::warn!("No Google service-account credentials configured");
            return None;
        }
        Err(e) => {
            tracing::warn!("Ignoring Google credentials: {}", e);
            return None;
        }
    };

    let email = key.client_email.clone();
    match GoogleSheetsClient::new(key) {
        Ok(client) => {
            tracing::info!("Google Sheets client ready for {}", email);
            let client: Arc<dyn SheetsClient> = Arc::new(client);
            Some(client)
        }
        Err(e) => {
            tracing::warn!("Failed to initialize Google Sheets client: {}", e);
            None
        }
    }
}

/// Worksheet title quoted for A1 notation
fn quoted(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetsClient for GoogleSheetsClient {
    async fn worksheet_titles(&self, document: &str) -> Result<Vec<String>, SheetsError> {
        Ok(self
            .sheet_properties(document)
            .await?
            .into_iter()
            .map(|p| p.title)
            .collect())
    }

    async fn add_worksheet(
        &self,
        document: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), SheetsError> {
        tracing::info!("Creating worksheet '{}'", title);
        self.batch_update(
            document,
            json!([{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]),
        )
        .await
    }

    async fn get_values(&self, document: &str, worksheet: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.values_url(document, &quoted(worksheet), "")?;
        let response = self.send(self.client.get(url)).await?;
        let range: ValueRange = response.json().await?;

        tracing::debug!("Fetched {} rows from '{}'", range.values.len(), worksheet);

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn clear(&self, document: &str, worksheet: &str) -> Result<(), SheetsError> {
        let url = self.values_url(document, &quoted(worksheet), ":clear")?;
        self.send(self.client.post(url).json(&json!({}))).await?;
        Ok(())
    }

    async fn append_rows(
        &self,
        document: &str,
        worksheet: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        if rows.is_empty() {
            return Ok(());
        }

        let url = self.values_url(document, &format!("{}!A1", quoted(worksheet)), ":append")?;
        self.send(
            self.client
                .post(url)
                .query(&[
                    ("valueInputOption", "USER_ENTERED"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&json!({ "values": rows })),
        )
        .await?;
        Ok(())
    }

    async fn update_cell(
        &self,
        document: &str,
        worksheet: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), SheetsError> {
        let range = format!("{}!{}{}", quoted(worksheet), column_letters(col), row);
        let url = self.values_url(document, &range, "")?;
        self.send(
            self.client
                .put(url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&json!({ "range": range, "values": [[value]] })),
        )
        .await?;
        Ok(())
    }

    async fn format_header(&self, document: &str, worksheet: &str) -> Result<(), SheetsError> {
        let sheet_id = self
            .sheet_properties(document)
            .await?
            .into_iter()
            .find(|p| p.title == worksheet)
            .map(|p| p.sheet_id)
            .ok_or_else(|| SheetsError::new(format!("Worksheet '{}' not found", worksheet)))?;

        self.batch_update(
            document,
            json!([
                {
                    "repeatCell": {
                        "range": {
                            "sheetId": sheet_id,
                            "startRowIndex": 0,
                            "endRowIndex": 1,
                            "startColumnIndex": 0,
                            "endColumnIndex": HEADER_COLUMNS
                        },
                        "cell": {
                            "userEnteredFormat": {
                                "backgroundColor": { "red": 0.8, "green": 0.8, "blue": 0.8 },
                                "horizontalAlignment": "CENTER",
                                "textFormat": { "bold": true }
                            }
                        },
                        "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)"
                    }
                },
                {
                    "updateSheetProperties": {
                        "properties": {
                            "sheetId": sheet_id,
                            "gridProperties": { "frozenRowCount": 1 }
                        },
                        "fields": "gridProperties.frozenRowCount"
                    }
                }
            ]),
        )
        .await
    }
}
