//! Capability surface of the remote spreadsheet
//!
//! The order store only needs these operations from a spreadsheet backend, so the
//! Google implementation and the in-memory one used by tests are interchangeable.

use async_trait::async_trait;
use std::fmt;

/// Error reported by a spreadsheet backend. The message carries the HTTP status as
/// `[NNN]` when there is one, which is what quota detection looks for.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetsError {
    pub message: String,
}

impl SheetsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SheetsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SheetsError {}

impl From<reqwest::Error> for SheetsError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => SheetsError::new(format!("[{}] {}", status.as_u16(), e)),
            None => SheetsError::new(e.to_string()),
        }
    }
}

/// Worksheet operations on one spreadsheet document.
///
/// Rows and columns are 1-based, as in the spreadsheet UI.
#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Titles of the worksheets of the document (also used as a connection check)
    async fn worksheet_titles(&self, document: &str) -> Result<Vec<String>, SheetsError>;

    async fn add_worksheet(
        &self,
        document: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), SheetsError>;

    /// Every non-empty row of the worksheet, header included
    async fn get_values(&self, document: &str, worksheet: &str) -> Result<Vec<Vec<String>>, SheetsError>;

    async fn clear(&self, document: &str, worksheet: &str) -> Result<(), SheetsError>;

    /// Append rows after the last non-empty row
    async fn append_rows(
        &self,
        document: &str,
        worksheet: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError>;

    async fn update_cell(
        &self,
        document: &str,
        worksheet: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), SheetsError>;

    /// Grey bold centred header row, frozen
    async fn format_header(&self, document: &str, worksheet: &str) -> Result<(), SheetsError>;
}

/// A1 column letters for a 1-based column index (1 -> A, 27 -> AA)
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    letters.iter().rev().collect()
}
