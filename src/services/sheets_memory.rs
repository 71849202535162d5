//! In-memory spreadsheet backend
//!
//! Holds worksheets as plain grids, counts every call per operation and can be told to
//! fail an operation, which is how the cache fallback and quota paths are exercised in
//! tests without a Google account.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::models::sheet::Grid;
use crate::services::sheets_client::{SheetsClient, SheetsError};

/// Operation names accepted by `fail_once`, `fail_always` and `calls`
pub mod ops {
    pub const WORKSHEET_TITLES: &str = "worksheet_titles";
    pub const ADD_WORKSHEET: &str = "add_worksheet";
    pub const GET_VALUES: &str = "get_values";
    pub const CLEAR: &str = "clear";
    pub const APPEND_ROWS: &str = "append_rows";
    pub const UPDATE_CELL: &str = "update_cell";
    pub const FORMAT_HEADER: &str = "format_header";
}

#[derive(Default)]
pub struct InMemorySheets {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    /// Worksheet titles in creation order
    order: Vec<String>,
    worksheets: HashMap<String, Grid>,
    calls: HashMap<&'static str, usize>,
    one_shot_failures: HashMap<&'static str, VecDeque<String>>,
    sticky_failures: HashMap<&'static str, String>,
}

impl MemoryState {
    fn enter(&mut self, op: &'static str) -> Result<(), SheetsError> {
        *self.calls.entry(op).or_insert(0) += 1;

        if let Some(message) = self.one_shot_failures.get_mut(op).and_then(|q| q.pop_front()) {
            return Err(SheetsError::new(message));
        }
        if let Some(message) = self.sticky_failures.get(op) {
            return Err(SheetsError::new(message.clone()));
        }
        Ok(())
    }

    fn worksheet_mut(&mut self, title: &str) -> Result<&mut Grid, SheetsError> {
        self.worksheets
            .get_mut(title)
            .ok_or_else(|| SheetsError::new(format!("[400] Unable to parse range: '{}'", title)))
    }
}

impl InMemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a worksheet with the given grid
    pub fn with_worksheet(self, title: &str, grid: Grid) -> Self {
        self.set_worksheet(title, grid);
        self
    }

    pub fn set_worksheet(&self, title: &str, grid: Grid) {
        let mut state = self.state.lock();
        if !state.worksheets.contains_key(title) {
            state.order.push(title.to_string());
        }
        state.worksheets.insert(title.to_string(), grid);
    }

    pub fn worksheet(&self, title: &str) -> Option<Grid> {
        self.state.lock().worksheets.get(title).cloned()
    }

    /// Fail the next call of `op` with `message`
    pub fn fail_once(&self, op: &'static str, message: &str) {
        self.state
            .lock()
            .one_shot_failures
            .entry(op)
            .or_default()
            .push_back(message.to_string());
    }

    /// Fail every call of `op` until `recover` is called
    pub fn fail_always(&self, op: &'static str, message: &str) {
        self.state.lock().sticky_failures.insert(op, message.to_string());
    }

    pub fn recover(&self) {
        let mut state = self.state.lock();
        state.sticky_failures.clear();
        state.one_shot_failures.clear();
    }

    /// Number of calls made to `op`, failed ones included
    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().calls.get(op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.values().sum()
    }
}

#[async_trait]
impl SheetsClient for InMemorySheets {
    async fn worksheet_titles(&self, _document: &str) -> Result<Vec<String>, SheetsError> {
        let mut state = self.state.lock();
        state.enter(ops::WORKSHEET_TITLES)?;
        Ok(state.order.clone())
    }

    async fn add_worksheet(
        &self,
        _document: &str,
        title: &str,
        _rows: u32,
        _cols: u32,
    ) -> Result<(), SheetsError> {
        let mut state = self.state.lock();
        state.enter(ops::ADD_WORKSHEET)?;
        if state.worksheets.contains_key(title) {
            return Err(SheetsError::new(format!(
                "[400] A sheet with the name \"{}\" already exists",
                title
            )));
        }
        state.order.push(title.to_string());
        state.worksheets.insert(title.to_string(), Vec::new());
        Ok(())
    }

    async fn get_values(&self, _document: &str, worksheet: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let mut state = self.state.lock();
        state.enter(ops::GET_VALUES)?;
        Ok(state.worksheet_mut(worksheet)?.clone())
    }

    async fn clear(&self, _document: &str, worksheet: &str) -> Result<(), SheetsError> {
        let mut state = self.state.lock();
        state.enter(ops::CLEAR)?;
        state.worksheet_mut(worksheet)?.clear();
        Ok(())
    }

    async fn append_rows(
        &self,
        _document: &str,
        worksheet: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<(), SheetsError> {
        let mut state = self.state.lock();
        state.enter(ops::APPEND_ROWS)?;
        state.worksheet_mut(worksheet)?.extend(rows);
        Ok(())
    }

    async fn update_cell(
        &self,
        _document: &str,
        worksheet: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), SheetsError> {
        let mut state = self.state.lock();
        state.enter(ops::UPDATE_CELL)?;
        if row == 0 || col == 0 {
            return Err(SheetsError::new("[400] Rows and columns start at 1"));
        }

        let grid = state.worksheet_mut(worksheet)?;
        if grid.len() < row {
            grid.resize(row, Vec::new());
        }
        let cells = &mut grid[row - 1];
        if cells.len() < col {
            cells.resize(col, String::new());
        }
        cells[col - 1] = value.to_string();
        Ok(())
    }

    async fn format_header(&self, _document: &str, worksheet: &str) -> Result<(), SheetsError> {
        let mut state = self.state.lock();
        state.enter(ops::FORMAT_HEADER)?;
        state.worksheet_mut(worksheet)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_cell_grows_grid() {
        let sheets = InMemorySheets::new().with_worksheet("Pedidos", vec![vec!["a".to_string()]]);
        sheets.update_cell("doc", "Pedidos", 2, 3, "x").await.unwrap();

        let grid = sheets.worksheet("Pedidos").unwrap();
        assert_eq!(grid[1], vec!["", "", "x"]);
        assert_eq!(sheets.calls(ops::UPDATE_CELL), 1);
    }

    #[tokio::test]
    async fn test_fail_once_then_recover() {
        let sheets = InMemorySheets::new().with_worksheet("Itens", Vec::new());
        sheets.fail_once(ops::GET_VALUES, "[429] Quota exceeded");

        assert!(sheets.get_values("doc", "Itens").await.is_err());
        assert!(sheets.get_values("doc", "Itens").await.is_ok());
        assert_eq!(sheets.calls(ops::GET_VALUES), 2);
    }
}
