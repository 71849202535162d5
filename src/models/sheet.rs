//! Worksheet grids and header -> value records

use std::collections::HashMap;
use std::fmt;

/// Cell values of a worksheet, first row is the header
pub type Grid = Vec<Vec<String>>;

/// One data row keyed by header
pub type Record = HashMap<String, String>;

/// Why a worksheet row could not be turned into a model
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    MissingColumn(&'static str),
    InvalidValue { column: &'static str, value: String },
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowError::MissingColumn(column) => write!(f, "Missing column '{}'", column),
            RowError::InvalidValue { column, value } => {
                write!(f, "Invalid value '{}' in column '{}'", value, column)
            }
        }
    }
}

impl std::error::Error for RowError {}

/// Turn a grid into records. Short rows are padded with empty strings and
/// fully blank rows are skipped.
pub fn records_from_grid(grid: &[Vec<String>]) -> Vec<Record> {
    let Some((header, rows)) = grid.split_first() else {
        return Vec::new();
    };

    rows.iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            header
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.trim().is_empty())
                .map(|(i, name)| (name.trim().to_string(), row.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect()
}

/// Parse every record of a grid. Rows with a bad value are logged and skipped so one
/// hand-edited cell does not hide the whole table; a missing column is still an error.
pub fn parse_records<T, F>(grid: &[Vec<String>], table: &str, parse: F) -> Result<Vec<T>, RowError>
where
    F: Fn(&Record) -> Result<T, RowError>,
{
    let mut parsed = Vec::new();
    for (i, record) in records_from_grid(grid).iter().enumerate() {
        match parse(record) {
            Ok(value) => parsed.push(value),
            Err(e @ RowError::InvalidValue { .. }) => {
                tracing::warn!("Skipping record {} of '{}': {}", i + 1, table, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(parsed)
}

/// Header row followed by the given rows
pub fn grid_with_header<I>(headers: &[&str], rows: I) -> Grid
where
    I: IntoIterator<Item = Vec<String>>,
{
    std::iter::once(headers.iter().map(|h| h.to_string()).collect())
        .chain(rows)
        .collect()
}

/// Zero-based position of a header in the first row
pub fn column_index(grid: &[Vec<String>], header: &str) -> Option<usize> {
    grid.first()?.iter().position(|h| h.trim() == header)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_records_pad_short_rows() {
        let g = grid(&[&["a", "b", "c"], &["1", "2"]]);
        let records = records_from_grid(&g);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["a"], "1");
        assert_eq!(records[0]["c"], "");
    }

    #[test]
    fn test_records_skip_blank_rows() {
        let g = grid(&[&["a", "b"], &["", " "], &["x", "y"]]);
        let records = records_from_grid(&g);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["a"], "x");
    }

    #[test]
    fn test_records_from_empty_grid() {
        assert!(records_from_grid(&[]).is_empty());
        assert!(records_from_grid(&grid(&[&["a"]])).is_empty());
    }

    fn parse_number(record: &Record) -> Result<u32, RowError> {
        let cell = record.get("n").ok_or(RowError::MissingColumn("n"))?;
        cell.trim().parse().map_err(|_| RowError::InvalidValue {
            column: "n",
            value: cell.clone(),
        })
    }

    #[test]
    fn test_parse_records_skips_bad_values() {
        let g = grid(&[&["n"], &["1"], &["x"], &["3"]]);
        assert_eq!(parse_records(&g, "t", parse_number).unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_parse_records_missing_column_fails() {
        let g = grid(&[&["m"], &["1"]]);
        assert_eq!(
            parse_records(&g, "t", parse_number),
            Err(RowError::MissingColumn("n"))
        );
    }

    #[test]
    fn test_column_index() {
        let g = grid(&[&["Numero_Pedido", "Status"]]);
        assert_eq!(column_index(&g, "Status"), Some(1));
        assert_eq!(column_index(&g, "Urgente"), None);
    }
}
