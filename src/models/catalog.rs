//! Rack/cable catalog ("Projeto" worksheet)

use serde::{Deserialize, Serialize};

use crate::models::sheet::Record;

/// Column headers of the "Projeto" worksheet
pub mod columns {
    pub const RACK: &str = "RACK";
    pub const PART_CODE: &str = "CÓD Yazaki";
    pub const CABLE_CODE: &str = "Codigo Cabo";
    pub const SECTION: &str = "Secção";
    pub const COLOR: &str = "Cor";
    pub const CLIENT: &str = "Cliente";
    pub const LOCATION: &str = "Locação";
    pub const PROJECT: &str = "Projeto";
    pub const OES_CODE: &str = "Cod OES";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub rack: String,
    pub part_code: String,
    pub cable_code: String,
    pub section: String,
    pub color: String,
    pub client: String,
    pub location: String,
    pub project: String,
    pub oes_code: String,
}

impl CatalogEntry {
    /// Missing cells become empty strings, every value is trimmed
    pub fn from_record(record: &Record) -> Self {
        let cell = |column: &str| {
            record
                .get(column)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        Self {
            rack: cell(columns::RACK),
            part_code: cell(columns::PART_CODE),
            cable_code: cell(columns::CABLE_CODE),
            section: cell(columns::SECTION),
            color: cell(columns::COLOR),
            client: cell(columns::CLIENT),
            location: cell(columns::LOCATION),
            project: cell(columns::PROJECT),
            oes_code: cell(columns::OES_CODE),
        }
    }

    /// Case-insensitive exact match on client and rack, absent filters match everything
    pub fn matches(&self, query: &CatalogQuery) -> bool {
        let eq = |filter: &Option<String>, value: &str| match filter.as_deref() {
            Some(f) if !f.is_empty() => f.to_lowercase() == value.to_lowercase(),
            _ => true,
        };
        eq(&query.client, &self.client) && eq(&query.rack, &self.rack)
    }
}

/// Query parameters for GET /api/catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub client: Option<String>,
    pub rack: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(client: &str, rack: &str) -> CatalogEntry {
        let record: Record = [("Cliente", client), ("RACK", rack), ("Cor", " Azul ")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CatalogEntry::from_record(&record)
    }

    #[test]
    fn test_from_record_trims_and_defaults() {
        let e = entry("Acme", "R1");
        assert_eq!(e.color, "Azul");
        assert_eq!(e.project, "");
    }

    #[test]
    fn test_matches_is_case_insensitive_exact() {
        let e = entry("Acme", "R1");
        let query = CatalogQuery {
            client: Some("acme".to_string()),
            rack: Some("r1".to_string()),
        };
        assert!(e.matches(&query));

        let partial = CatalogQuery {
            client: Some("acm".to_string()),
            rack: None,
        };
        assert!(!e.matches(&partial));
        assert!(e.matches(&CatalogQuery::default()));
    }
}
