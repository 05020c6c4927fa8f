//! Table of externally defined types mapped onto OpenAPI `type`/`format` pairs.
//!
//! The table is loaded from a tab separated file:
//!
//! ```text
//! name            type    format
//! rust_decimal::Decimal   string  decimal   # comments are allowed
//! Url             string  uri
//! ```

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalType {
    pub schema_type: String,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalTypes {
    types: HashMap<String, ExternalType>,
}

impl ExternalTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TSV table. A path that is not a regular file yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            debug!("External types table {} not found, using an empty table", path.display());
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read external types table: {}", path.display()))?;
        Ok(Self::parse_tsv(&text))
    }

    pub fn parse_tsv(text: &str) -> Self {
        let mut table = Self::new();
        let mut columns: Vec<String> = Vec::new();

        for line in text.lines() {
            let line = line.split('#').next().unwrap_or_default();
            if line.trim().is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split('\t').map(str::trim).collect();
            if columns.is_empty() {
                columns = cells.iter().map(|c| c.to_string()).collect();
                continue;
            }

            let record: HashMap<&str, &str> = columns
                .iter()
                .zip(cells.iter())
                .filter(|(_, value)| !value.is_empty())
                .map(|(column, value)| (column.as_str(), *value))
                .collect();

            let (Some(name), Some(schema_type)) = (record.get("name"), record.get("type")) else {
                continue;
            };
            table.insert(
                name,
                ExternalType {
                    schema_type: schema_type.to_string(),
                    format: record.get("format").map(|f| f.to_string()),
                },
            );
        }

        debug!("Loaded {} external types", table.types.len());
        table
    }

    pub fn insert(&mut self, name: &str, external: ExternalType) {
        self.types.insert(name.to_string(), external);
    }

    /// Looks a type up, trying `qualifier::name`, `name`, then `qualifier`.
    pub fn lookup(&self, name: &str, qualifier: Option<&str>) -> Option<&ExternalType> {
        match qualifier {
            Some(qualifier) => self
                .types
                .get(&format!("{}::{}", qualifier, name))
                .or_else(|| self.types.get(name))
                .or_else(|| self.types.get(qualifier)),
            None => self.types.get(name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TABLE: &str = "name\ttype\tformat\n\
                         # money\n\
                         rust_decimal::Decimal\tstring\tdecimal\n\
                         Url\tstring\turi   # links\n\
                         bson\tstring\n\
                         \n\
                         broken\n";

    #[test]
    fn test_parse_tsv() {
        let table = ExternalTypes::parse_tsv(TABLE);
        assert_eq!(
            table.lookup("Decimal", Some("rust_decimal")),
            Some(&ExternalType {
                schema_type: "string".to_string(),
                format: Some("decimal".to_string()),
            })
        );
        assert_eq!(
            table.lookup("Url", None).and_then(|t| t.format.as_deref()),
            Some("uri")
        );
        assert!(table.lookup("broken", None).is_none());
    }

    #[test]
    fn test_lookup_falls_back_to_qualifier() {
        let table = ExternalTypes::parse_tsv(TABLE);
        let found = table.lookup("ObjectId", Some("bson")).unwrap();
        assert_eq!(found.schema_type, "string");
        assert!(found.format.is_none());
        assert!(table.lookup("ObjectId", None).is_none());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let table = ExternalTypes::load(&temp_dir.path().join("types.tsv")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("types.tsv");
        std::fs::write(&path, TABLE).unwrap();
        let table = ExternalTypes::load(&path).unwrap();
        assert!(table.lookup("Url", Some("url")).is_some());
    }
}
