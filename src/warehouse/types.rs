//! Warehouse request and outcome types

use super::sql::{quote_ident, quote_literal};
use crate::schema::ColumnDef;
use crate::source::SourceFile;
use crate::types::LoadMode;
use serde::{Deserialize, Serialize};

/// Maps one source field onto one destination column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Zero-based field position in the source file
    pub field_index: usize,
    /// Destination column, with the type values are converted to
    pub column: ColumnDef,
}

/// Everything the bulk-load primitive needs for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Destination table
    pub table: String,
    /// Source file
    pub source: SourceFile,
    /// Fields to load, in insert order
    pub columns: Vec<ColumnMapping>,
    /// Append or replace
    pub mode: LoadMode,
}

impl LoadRequest {
    /// Destination column names in insert order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.name.as_str()).collect()
    }
}

impl std::fmt::Display for LoadRequest {
    /// Statement text recorded in the audit log
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| quote_ident(&c.column.name))
            .collect();
        write!(
            f,
            "COPY {} ({}) FROM {} (DELIMITER {}, QUOTE {}, HEADER, MODE {})",
            quote_ident(&self.table),
            columns.join(", "),
            quote_literal(&self.source.display()),
            quote_literal(&char::from(self.source.format.delimiter).to_string()),
            quote_literal(&char::from(self.source.format.quote).to_string()),
            self.mode.to_string().to_uppercase(),
        )
    }
}

/// A source row that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRejection {
    /// One-based line number in the source file
    pub line: u64,
    /// Column the bad value was destined for
    pub column: Option<String>,
    /// The offending raw value
    pub value: Option<String>,
    /// Why the row was rejected
    pub reason: String,
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rejected line {}", self.line)?;
        if let Some(column) = &self.column {
            write!(f, ", column '{column}'")?;
        }
        if let Some(value) = &self.value {
            write!(f, ", value '{value}'")?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Result of a bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    /// Rows inserted
    pub rows_loaded: u64,
    /// Rows left out, in file order
    pub rejected: Vec<RowRejection>,
}

impl LoadOutcome {
    pub fn rows_rejected(&self) -> u64 {
        self.rejected.len() as u64
    }

    /// Whether every row was loaded
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}
