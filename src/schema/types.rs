//! Schema types

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::LazyLock;

/// Precision used for every DECIMAL column
pub const DECIMAL_PRECISION: u8 = 38;

/// Largest decimal scale that still holds every BIGINT value
pub const MAX_SCALE_FOR_INTEGER: u8 = DECIMAL_PRECISION - 19;

static DECIMAL_TYPE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:DECIMAL|NUMERIC)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?$").unwrap()
});

/// Closed set of column types a field can infer to
///
/// Ordered by the widening order
/// `BOOLEAN < INTEGER < DECIMAL < DATE < TIMESTAMP < STRING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Boolean,
    Integer,
    /// Fixed-point number with `scale` fractional digits
    Decimal {
        scale: u8,
    },
    Date,
    Timestamp,
    String,
}

impl ColumnType {
    /// Position in the widening order
    pub fn rank(&self) -> u8 {
        match self {
            ColumnType::Boolean => 0,
            ColumnType::Integer => 1,
            ColumnType::Decimal { .. } => 2,
            ColumnType::Date => 3,
            ColumnType::Timestamp => 4,
            ColumnType::String => 5,
        }
    }

    /// Whether a column of this type can hold every value of `other` without loss
    pub fn accepts(&self, other: &ColumnType) -> bool {
        match (self, other) {
            (ColumnType::String, _) => true,
            (ColumnType::Decimal { scale: a }, ColumnType::Decimal { scale: b }) => a >= b,
            (ColumnType::Decimal { scale }, ColumnType::Integer) => *scale <= MAX_SCALE_FOR_INTEGER,
            (ColumnType::Timestamp, ColumnType::Date) => true,
            (a, b) => a == b,
        }
    }

    /// Narrowest type that holds every value of both types
    ///
    /// Falls back to STRING when neither side accepts the other, so the
    /// result is never narrower than either input in the widening order.
    pub fn join(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (ColumnType::Decimal { scale: a }, ColumnType::Decimal { scale: b }) => {
                ColumnType::Decimal { scale: a.max(b) }
            }
            (a, b) if a.accepts(&b) => a,
            (a, b) if b.accepts(&a) => b,
            _ => ColumnType::String,
        }
    }

    /// Whether a number with `integer_digits` digits before the point fits
    ///
    /// Only DECIMAL is bounded: its scale eats into the fixed precision.
    pub fn holds_integer_digits(&self, integer_digits: usize) -> bool {
        match self {
            ColumnType::Decimal { scale } => {
                integer_digits + *scale as usize <= DECIMAL_PRECISION as usize
            }
            _ => true,
        }
    }

    /// Warehouse DDL type
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Integer => "BIGINT".to_string(),
            ColumnType::Decimal { scale } => format!("DECIMAL({DECIMAL_PRECISION}, {scale})"),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::String => "VARCHAR".to_string(),
        }
    }

    /// Map a warehouse-reported data type back onto the closed type set
    ///
    /// Returns `None` for types the pipeline cannot reason about.
    pub fn from_sql(data_type: &str) -> Option<ColumnType> {
        let upper = data_type.trim().to_uppercase();

        if let Some(caps) = DECIMAL_TYPE_REGEX.captures(&upper) {
            let scale = caps
                .get(2)
                .and_then(|s| s.as_str().parse::<u8>().ok())
                .unwrap_or(0);
            return Some(ColumnType::Decimal { scale });
        }

        let base = upper.split('(').next().unwrap_or_default().trim();
        match base {
            "BOOLEAN" | "BOOL" | "LOGICAL" => Some(ColumnType::Boolean),
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "INT1" | "INT2" | "INT4" | "INT8"
            | "BIGINT" | "LONG" | "HUGEINT" => Some(ColumnType::Integer),
            "DATE" => Some(ColumnType::Date),
            "TIMESTAMP"
            | "DATETIME"
            | "TIMESTAMP_S"
            | "TIMESTAMP_MS"
            | "TIMESTAMP_NS"
            | "TIMESTAMPTZ"
            | "TIMESTAMP WITH TIME ZONE" => Some(ColumnType::Timestamp),
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "BPCHAR" => Some(ColumnType::String),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::Decimal { scale } => write!(f, "DECIMAL({DECIMAL_PRECISION}, {scale})"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::String => write!(f, "STRING"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ColumnType::from_sql(s).ok_or_else(|| Error::Other(format!("Unknown column type: {s}")))
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single column of a table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name (warehouse identifier)
    pub name: String,
    /// Column type
    pub column_type: ColumnType,
    /// Whether NULL is allowed
    pub nullable: bool,
}

impl ColumnDef {
    /// Create a new column definition
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable,
        }
    }
}

/// Ordered column list of a table, either inferred or read from the warehouse
///
/// Column names are unique (compared case-insensitively, like warehouse
/// identifiers).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from columns, rejecting duplicate names
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnDef>) -> Result<Self> {
        let mut schema = Self::new();
        for column in columns {
            schema.push(column)?;
        }
        Ok(schema)
    }

    /// Append a column
    pub fn push(&mut self, column: ColumnDef) -> Result<()> {
        if self.get(&column.name).is_some() {
            return Err(Error::Other(format!(
                "Duplicate column name '{}' in schema",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Mutable lookup by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ColumnDef> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Columns in order
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Column names in order
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Profile of one field of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProfile {
    /// Sanitized column name
    pub name: String,
    /// Header text as it appeared in the file
    pub source_name: String,
    /// Zero-based position in the file
    pub ordinal: usize,
    /// Number of values sampled (including nulls)
    pub sampled: usize,
    /// Number of sampled values that were empty or a null marker
    pub nulls: usize,
    /// Inferred type
    pub column_type: ColumnType,
    /// True if any sampled value was null, or nothing was sampled
    pub nullable: bool,
}

impl FieldProfile {
    /// Number of sampled non-null values
    pub fn non_null(&self) -> usize {
        self.sampled - self.nulls
    }

    /// Whether no non-null value was seen
    pub fn is_empty(&self) -> bool {
        self.non_null() == 0
    }

    /// Column definition for the inferred schema
    pub fn to_column(&self) -> ColumnDef {
        ColumnDef::new(self.name.clone(), self.column_type, self.nullable)
    }
}

/// A field's running type widened while sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widening {
    /// Field that widened
    pub field: String,
    /// Type before the value was seen
    pub from: ColumnType,
    /// Type after the value was seen
    pub to: ColumnType,
    /// One-based line (record) number of the value
    pub line: u64,
    /// The value that caused the widening
    pub value: String,
}

impl std::fmt::Display for Widening {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "field '{}' widened {} -> {} at line {} (value '{}')",
            self.field, self.from, self.to, self.line, self.value
        )
    }
}

/// Result of profiling one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileReport {
    /// One profile per field, in file order
    pub fields: Vec<FieldProfile>,
    /// Data rows sampled
    pub rows_sampled: usize,
    /// Rows skipped because their field count did not match the header
    pub malformed_rows: usize,
    /// True if sampling stopped at the row cap before end of file
    pub truncated: bool,
    /// Type widenings observed, in the order they happened
    pub widenings: Vec<Widening>,
}

impl ProfileReport {
    /// Inferred schema of all fields
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            columns: self.fields.iter().map(FieldProfile::to_column).collect(),
        }
    }

    /// Inferred schema without fields that never held a value
    pub fn schema_without_empty(&self) -> TableSchema {
        TableSchema {
            columns: self
                .fields
                .iter()
                .filter(|f| !f.is_empty())
                .map(FieldProfile::to_column)
                .collect(),
        }
    }

    /// Whether the file had no data rows at all
    pub fn has_no_rows(&self) -> bool {
        self.rows_sampled == 0 && self.malformed_rows == 0
    }

    /// Look up a field by sanitized name
    pub fn field(&self, name: &str) -> Option<&FieldProfile> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }
}
