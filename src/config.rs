//! Loader configuration
//!
//! This module contains the configuration structures for a load batch,
//! loaded from YAML and overridable from the command line.

use crate::error::{Error, Result};
use crate::schema::DEFAULT_SAMPLE_ROWS;
use crate::source::FormatOptions;
use crate::template::validate_template;
use crate::types::LoadMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

static TABLE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap()
});

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete loader configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Warehouse connection
    pub warehouse: WarehouseConfig,
    /// Destination naming and load behaviour
    pub destination: DestinationConfig,
    /// Source file dialect
    pub format: FormatOptions,
    /// Type profiling
    pub profiling: ProfilingConfig,
    /// Timeouts and parallelism
    pub execution: ExecutionConfig,
    /// Durable audit log
    pub audit: AuditConfig,
}

// ============================================================================
// Sections
// ============================================================================

/// Warehouse connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// DuckDB database file, or `:memory:`
    pub path: String,
    /// Statements run once after connecting
    pub init_statements: Vec<String>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: "flatload.duckdb".to_string(),
            init_statements: Vec::new(),
        }
    }
}

/// Destination table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Table name template, e.g. `raw_{{ file.stem }}`
    pub table_template: String,
    /// Variables available to the template as `vars.<name>`
    pub vars: BTreeMap<String, String>,
    /// Append to or replace existing rows
    pub load_mode: LoadMode,
    /// Leave fields without any value out of the destination
    pub drop_empty_columns: bool,
    /// Comment new tables with their source file name
    pub comment_source_file: bool,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            table_template: "{{ file.stem }}".to_string(),
            vars: BTreeMap::new(),
            load_mode: LoadMode::Append,
            drop_empty_columns: false,
            comment_source_file: true,
        }
    }
}

/// Type profiling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilingConfig {
    /// Row cap for sampling (0 = whole file)
    pub sample_rows: usize,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout for each warehouse call, in seconds
    pub statement_timeout_secs: u64,
    /// Destination tables processed at the same time
    pub concurrency: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            statement_timeout_secs: 300,
            concurrency: 1,
        }
    }
}

impl ExecutionConfig {
    /// Per-statement timeout
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

/// Audit log settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Log table in the warehouse
    pub table: String,
    /// Optional JSON-lines copy of the log
    pub file: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            table: "load_audit_log".to_string(),
            file: None,
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub warehouse: Option<String>,
    pub table_template: Option<String>,
    pub sample_rows: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub load_mode: Option<LoadMode>,
    pub delimiter: Option<String>,
    pub concurrency: Option<usize>,
    pub audit_file: Option<PathBuf>,
}

impl LoaderConfig {
    /// Apply overrides and re-validate
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(path) = &overrides.warehouse {
            self.warehouse.path.clone_from(path);
        }
        if let Some(template) = &overrides.table_template {
            self.destination.table_template.clone_from(template);
        }
        if let Some(rows) = overrides.sample_rows {
            self.profiling.sample_rows = rows;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.execution.statement_timeout_secs = secs;
        }
        if let Some(mode) = overrides.load_mode {
            self.destination.load_mode = mode;
        }
        if let Some(delimiter) = &overrides.delimiter {
            self.format.delimiter = Some(delimiter.clone());
        }
        if let Some(concurrency) = overrides.concurrency {
            self.execution.concurrency = concurrency;
        }
        if let Some(file) = &overrides.audit_file {
            self.audit.file = Some(file.clone());
        }
        validate_config(self)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load a configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<LoaderConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_config_from_str(&content)
}

/// Load a configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<LoaderConfig> {
    // An empty document means "all defaults"
    if yaml.trim().is_empty() {
        return Ok(LoaderConfig::default());
    }

    let config: LoaderConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate a configuration
pub fn validate_config(config: &LoaderConfig) -> Result<()> {
    if config.warehouse.path.trim().is_empty() {
        return Err(Error::invalid_value("warehouse.path", "cannot be empty"));
    }

    validate_template(
        &config.destination.table_template,
        &config.destination.vars,
    )
    .map_err(|e| Error::invalid_value("destination.table_template", e.to_string()))?;

    config
        .format
        .declared_delimiter()
        .map_err(|e| Error::invalid_value("format.delimiter", e.to_string()))?;
    config
        .format
        .quote_byte()
        .map_err(|e| Error::invalid_value("format.quote", e.to_string()))?;

    if config.execution.statement_timeout_secs == 0 {
        return Err(Error::invalid_value(
            "execution.statement_timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.execution.concurrency == 0 {
        return Err(Error::invalid_value(
            "execution.concurrency",
            "must be at least 1",
        ));
    }

    if !TABLE_NAME_REGEX.is_match(&config.audit.table) {
        return Err(Error::invalid_value(
            "audit.table",
            format!("'{}' is not a valid table name", config.audit.table),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Encoding;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = load_config_from_str("").unwrap();

        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.destination.table_template, "{{ file.stem }}");
        assert_eq!(config.profiling.sample_rows, 100_000);
        assert_eq!(config.execution.statement_timeout(), Duration::from_secs(300));
        assert_eq!(config.audit.table, "load_audit_log");
        assert!(config.destination.comment_source_file);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
warehouse:
  path: /tmp/dw.duckdb
  init_statements:
    - "SET threads = 2"
destination:
  table_template: "{{ vars.prefix }}_{{ file.stem }}"
  vars:
    prefix: raw
  load_mode: replace
  drop_empty_columns: true
format:
  delimiter: tsv
  encoding: latin1
  null_markers: ["NA"]
profiling:
  sample_rows: 0
execution:
  statement_timeout_secs: 30
  concurrency: 4
audit:
  table: audit.file_loads
  file: logs/audit.jsonl
"#;
        let config = load_config_from_str(yaml).unwrap();

        assert_eq!(config.warehouse.init_statements.len(), 1);
        assert_eq!(config.destination.load_mode, LoadMode::Replace);
        assert!(config.destination.drop_empty_columns);
        assert_eq!(config.format.declared_delimiter().unwrap(), Some(b'\t'));
        assert_eq!(config.format.encoding, Encoding::Latin1);
        assert_eq!(config.format.quote, '"');
        assert_eq!(config.profiling.sample_rows, 0);
        assert_eq!(config.execution.concurrency, 4);
        assert_eq!(config.audit.file, Some(PathBuf::from("logs/audit.jsonl")));
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("execution:\n  statement_timeout_secs: 0\n", "statement_timeout_secs"),
            ("execution:\n  concurrency: 0\n", "concurrency"),
            ("format:\n  delimiter: '::'\n", "format.delimiter"),
            ("audit:\n  table: 'drop table;'\n", "audit.table"),
            ("destination:\n  table_template: '{{ vars.x }}'\n", "table_template"),
            ("warehouse:\n  path: ''\n", "warehouse.path"),
        ];
        for (yaml, field) in cases {
            let err = load_config_from_str(yaml).unwrap_err();
            assert!(err.to_string().contains(field), "{yaml}: {err}");
        }
    }

    #[test]
    fn test_unknown_load_mode() {
        let err = load_config_from_str("destination:\n  load_mode: upsert\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config YAML"));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = LoaderConfig::default();
        let overrides = ConfigOverrides {
            warehouse: Some(":memory:".to_string()),
            sample_rows: Some(10),
            load_mode: Some(LoadMode::Replace),
            delimiter: Some(";".to_string()),
            ..ConfigOverrides::default()
        };

        config.apply_overrides(&overrides).unwrap();

        assert_eq!(config.warehouse.path, ":memory:");
        assert_eq!(config.profiling.sample_rows, 10);
        assert_eq!(config.destination.load_mode, LoadMode::Replace);
        assert_eq!(config.format.delimiter.as_deref(), Some(";"));

        let bad = ConfigOverrides {
            timeout_secs: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(config.apply_overrides(&bad).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/flatload.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
