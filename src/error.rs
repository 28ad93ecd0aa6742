//! Error types for flatload
//!
//! This module defines the error hierarchy for the whole pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! File-level failures (`FileRead`, `SchemaConflict`, `Ddl`, `Load`,
//! `Timeout`) are caught at the batch boundary and recorded on the failed
//! [`LoadRun`](crate::load::LoadRun) through [`Error::kind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for flatload
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // Source File Errors
    // ============================================================================
    #[error("Failed to read '{path}': {message}")]
    FileRead { path: String, message: String },

    // ============================================================================
    // Schema Errors
    // ============================================================================
    #[error("Schema conflict on table '{table}': {message}")]
    SchemaConflict { table: String, message: String },

    #[error("Unsupported column type '{data_type}' for '{table}.{column}'")]
    UnsupportedType {
        table: String,
        column: String,
        data_type: String,
    },

    // ============================================================================
    // Warehouse Errors
    // ============================================================================
    #[error("DDL failed on table '{table}': {message}")]
    Ddl { table: String, message: String },

    #[error("Load into '{table}' failed: {message}")]
    Load { table: String, message: String },

    #[error("Warehouse error: {message}")]
    Warehouse { message: String },

    #[error("Statement timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Audit Errors
    // ============================================================================
    #[error("Audit log write failed: {message}")]
    LogWrite { message: String },

    // ============================================================================
    // Cancellation
    // ============================================================================
    #[error("Abandoned before completion")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

/// Closed error taxonomy recorded on a failed load run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unreadable or malformed input file
    FileRead,
    /// Destination schema cannot accept the inferred schema
    SchemaConflict,
    /// CREATE / ALTER / COMMENT failed
    Ddl,
    /// Bulk load failed, totally or for some rows
    Load,
    /// A warehouse statement exceeded its timeout
    Timeout,
    /// Anything outside the taxonomy
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::FileRead => "FileReadError",
            ErrorKind::SchemaConflict => "SchemaConflictError",
            ErrorKind::Ddl => "DDLError",
            ErrorKind::Load => "LoadError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::Other => "Error",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a schema conflict error
    pub fn schema_conflict(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaConflict {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a DDL error
    pub fn ddl(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ddl {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a load error
    pub fn load(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a generic warehouse error
    pub fn warehouse(message: impl Into<String>) -> Self {
        Self::Warehouse {
            message: message.into(),
        }
    }

    /// Create a log write error
    pub fn log_write(message: impl Into<String>) -> Self {
        Self::LogWrite {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Classify this error into the load-run taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileRead { .. } => ErrorKind::FileRead,
            Error::SchemaConflict { .. } | Error::UnsupportedType { .. } => {
                ErrorKind::SchemaConflict
            }
            Error::Ddl { .. } => ErrorKind::Ddl,
            Error::Load { .. } => ErrorKind::Load,
            Error::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Other,
        }
    }
}

/// Result type alias for flatload
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
