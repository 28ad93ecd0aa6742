//! Audit log types

use crate::types::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One append-only audit record
///
/// Field order matches the log table: `(timestamp, load_run_id, severity,
/// message)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was produced
    pub timestamp: DateTime<Utc>,
    /// Owning load run (or batch, for batch-level entries)
    pub load_run_id: String,
    /// INFO or ERROR
    pub severity: Severity,
    /// Statement text or error message
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(load_run_id: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            load_run_id: load_run_id.into(),
            severity,
            message: message.into(),
        }
    }

    /// Create an INFO entry
    pub fn info(load_run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(load_run_id, Severity::Info, message)
    }

    /// Create an ERROR entry
    pub fn error(load_run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(load_run_id, Severity::Error, message)
    }

    /// Whether this is an ERROR entry
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
