//! Load run types

use crate::audit::LogEntry;
use crate::error::{Error, ErrorKind};
use crate::schema::ReconcileAction;
use crate::types::RunStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Error recorded on a failed load run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&Error> for RunError {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// One attempt to load one source file into one destination table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRun {
    /// Unique run identifier
    pub id: String,
    /// Source file path
    pub source: PathBuf,
    /// Destination table, once resolved
    pub table: Option<String>,
    /// Lifecycle state
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Reconciler decision, once made
    pub action: Option<ReconcileAction>,
    /// Rows inserted into the destination
    pub rows_loaded: u64,
    /// Rows rejected during the load
    pub rows_rejected: u64,
    /// Why the run failed
    pub error: Option<RunError>,
    /// Audit entries in the order they were produced
    pub entries: Vec<LogEntry>,
}

impl LoadRun {
    /// Create a pending run for a source file
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: source.into(),
            table: None,
            status: RunStatus::Pending,
            started_at: None,
            finished_at: None,
            action: None,
            rows_loaded: 0,
            rows_rejected: 0,
            error: None,
            entries: Vec::new(),
        }
    }

    /// Mark the run as dispatched
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the run as succeeded
    pub fn succeed(&mut self) {
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(Utc::now());
    }

    /// Mark the run as failed with `error`
    pub fn fail(&mut self, error: &Error) {
        self.status = RunStatus::Failed;
        self.error = Some(RunError::from(error));
        self.finished_at = Some(Utc::now());
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Error kind of a failed run
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Wall-clock time between start and finish
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    /// Source path for display
    pub fn source_display(&self) -> String {
        self.source.display().to_string()
    }
}
