//! Common types used throughout flatload
//!
//! Shared enums that more than one component reads or writes.

use serde::{Deserialize, Serialize};

// ============================================================================
// Load Mode
// ============================================================================

/// How loaded rows relate to rows already in the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Append new rows
    #[default]
    Append,
    /// Delete existing rows, then insert, in the same transaction
    Replace,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Append => write!(f, "append"),
            LoadMode::Replace => write!(f, "replace"),
        }
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Severity of an audit log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Error,
}

impl Severity {
    /// Upper-case label stored in the log sink
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => tracing::Level::INFO,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}

// ============================================================================
// Run Status
// ============================================================================

/// Lifecycle of a single load run
///
/// `Pending -> Running -> Succeeded | Failed`. A run that was never
/// dispatched (batch cancelled) stays `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    /// Whether the run has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}
