//! Batch result types

use crate::load::LoadRun;
use crate::types::RunStatus;
use serde::Serialize;
use std::path::PathBuf;

/// Process exit status of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// Every file succeeded
    Success,
    /// The batch could not start (config, inputs, warehouse)
    SetupError,
    /// Every dispatched file failed
    AllFailed,
    /// Some files failed
    PartialFailure,
    /// Cancelled before every file was dispatched
    Cancelled,
}

impl ExitStatus {
    /// Process exit code
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::SetupError => 1,
            ExitStatus::AllFailed => 2,
            ExitStatus::PartialFailure => 3,
            ExitStatus::Cancelled => 130,
        }
    }
}

/// Outcome of one batch: one run per input file, in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    /// Identifier the batch summary is logged under
    pub batch_id: String,
    /// Runs in input order
    pub runs: Vec<LoadRun>,
    /// Whether dispatch was stopped by cancellation
    pub cancelled: bool,
}

impl BatchResult {
    /// Files that succeeded
    pub fn succeeded(&self) -> usize {
        self.count(RunStatus::Succeeded)
    }

    /// Files that failed
    pub fn failed(&self) -> usize {
        self.count(RunStatus::Failed)
    }

    /// Files never dispatched
    pub fn skipped(&self) -> usize {
        self.count(RunStatus::Pending)
    }

    fn count(&self, status: RunStatus) -> usize {
        self.runs.iter().filter(|r| r.status == status).count()
    }

    /// Sources of failed runs, in input order
    pub fn failed_sources(&self) -> Vec<PathBuf> {
        self.runs
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .map(|r| r.source.clone())
            .collect()
    }

    /// Total rows loaded across all runs
    pub fn rows_loaded(&self) -> u64 {
        self.runs.iter().map(|r| r.rows_loaded).sum()
    }

    /// Exit status for the process
    pub fn exit_status(&self) -> ExitStatus {
        if self.cancelled && self.skipped() > 0 {
            ExitStatus::Cancelled
        } else if self.failed() == 0 {
            ExitStatus::Success
        } else if self.succeeded() == 0 {
            ExitStatus::AllFailed
        } else {
            ExitStatus::PartialFailure
        }
    }

    /// One-line summary, as written to the audit log
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Batch finished: {} files, {} succeeded, {} failed, {} skipped, {} rows loaded",
            self.runs.len(),
            self.succeeded(),
            self.failed(),
            self.skipped(),
            self.rows_loaded()
        );
        let failed = self.failed_sources();
        if !failed.is_empty() {
            let names: Vec<String> = failed.iter().map(|p| p.display().to_string()).collect();
            summary.push_str(&format!("; failed: {}", names.join(", ")));
        }
        if self.cancelled {
            summary.push_str("; cancelled");
        }
        summary
    }
}
