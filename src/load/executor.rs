//! Load executor

use super::types::LoadRun;
use crate::audit::AuditLogger;
use crate::error::{Error, Result};
use crate::schema::ReconcilePlan;
use crate::warehouse::{bounded, sql, LoadOutcome, LoadRequest, Warehouse};
use std::sync::Arc;
use std::time::Duration;

/// Default per-statement timeout
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Applies a reconcile plan and bulk-loads one file
///
/// Order is fixed: DDL, then the load, then cleanup. Each statement is
/// logged before it runs and its outcome after.
pub struct LoadExecutor {
    warehouse: Arc<dyn Warehouse>,
    audit: Arc<AuditLogger>,
    timeout: Duration,
    comment_source_file: bool,
}

/// Which step of the load a statement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Ddl,
    Cleanup,
}

impl LoadExecutor {
    pub fn new(warehouse: Arc<dyn Warehouse>, audit: Arc<AuditLogger>) -> Self {
        Self {
            warehouse,
            audit,
            timeout: DEFAULT_STATEMENT_TIMEOUT,
            comment_source_file: true,
        }
    }

    /// Set the per-statement timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable/disable the source file comment on created tables
    #[must_use]
    pub fn with_source_comment(mut self, enabled: bool) -> Self {
        self.comment_source_file = enabled;
        self
    }

    /// DDL statements the plan needs, in execution order
    pub fn ddl_statements(&self, plan: &ReconcilePlan, request: &LoadRequest) -> Vec<String> {
        let file_name = request.source.file_name();
        let comment = self.comment_source_file.then_some(file_name.as_str());
        sql::plan_statements(plan, comment)
    }

    /// Run the plan for one file
    ///
    /// A DDL failure aborts before any data is touched. A load failure
    /// leaves applied DDL in place. Rejected rows make the run fail after
    /// the remaining rows are loaded.
    pub async fn execute(
        &self,
        run: &mut LoadRun,
        plan: &ReconcilePlan,
        request: &LoadRequest,
    ) -> Result<LoadOutcome> {
        if plan.is_rejected() {
            return Err(plan.conflict_error());
        }
        let table = request.table.as_str();

        for statement in self.ddl_statements(plan, request) {
            self.run_statement(run, table, &statement, Step::Ddl).await?;
        }

        let statement = request.to_string();
        self.audit.info(run, statement.clone()).await;
        let outcome = match bounded(self.timeout, self.warehouse.load(request)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = classify(e, |message| Error::load(table, message));
                self.audit.error(run, error.to_string()).await;
                return Err(error);
            }
        };

        run.rows_loaded = outcome.rows_loaded;
        run.rows_rejected = outcome.rows_rejected();
        for rejection in &outcome.rejected {
            self.audit.error(run, rejection.to_string()).await;
        }
        self.audit
            .info(
                run,
                format!(
                    "Loaded {} rows into {table} ({} rejected)",
                    outcome.rows_loaded,
                    outcome.rows_rejected()
                ),
            )
            .await;

        for statement in self.warehouse.cleanup_statements(request) {
            self.run_statement(run, table, &statement, Step::Cleanup)
                .await?;
        }

        if !outcome.is_clean() {
            return Err(Error::load(
                table,
                format!("{} rows rejected", outcome.rows_rejected()),
            ));
        }

        tracing::debug!(
            table,
            rows = outcome.rows_loaded,
            "Load finished"
        );
        Ok(outcome)
    }

    async fn run_statement(
        &self,
        run: &mut LoadRun,
        table: &str,
        statement: &str,
        step: Step,
    ) -> Result<()> {
        self.audit.info(run, statement).await;

        match bounded(self.timeout, self.warehouse.execute(statement)).await {
            Ok(affected) => {
                self.audit
                    .info(run, format!("Statement succeeded ({affected} rows affected)"))
                    .await;
                Ok(())
            }
            Err(e) => {
                let error = classify(e, |message| match step {
                    Step::Ddl => Error::ddl(table, message),
                    Step::Cleanup => Error::load(table, message),
                });
                self.audit.error(run, error.to_string()).await;
                Err(error)
            }
        }
    }
}

/// Attribute a warehouse error to the step that raised it
///
/// Timeouts keep their own kind; everything else becomes `wrap(message)`
/// with the driver-reported message.
fn classify(error: Error, wrap: impl FnOnce(String) -> Error) -> Error {
    match error {
        Error::Timeout { .. } => error,
        Error::Warehouse { message } => wrap(message),
        Error::Ddl { message, .. } | Error::Load { message, .. } => wrap(message),
        other => wrap(other.to_string()),
    }
}
