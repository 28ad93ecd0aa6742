//! Batch coordinator

use super::types::BatchResult;
use crate::audit::{AuditLogger, LogEntry};
use crate::config::LoaderConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::load::{LoadExecutor, LoadRun};
use crate::schema::{reconcile, ProfileReport, TableSchema, TypeProfiler};
use crate::source::SourceFile;
use crate::template::render_table_name;
use crate::warehouse::{bounded, ColumnMapping, LoadRequest, Warehouse};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Files that must run one after another, with their input positions
type Group = Vec<(usize, LoadRun, Result<String>)>;

/// Runs every file of a batch end to end
///
/// Failures are caught per file; the batch itself never aborts. Files that
/// share a destination table never run at the same time.
pub struct BatchCoordinator {
    config: LoaderConfig,
    warehouse: Arc<dyn Warehouse>,
    audit: Arc<AuditLogger>,
    executor: LoadExecutor,
    shutdown: CancellationToken,
}

impl BatchCoordinator {
    /// Create a coordinator for one batch
    pub fn new(config: LoaderConfig, warehouse: Arc<dyn Warehouse>, audit: Arc<AuditLogger>) -> Self {
        let executor = LoadExecutor::new(Arc::clone(&warehouse), Arc::clone(&audit))
            .with_timeout(config.execution.statement_timeout())
            .with_source_comment(config.destination.comment_source_file);
        Self {
            config,
            warehouse,
            audit,
            executor,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop dispatching files once `token` is cancelled
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Token that cancels this batch
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Process every file and collect the results in input order
    pub async fn run(&self, files: &[PathBuf]) -> BatchResult {
        let batch_id = Uuid::new_v4().to_string();
        tracing::info!(
            batch_id = %batch_id,
            files = files.len(),
            warehouse = %self.warehouse.describe(),
            "Starting batch"
        );
        self.audit
            .write(&LogEntry::info(
                &batch_id,
                format!("Batch started: {} files", files.len()),
            ))
            .await;

        let concurrency = self.config.execution.concurrency.max(1);
        let groups = self.group_files(files);

        let mut finished: Vec<(usize, LoadRun)> = stream::iter(groups)
            .map(|group| self.run_group(group))
            .buffer_unordered(concurrency)
            .flat_map(stream::iter)
            .collect()
            .await;

        // Groups complete out of order
        finished.sort_by_key(|(idx, _)| *idx);

        let result = BatchResult {
            batch_id,
            runs: finished.into_iter().map(|(_, run)| run).collect(),
            cancelled: self.shutdown.is_cancelled(),
        };

        let summary = result.summary();
        let entry = if result.failed() > 0 {
            LogEntry::error(&result.batch_id, summary)
        } else {
            LogEntry::info(&result.batch_id, summary)
        };
        self.audit.write(&entry).await;
        self.audit.flush().await;

        tracing::info!(
            batch_id = %result.batch_id,
            succeeded = result.succeeded(),
            failed = result.failed(),
            skipped = result.skipped(),
            "Batch finished"
        );
        result
    }

    /// Split files into groups that may run concurrently
    ///
    /// With a concurrency of 1 every file is its own group, in input order.
    /// Otherwise files are grouped by destination table.
    fn group_files(&self, files: &[PathBuf]) -> Vec<Group> {
        let destination = &self.config.destination;
        let mut groups: Vec<(Option<String>, Group)> = Vec::new();

        for (idx, path) in files.iter().enumerate() {
            let table = render_table_name(&destination.table_template, path, &destination.vars);
            let key = match &table {
                Ok(name) if self.config.execution.concurrency > 1 => Some(name.to_lowercase()),
                _ => None,
            };
            let item = (idx, LoadRun::new(path.clone()), table);

            match groups
                .iter_mut()
                .find(|(k, _)| key.is_some() && *k == key)
            {
                Some((_, group)) => group.push(item),
                None => groups.push((key, vec![item])),
            }
        }

        groups.into_iter().map(|(_, group)| group).collect()
    }

    async fn run_group(&self, group: Group) -> Vec<(usize, LoadRun)> {
        let mut done = Vec::with_capacity(group.len());
        for (idx, mut run, table) in group {
            if self.shutdown.is_cancelled() {
                tracing::warn!(source = %run.source_display(), "Batch cancelled, file not dispatched");
            } else {
                self.process_file(&mut run, table).await;
            }
            done.push((idx, run));
        }
        done
    }

    /// Run one file and record its terminal state
    async fn process_file(&self, run: &mut LoadRun, table: Result<String>) {
        run.start();
        let message = format!("Started load of {}", run.source_display());
        self.audit.info(run, message).await;

        let result = self.load_file(run, table).await;

        match result {
            Ok(()) => {
                let message = format!(
                    "SUCCEEDED: {} rows loaded into {}",
                    run.rows_loaded,
                    run.table.as_deref().unwrap_or("<none>")
                );
                self.audit.info(run, message).await;
                self.audit.flush().await;
                run.succeed();
                tracing::info!(source = %run.source_display(), rows = run.rows_loaded, "File loaded");
            }
            Err(error) => {
                self.audit
                    .error(run, format!("FAILED ({}): {error}", error.kind()))
                    .await;
                self.audit.flush().await;
                run.fail(&error);
                tracing::warn!(source = %run.source_display(), kind = %error.kind(), error = %error, "File failed");
            }
        }
    }

    async fn load_file(&self, run: &mut LoadRun, table: Result<String>) -> Result<()> {
        let table = table?;
        run.table = Some(table.clone());

        let (source, report) = self.profile(run.source.clone()).await?;
        self.log_profile(run, &source, &report).await;

        if report.has_no_rows() {
            self.audit
                .info(run, "No data in source file; nothing loaded")
                .await;
            return Ok(());
        }

        let inferred = if self.config.destination.drop_empty_columns {
            let kept = report.schema_without_empty();
            for field in report.fields.iter().filter(|f| f.is_empty()) {
                self.audit
                    .info(run, format!("Dropped empty column {}", field.name))
                    .await;
            }
            kept
        } else {
            report.schema()
        };
        if inferred.is_empty() {
            self.audit
                .info(run, "No non-empty columns in source file; nothing loaded")
                .await;
            return Ok(());
        }

        let existing = self.existing_schema(&table).await?;
        let plan = reconcile(&table, &inferred, existing.as_ref());
        run.action = Some(plan.action);
        self.audit
            .info(run, format!("Schema for {table}: {}", plan.action))
            .await;
        for alteration in &plan.alterations {
            self.audit.info(run, format!("Planned {alteration}")).await;
        }
        if plan.is_rejected() {
            for conflict in &plan.conflicts {
                self.audit.error(run, format!("Conflict: {conflict}")).await;
            }
            return Err(plan.conflict_error());
        }

        let columns = map_columns(&report, &inferred, &plan.target, &table)?;
        let request = LoadRequest {
            table,
            source,
            columns,
            mode: self.config.destination.load_mode,
        };

        self.executor.execute(run, &plan, &request).await?;
        Ok(())
    }

    /// Open and profile a file on the blocking pool
    async fn profile(&self, path: PathBuf) -> Result<(SourceFile, ProfileReport)> {
        let format = self.config.format.clone();
        let profiler = TypeProfiler::new().with_sample_rows(self.config.profiling.sample_rows);

        tokio::task::spawn_blocking(move || {
            let source = SourceFile::open(&path, &format)?;
            let report = profiler.profile(&source)?;
            Ok::<_, Error>((source, report))
        })
        .await?
    }

    async fn log_profile(&self, run: &mut LoadRun, source: &SourceFile, report: &ProfileReport) {
        self.audit
            .info(
                run,
                format!(
                    "Profiled {}: {} rows sampled of ~{} estimated{}",
                    source.file_name(),
                    report.rows_sampled,
                    source.estimated_rows,
                    if report.truncated { " (sample cap reached)" } else { "" }
                ),
            )
            .await;
        if report.malformed_rows > 0 {
            self.audit
                .info(
                    run,
                    format!("Skipped {} malformed rows while profiling", report.malformed_rows),
                )
                .await;
        }
        for widening in &report.widenings {
            self.audit.info(run, format!("Type widened: {widening}")).await;
        }
        for field in &report.fields {
            self.audit
                .info(
                    run,
                    format!(
                        "Column {} profiled: Type={}, Nullable={}",
                        field.name, field.column_type, field.nullable
                    ),
                )
                .await;
        }
    }

    /// Destination schema, with introspection failures attributed to the schema step
    async fn existing_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        bounded(
            self.config.execution.statement_timeout(),
            self.warehouse.get_schema(table),
        )
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::Timeout | ErrorKind::SchemaConflict => e,
            _ => Error::schema_conflict(table, e.to_string()),
        })
    }
}

/// Pair every loaded field with its destination column
fn map_columns(
    report: &ProfileReport,
    inferred: &TableSchema,
    target: &TableSchema,
    table: &str,
) -> Result<Vec<ColumnMapping>> {
    report
        .fields
        .iter()
        .filter(|field| inferred.get(&field.name).is_some())
        .map(|field| {
            let column = target.get(&field.name).ok_or_else(|| {
                Error::schema_conflict(table, format!("no destination column for '{}'", field.name))
            })?;
            Ok(ColumnMapping {
                field_index: field.ordinal,
                column: column.clone(),
            })
        })
        .collect()
}
