//! CLI runner - executes commands

use crate::audit::{AuditLogger, FanoutSink, JsonlLogSink, LogSink};
use crate::batch::{BatchCoordinator, BatchResult, ExitStatus};
use crate::cli::commands::{Cli, Commands, LoadArgs, OutputFormat};
use crate::config::{load_config, ConfigOverrides, LoaderConfig};
use crate::error::{Error, Result, ResultExt};
use crate::schema::{ProfileReport, TypeProfiler};
use crate::source::{expand_inputs, SourceFile};
use crate::types::RunStatus;
use crate::warehouse::{DuckDbWarehouse, Warehouse};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// CLI runner
pub struct Runner {
    cli: Cli,
    shutdown: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel the batch when `token` fires
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Run the CLI command
    ///
    /// Setup errors are printed and reported as [`ExitStatus::SetupError`].
    pub async fn run(&self) -> ExitStatus {
        let result = match &self.cli.command {
            Commands::Load { inputs, options } => self.load(inputs, options).await,
            Commands::Profile {
                inputs,
                sample_rows,
                delimiter,
                format,
            } => {
                let overrides = ConfigOverrides {
                    sample_rows: *sample_rows,
                    delimiter: delimiter.clone(),
                    ..ConfigOverrides::default()
                };
                self.profile(inputs, &overrides, *format).await
            }
            Commands::Validate => self.validate(),
        };

        result.unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            ExitStatus::SetupError
        })
    }

    /// Load the configuration file, if any, and apply overrides
    fn load_config(&self, overrides: &ConfigOverrides) -> Result<LoaderConfig> {
        let mut config = match &self.cli.config {
            Some(path) => load_config(path)?,
            None => LoaderConfig::default(),
        };
        config.apply_overrides(overrides)?;
        Ok(config)
    }

    fn resolve_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
        let files = expand_inputs(inputs)?;
        if files.is_empty() {
            return Err(Error::config(format!(
                "No input files matched: {}",
                inputs.join(", ")
            )));
        }
        Ok(files)
    }

    async fn load(&self, inputs: &[String], options: &LoadArgs) -> Result<ExitStatus> {
        let config = self.load_config(&ConfigOverrides::from(options))?;
        let files = Self::resolve_inputs(inputs)?;

        let warehouse = DuckDbWarehouse::open(&config.warehouse.path, &config.warehouse.init_statements)
            .with_context(|| format!("Warehouse '{}' unavailable", config.warehouse.path))?
            .with_audit_table(&config.audit.table)
            .await?;
        let warehouse = Arc::new(warehouse);

        let mut sink: Arc<dyn LogSink> = warehouse.clone();
        if let Some(path) = &config.audit.file {
            let file_sink: Arc<dyn LogSink> = Arc::new(JsonlLogSink::open(path).await?);
            sink = Arc::new(FanoutSink::new(vec![sink, file_sink]));
        }
        let audit = Arc::new(AuditLogger::new(sink));

        let target: Arc<dyn Warehouse> = warehouse;
        let coordinator = BatchCoordinator::new(config, target, Arc::clone(&audit))
            .with_shutdown(self.shutdown.clone());
        let result = coordinator.run(&files).await;

        print_batch(&result);
        if audit.failures() > 0 {
            eprintln!(
                "Warning: {} audit log writes failed (see diagnostics)",
                audit.failures()
            );
        }
        Ok(result.exit_status())
    }

    async fn profile(
        &self,
        inputs: &[String],
        overrides: &ConfigOverrides,
        format: OutputFormat,
    ) -> Result<ExitStatus> {
        let config = self.load_config(overrides)?;
        let files = Self::resolve_inputs(inputs)?;

        let mut failed = 0;
        for path in &files {
            match profile_file(path, &config).await {
                Ok((source, report)) => match format {
                    OutputFormat::Json => {
                        let value = json!({
                            "file": source.display(),
                            "delimiter": char::from(source.format.delimiter).to_string(),
                            "estimated_rows": source.estimated_rows,
                            "report": report,
                        });
                        let line = serde_json::to_string(&value)
                            .context("Failed to serialize profile")?;
                        println!("{line}");
                    }
                    OutputFormat::Pretty => print_profile(&source, &report),
                },
                Err(e) => {
                    failed += 1;
                    println!("FAILED    {} ({}): {e}", path.display(), e.kind());
                }
            }
        }

        Ok(if failed == 0 {
            ExitStatus::Success
        } else if failed == files.len() {
            ExitStatus::AllFailed
        } else {
            ExitStatus::PartialFailure
        })
    }

    fn validate(&self) -> Result<ExitStatus> {
        let config = self.load_config(&ConfigOverrides::default())?;
        let yaml = serde_yaml::to_string(&config).context("Failed to render configuration")?;
        println!("Configuration is valid");
        println!("{yaml}");
        Ok(ExitStatus::Success)
    }
}

async fn profile_file(path: &Path, config: &LoaderConfig) -> Result<(SourceFile, ProfileReport)> {
    let path = path.to_path_buf();
    let format = config.format.clone();
    let profiler = TypeProfiler::new().with_sample_rows(config.profiling.sample_rows);

    tokio::task::spawn_blocking(move || {
        let source = SourceFile::open(&path, &format)?;
        let report = profiler.profile(&source)?;
        Ok::<_, Error>((source, report))
    })
    .await?
}

/// Per-file status lines and the batch summary
fn print_batch(result: &BatchResult) {
    for run in &result.runs {
        let table = run.table.as_deref().unwrap_or("-");
        let status = run.status.to_string();
        match run.status {
            RunStatus::Succeeded => println!(
                "{:<9} {} -> {table} ({} rows)",
                status,
                run.source_display(),
                run.rows_loaded
            ),
            RunStatus::Failed => println!(
                "{:<9} {} -> {table}: {}",
                status,
                run.source_display(),
                run.error
                    .as_ref()
                    .map_or_else(String::new, ToString::to_string)
            ),
            _ => println!("{status:<9} {} (not dispatched)", run.source_display()),
        }
    }
    println!();
    println!("{}", result.summary());
}

fn print_profile(source: &SourceFile, report: &ProfileReport) {
    println!(
        "{} ({} rows sampled, ~{} estimated{})",
        source.display(),
        report.rows_sampled,
        source.estimated_rows,
        if report.truncated { ", sample cap reached" } else { "" }
    );
    let width = report
        .fields
        .iter()
        .map(|f| f.name.len())
        .max()
        .unwrap_or(0)
        .max(6);
    println!("  {:<width$}  {:<14}  {:<8}  NULLS", "COLUMN", "TYPE", "NULLABLE");
    for field in &report.fields {
        println!(
            "  {:<width$}  {:<14}  {:<8}  {}",
            field.name,
            field.column_type.to_string(),
            field.nullable,
            field.nulls
        );
    }
    if report.malformed_rows > 0 {
        println!("  {} malformed rows skipped", report.malformed_rows);
    }
    for widening in &report.widenings {
        println!("  {widening}");
    }
    println!();
}
