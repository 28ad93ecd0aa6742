//! Load executor tests

use super::*;
use crate::audit::{AuditLogger, MemoryLogSink};
use crate::schema::{reconcile, ColumnDef, ColumnType, TableSchema};
use crate::source::{FormatOptions, SourceFile};
use crate::testing::ScriptedWarehouse;
use crate::types::{LoadMode, RunStatus, Severity};
use crate::warehouse::{sql, ColumnMapping, DuckDbWarehouse, LoadRequest, Warehouse};
use crate::ErrorKind;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    request: LoadRequest,
    inferred: TableSchema,
    sink: MemoryLogSink,
    audit: Arc<AuditLogger>,
}

fn fixture(contents: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("orders.csv");
    std::fs::write(&path, contents).unwrap();
    let source = SourceFile::open(&path, &FormatOptions::default()).unwrap();

    let inferred = TableSchema::from_columns([
        ColumnDef::new("id", ColumnType::Integer, false),
        ColumnDef::new("qty", ColumnType::Integer, true),
    ])
    .unwrap();
    let request = LoadRequest {
        table: "orders".to_string(),
        source,
        columns: inferred
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| ColumnMapping {
                field_index: i,
                column: ColumnDef::new(c.name.clone(), c.column_type, true),
            })
            .collect(),
        mode: LoadMode::Append,
    };
    let sink = MemoryLogSink::new();
    let audit = Arc::new(AuditLogger::new(Arc::new(sink.clone())));

    Fixture {
        _dir: dir,
        request,
        inferred,
        sink,
        audit,
    }
}

fn messages(run: &LoadRun) -> Vec<(Severity, String)> {
    run.entries
        .iter()
        .map(|e| (e.severity, e.message.clone()))
        .collect()
}

#[test]
fn test_load_run_lifecycle() {
    let mut run = LoadRun::new("a.csv");
    assert_eq!(run.status, RunStatus::Pending);
    assert!(run.elapsed().is_none());

    run.start();
    assert_eq!(run.status, RunStatus::Running);
    assert!(!run.is_terminal());

    run.fail(&crate::Error::ddl("t", "boom"));
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error_kind(), Some(ErrorKind::Ddl));
    assert!(run.is_terminal());
    assert!(run.elapsed().is_some());
}

#[tokio::test]
async fn test_create_logs_every_statement() {
    let fx = fixture("id,qty\n1,2\n2,\n");
    let warehouse = Arc::new(ScriptedWarehouse::new().with_cleanup("CHECKPOINT"));
    let executor = LoadExecutor::new(warehouse.clone(), fx.audit.clone());
    let plan = reconcile("orders", &fx.inferred, None);
    let mut run = LoadRun::new("orders.csv");

    let outcome = executor.execute(&mut run, &plan, &fx.request).await.unwrap();

    assert_eq!(outcome.rows_loaded, 2);
    assert_eq!(run.rows_loaded, 2);

    let executed = warehouse.executed();
    assert_eq!(executed.len(), 3);
    assert!(executed[0].starts_with("CREATE TABLE \"orders\""));
    assert!(executed[1].starts_with("COMMENT ON TABLE \"orders\""));
    assert_eq!(executed[2], "CHECKPOINT");

    // Each statement is logged before and after; the load likewise
    let logged = messages(&run);
    assert_eq!(logged.len(), 8);
    assert_eq!(logged[0], (Severity::Info, executed[0].clone()));
    assert!(logged[1].1.starts_with("Statement succeeded"));
    assert!(logged[4].1.starts_with("COPY \"orders\""));
    assert!(logged[5].1.starts_with("Loaded 2 rows into orders"));
    assert!(logged.iter().all(|(s, _)| *s == Severity::Info));
    assert_eq!(fx.sink.entries(), run.entries);
}

#[tokio::test]
async fn test_source_comment_can_be_disabled() {
    let fx = fixture("id,qty\n1,2\n");
    let warehouse = Arc::new(ScriptedWarehouse::new());
    let executor = LoadExecutor::new(warehouse.clone(), fx.audit.clone()).with_source_comment(false);
    let plan = reconcile("orders", &fx.inferred, None);

    executor
        .execute(&mut LoadRun::new("orders.csv"), &plan, &fx.request)
        .await
        .unwrap();

    assert_eq!(warehouse.executed().len(), 1);
}

#[tokio::test]
async fn test_compatible_plan_issues_no_ddl() {
    let fx = fixture("id,qty\n1,2\n");
    let existing = fx.inferred.clone();
    let warehouse = Arc::new(ScriptedWarehouse::new());
    let executor = LoadExecutor::new(warehouse.clone(), fx.audit.clone());
    let plan = reconcile("orders", &fx.inferred, Some(&existing));

    executor
        .execute(&mut LoadRun::new("orders.csv"), &plan, &fx.request)
        .await
        .unwrap();

    assert!(warehouse.executed().is_empty());
    assert_eq!(warehouse.loads().len(), 1);
}

#[tokio::test]
async fn test_ddl_failure_aborts_before_load() {
    let fx = fixture("id,qty\n1,2\n");
    let warehouse = Arc::new(ScriptedWarehouse::new().failing_on("CREATE TABLE"));
    let executor = LoadExecutor::new(warehouse.clone(), fx.audit.clone());
    let plan = reconcile("orders", &fx.inferred, None);
    let mut run = LoadRun::new("orders.csv");

    let err = executor.execute(&mut run, &plan, &fx.request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Ddl);
    assert!(err.to_string().contains("Parser Error"));
    assert!(warehouse.loads().is_empty());
    assert_eq!(warehouse.executed().len(), 1);

    let last = run.entries.last().unwrap();
    assert_eq!(last.severity, Severity::Error);
    assert!(last.message.contains("DDL failed on table 'orders'"));
}

#[tokio::test]
async fn test_load_failure_keeps_ddl() {
    let fx = fixture("id,qty\n1,2\n");
    let warehouse = Arc::new(
        ScriptedWarehouse::new()
            .failing_load("Conversion Error")
            .with_cleanup("CHECKPOINT"),
    );
    let executor = LoadExecutor::new(warehouse.clone(), fx.audit.clone());
    let plan = reconcile("orders", &fx.inferred, None);
    let mut run = LoadRun::new("orders.csv");

    let err = executor.execute(&mut run, &plan, &fx.request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Load);
    // CREATE and COMMENT ran, nothing tried to undo them, no cleanup
    let executed = warehouse.executed();
    assert_eq!(executed.len(), 2);
    assert!(executed.iter().all(|s| !s.starts_with("DROP")));
}

#[tokio::test]
async fn test_rejected_rows_fail_run_after_loading_rest() {
    let fx = fixture("id,qty\n1,2\n2,lots\n3\n4,5\n");
    let warehouse = Arc::new(ScriptedWarehouse::new());
    let executor = LoadExecutor::new(warehouse.clone(), fx.audit.clone());
    let plan = reconcile("orders", &fx.inferred, None);
    let mut run = LoadRun::new("orders.csv");

    let err = executor.execute(&mut run, &plan, &fx.request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Load);
    assert!(err.to_string().contains("2 rows rejected"));
    assert_eq!(run.rows_loaded, 2);
    assert_eq!(run.rows_rejected, 2);

    let errors: Vec<String> = run
        .entries
        .iter()
        .filter(|e| e.is_error())
        .map(|e| e.message.clone())
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("line 3"));
    assert!(errors[0].contains("'lots'"));
    assert!(errors[1].contains("line 4"));
}

#[tokio::test]
async fn test_timeout_is_reported_as_timeout() {
    let fx = fixture("id,qty\n1,2\n");
    let warehouse = Arc::new(ScriptedWarehouse::new().with_delay(Duration::from_secs(5)));
    let executor = LoadExecutor::new(warehouse, fx.audit.clone())
        .with_timeout(Duration::from_millis(20));
    let plan = reconcile("orders", &fx.inferred, None);
    let mut run = LoadRun::new("orders.csv");

    let err = executor.execute(&mut run, &plan, &fx.request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(run.entries.last().unwrap().is_error());
}

#[tokio::test]
async fn test_timeout_against_duckdb_commits_nothing() {
    let mut contents = String::from("id,qty\n");
    for i in 0..50_000 {
        contents.push_str(&format!("{i},{}\n", i % 7));
    }
    let fx = fixture(&contents);
    let duckdb = Arc::new(
        DuckDbWarehouse::open_in_memory()
            .unwrap()
            .with_audit_table("load_audit_log")
            .await
            .unwrap(),
    );
    let created = reconcile("orders", &fx.inferred, None);
    duckdb
        .execute(&sql::create_table_sql("orders", &created.target))
        .await
        .unwrap();
    let plan = reconcile("orders", &fx.inferred, Some(&created.target));

    // The warehouse doubles as the audit sink, like the CLI wires it
    let audit = Arc::new(AuditLogger::new(duckdb.clone()));
    let executor =
        LoadExecutor::new(duckdb.clone(), audit).with_timeout(Duration::from_millis(50));
    let mut run = LoadRun::new("orders.csv");

    let started = std::time::Instant::now();
    let err = executor.execute(&mut run, &plan, &fx.request).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(
        duckdb
            .query_strings("SELECT CAST(count(*) AS VARCHAR) FROM orders")
            .await
            .unwrap(),
        vec!["0"]
    );
    let logged = duckdb
        .query_strings("SELECT message FROM load_audit_log WHERE severity = 'ERROR'")
        .await
        .unwrap();
    assert_eq!(logged, vec![err.to_string()]);
}

#[tokio::test]
async fn test_rejected_plan_never_touches_warehouse() {
    let fx = fixture("id,qty\n1,2\n");
    let existing = TableSchema::from_columns([ColumnDef::new("id", ColumnType::Boolean, true)])
        .unwrap();
    let warehouse = Arc::new(ScriptedWarehouse::new());
    let executor = LoadExecutor::new(warehouse.clone(), fx.audit.clone());
    let plan = reconcile("orders", &fx.inferred, Some(&existing));

    let err = executor
        .execute(&mut LoadRun::new("orders.csv"), &plan, &fx.request)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaConflict);
    assert!(warehouse.executed().is_empty());
    assert!(warehouse.loads().is_empty());
}
