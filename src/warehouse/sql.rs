//! SQL text rendering
//!
//! Only standard DDL is produced: CREATE TABLE, ALTER TABLE ADD COLUMN,
//! ALTER COLUMN SET DATA TYPE and COMMENT ON TABLE.

use super::types::ColumnMapping;
use crate::schema::{Alteration, ColumnDef, ColumnType, ReconcileAction, ReconcilePlan, TableSchema};

/// Quote an identifier; dotted names are quoted per part
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn column_sql(column: &ColumnDef) -> String {
    format!("{} {}", quote_ident(&column.name), column.column_type.sql_type())
}

/// `CREATE TABLE` for a schema; columns are always created nullable
pub fn create_table_sql(table: &str, schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("    {}", column_sql(c)))
        .collect();
    format!(
        "CREATE TABLE {} (\n{}\n)",
        quote_ident(table),
        columns.join(",\n")
    )
}

pub fn add_column_sql(table: &str, column: &ColumnDef) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        column_sql(column)
    )
}

pub fn alter_column_type_sql(table: &str, column: &str, to: &ColumnType) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {}",
        quote_ident(table),
        quote_ident(column),
        to.sql_type()
    )
}

/// `COMMENT ON TABLE` recording the source file
pub fn comment_sql(table: &str, source_file: &str) -> String {
    format!(
        "COMMENT ON TABLE {} IS {}",
        quote_ident(table),
        quote_literal(&format!("Source file: {source_file}"))
    )
}

pub fn alteration_sql(table: &str, alteration: &Alteration) -> String {
    match alteration {
        Alteration::AddColumn(column) => add_column_sql(table, column),
        Alteration::WidenColumn { name, to, .. } => alter_column_type_sql(table, name, to),
    }
}

/// DDL statements that apply a plan, in execution order
///
/// `source_comment` adds a COMMENT after a CREATE.
pub fn plan_statements(plan: &ReconcilePlan, source_comment: Option<&str>) -> Vec<String> {
    match plan.action {
        ReconcileAction::Create => {
            let mut statements = vec![create_table_sql(&plan.table, &plan.target)];
            if let Some(file) = source_comment {
                statements.push(comment_sql(&plan.table, file));
            }
            statements
        }
        ReconcileAction::Widen => plan
            .alterations
            .iter()
            .map(|a| alteration_sql(&plan.table, a))
            .collect(),
        ReconcileAction::Compatible | ReconcileAction::Reject => Vec::new(),
    }
}

pub fn delete_all_sql(table: &str) -> String {
    format!("DELETE FROM {}", quote_ident(table))
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

/// All-VARCHAR staging table with one column per mapping
pub fn create_stage_sql(stage: &str, columns: &[ColumnMapping]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} VARCHAR", quote_ident(&c.column.name)))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(stage), defs.join(", "))
}

pub fn insert_stage_row_sql(stage: &str, width: usize) -> String {
    let placeholders = vec!["?"; width].join(", ");
    format!("INSERT INTO {} VALUES ({placeholders})", quote_ident(stage))
}

/// Copy the stage into the target, casting each column to its type
pub fn insert_from_stage_sql(table: &str, stage: &str, columns: &[ColumnMapping]) -> String {
    let names: Vec<String> = columns
        .iter()
        .map(|c| quote_ident(&c.column.name))
        .collect();
    let casts: Vec<String> = columns
        .iter()
        .map(|c| {
            format!(
                "CAST({} AS {})",
                quote_ident(&c.column.name),
                c.column.column_type.sql_type()
            )
        })
        .collect();
    format!(
        "INSERT INTO {} ({}) SELECT {} FROM {}",
        quote_ident(table),
        names.join(", "),
        casts.join(", "),
        quote_ident(stage)
    )
}

/// Audit log table
pub fn create_audit_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    \"timestamp\" TIMESTAMP,\n    load_run_id VARCHAR,\n    severity VARCHAR,\n    message VARCHAR\n)",
        quote_ident(table)
    )
}

pub fn insert_audit_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} VALUES (CAST(? AS TIMESTAMP), ?, ?, ?)",
        quote_ident(table)
    )
}
