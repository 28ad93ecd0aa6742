//! Schema reconciliation
//!
//! Compares an inferred schema with the destination table and decides what
//! DDL, if any, must run before the load. Pure: nothing here touches the
//! warehouse.

use super::types::{ColumnDef, ColumnType, TableSchema, MAX_SCALE_FOR_INTEGER};
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Decision for one file against its destination table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReconcileAction {
    /// Table does not exist yet
    Create,
    /// Existing table accepts the data as-is
    Compatible,
    /// Existing table needs added or widened columns first
    Widen,
    /// Existing table cannot accept the data
    Reject,
}

impl std::fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReconcileAction::Create => "CREATE",
            ReconcileAction::Compatible => "COMPATIBLE",
            ReconcileAction::Widen => "WIDEN",
            ReconcileAction::Reject => "REJECT",
        };
        f.write_str(name)
    }
}

/// One structural change to an existing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alteration {
    /// Add a nullable column
    AddColumn(ColumnDef),
    /// Change a column to a wider type
    WidenColumn {
        name: String,
        from: ColumnType,
        to: ColumnType,
    },
}

impl std::fmt::Display for Alteration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alteration::AddColumn(column) => {
                write!(f, "add column {} {}", column.name, column.column_type)
            }
            Alteration::WidenColumn { name, from, to } => {
                write!(f, "widen column {name} {from} -> {to}")
            }
        }
    }
}

/// An existing column that cannot take the inferred data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub column: String,
    pub existing: ColumnType,
    pub inferred: ColumnType,
    pub reason: String,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "column '{}' is {} but data is {}: {}",
            self.column, self.existing, self.inferred, self.reason
        )
    }
}

/// Outcome of reconciliation, handed to the load executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    /// Destination table
    pub table: String,
    /// Decision
    pub action: ReconcileAction,
    /// Destination schema once the plan is applied
    pub target: TableSchema,
    /// Changes to an existing table, in column order
    pub alterations: Vec<Alteration>,
    /// Reasons for a rejection
    pub conflicts: Vec<Conflict>,
}

impl ReconcilePlan {
    /// Whether the plan issues any DDL
    pub fn requires_ddl(&self) -> bool {
        matches!(self.action, ReconcileAction::Create) || !self.alterations.is_empty()
    }

    /// Whether the plan was rejected
    pub fn is_rejected(&self) -> bool {
        matches!(self.action, ReconcileAction::Reject)
    }

    /// Schema conflict error describing a rejected plan
    pub fn conflict_error(&self) -> Error {
        let message = self
            .conflicts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Error::schema_conflict(&self.table, message)
    }
}

/// Decide how `inferred` fits the destination table
///
/// * no table: CREATE with every column nullable
/// * every inferred column accepted as-is: COMPATIBLE
/// * missing columns or lossless widenings only: WIDEN
/// * any column without a lossless path: REJECT
///
/// Destination columns absent from the file are never touched.
pub fn reconcile(
    table: &str,
    inferred: &TableSchema,
    existing: Option<&TableSchema>,
) -> ReconcilePlan {
    let Some(existing) = existing else {
        let target = TableSchema::from_columns(
            inferred
                .columns()
                .iter()
                .map(|c| ColumnDef::new(c.name.clone(), c.column_type, true)),
        )
        .unwrap_or_else(|_| inferred.clone());

        return ReconcilePlan {
            table: table.to_string(),
            action: ReconcileAction::Create,
            target,
            alterations: Vec::new(),
            conflicts: Vec::new(),
        };
    };

    let mut target = existing.clone();
    let mut alterations = Vec::new();
    let mut conflicts = Vec::new();

    for column in inferred.columns() {
        let Some(current) = existing.get(&column.name) else {
            let added = ColumnDef::new(column.name.clone(), column.column_type, true);
            alterations.push(Alteration::AddColumn(added.clone()));
            // Names in `inferred` are unique, so the push cannot collide
            let _ = target.push(added);
            continue;
        };

        if column.nullable && !current.nullable {
            conflicts.push(Conflict {
                column: current.name.clone(),
                existing: current.column_type,
                inferred: column.column_type,
                reason: "column is NOT NULL but the data has nulls".to_string(),
            });
            continue;
        }

        if current.column_type.accepts(&column.column_type) {
            continue;
        }

        if let Some(to) = widening_path(current.column_type, column.column_type) {
            alterations.push(Alteration::WidenColumn {
                name: current.name.clone(),
                from: current.column_type,
                to,
            });
            if let Some(target_column) = target.get_mut(&current.name) {
                target_column.column_type = to;
            }
            continue;
        }

        conflicts.push(Conflict {
            column: current.name.clone(),
            existing: current.column_type,
            inferred: column.column_type,
            reason: "no lossless widening path".to_string(),
        });
    }

    let action = if !conflicts.is_empty() {
        ReconcileAction::Reject
    } else if !alterations.is_empty() {
        ReconcileAction::Widen
    } else {
        ReconcileAction::Compatible
    };

    tracing::debug!(
        table,
        %action,
        alterations = alterations.len(),
        conflicts = conflicts.len(),
        "Reconciled schema"
    );

    if action == ReconcileAction::Reject {
        target = existing.clone();
        alterations.clear();
    }

    ReconcilePlan {
        table: table.to_string(),
        action,
        target,
        alterations,
        conflicts,
    }
}

/// Type an existing column can be altered to so it holds `inferred` values
///
/// Only INTEGER to DECIMAL, DECIMAL to a larger scale and DATE to TIMESTAMP
/// qualify.
fn widening_path(existing: ColumnType, inferred: ColumnType) -> Option<ColumnType> {
    match (existing, inferred) {
        (ColumnType::Integer, ColumnType::Decimal { scale }) if scale <= MAX_SCALE_FOR_INTEGER => {
            Some(ColumnType::Decimal { scale })
        }
        (ColumnType::Decimal { scale: a }, ColumnType::Decimal { scale: b }) if b > a => {
            Some(ColumnType::Decimal { scale: b })
        }
        (ColumnType::Date, ColumnType::Timestamp) => Some(ColumnType::Timestamp),
        _ => None,
    }
}
