//! Type profiling and reconciliation tests

use super::*;
use crate::source::SourceRow;
use pretty_assertions::assert_eq;

fn markers() -> Vec<String> {
    vec!["NULL".to_string(), "\\N".to_string()]
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn rows(data: &[&[&str]]) -> Vec<crate::Result<SourceRow>> {
    data.iter()
        .enumerate()
        .map(|(i, fields)| {
            Ok(SourceRow {
                line: i as u64 + 2,
                fields: fields.iter().map(|s| s.to_string()).collect(),
            })
        })
        .collect()
}

fn profile(names: &[&str], data: &[&[&str]]) -> ProfileReport {
    TypeProfiler::new()
        .profile_rows(&headers(names), rows(data), &markers())
        .unwrap()
}

fn schema(columns: &[(&str, ColumnType, bool)]) -> TableSchema {
    TableSchema::from_columns(
        columns
            .iter()
            .map(|(name, ty, nullable)| ColumnDef::new(*name, *ty, *nullable)),
    )
    .unwrap()
}

// ============================================================================
// Column Type Tests
// ============================================================================

#[test]
fn test_join_is_never_narrower() {
    let types = [
        ColumnType::Boolean,
        ColumnType::Integer,
        ColumnType::Decimal { scale: 2 },
        ColumnType::Date,
        ColumnType::Timestamp,
        ColumnType::String,
    ];
    for a in types {
        for b in types {
            let joined = a.join(b);
            assert!(joined.accepts(&a), "{joined} must accept {a}");
            assert!(joined.accepts(&b), "{joined} must accept {b}");
            assert!(joined.rank() >= a.rank().max(b.rank()));
            assert_eq!(joined, b.join(a));
        }
    }
}

#[test]
fn test_join_examples() {
    assert_eq!(
        ColumnType::Integer.join(ColumnType::Decimal { scale: 3 }),
        ColumnType::Decimal { scale: 3 }
    );
    assert_eq!(
        ColumnType::Decimal { scale: 1 }.join(ColumnType::Decimal { scale: 4 }),
        ColumnType::Decimal { scale: 4 }
    );
    assert_eq!(ColumnType::Date.join(ColumnType::Timestamp), ColumnType::Timestamp);
    assert_eq!(ColumnType::Boolean.join(ColumnType::Integer), ColumnType::String);
    assert_eq!(ColumnType::Integer.join(ColumnType::Date), ColumnType::String);
}

#[test]
fn test_join_decimal_too_scaled_for_bigint() {
    let scaled = ColumnType::Decimal { scale: 20 };
    assert!(!scaled.accepts(&ColumnType::Integer));
    assert_eq!(ColumnType::Integer.join(scaled), ColumnType::String);
    assert_eq!(
        ColumnType::Integer.join(ColumnType::Decimal { scale: 19 }),
        ColumnType::Decimal { scale: 19 }
    );

    assert!(scaled.holds_integer_digits(18));
    assert!(!scaled.holds_integer_digits(19));
    assert!(ColumnType::Integer.holds_integer_digits(40));
}

#[test]
fn test_column_type_sql_round_trip() {
    assert_eq!(ColumnType::from_sql("BIGINT"), Some(ColumnType::Integer));
    assert_eq!(ColumnType::from_sql("integer"), Some(ColumnType::Integer));
    assert_eq!(
        ColumnType::from_sql("DECIMAL(38,4)"),
        Some(ColumnType::Decimal { scale: 4 })
    );
    assert_eq!(
        ColumnType::from_sql("TIMESTAMP WITH TIME ZONE"),
        Some(ColumnType::Timestamp)
    );
    assert_eq!(ColumnType::from_sql("VARCHAR"), Some(ColumnType::String));
    assert_eq!(ColumnType::from_sql("BLOB"), None);

    let ty = ColumnType::Decimal { scale: 2 };
    assert_eq!(ColumnType::from_sql(&ty.sql_type()), Some(ty));
}

#[test]
fn test_column_type_serde() {
    let json = serde_json::to_string(&ColumnType::Decimal { scale: 2 }).unwrap();
    assert_eq!(json, "\"DECIMAL(38, 2)\"");

    let parsed: ColumnType = serde_json::from_str("\"STRING\"").unwrap();
    assert_eq!(parsed, ColumnType::String);
}

#[test]
fn test_table_schema_rejects_duplicates() {
    let result = TableSchema::from_columns([
        ColumnDef::new("id", ColumnType::Integer, false),
        ColumnDef::new("ID", ColumnType::String, true),
    ]);
    assert!(result.is_err());
}

// ============================================================================
// Type Profiler Tests
// ============================================================================

#[test]
fn test_profile_one_profile_per_field() {
    let report = profile(
        &["id", "price", "active", "day", "seen_at", "name"],
        &[
            &["1", "9.99", "true", "2024-01-01", "2024-01-01 10:00:00", "a"],
            &["2", "10.5", "no", "01/02/2024", "2024-01-02T11:30:00", "b"],
        ],
    );

    let types: Vec<(String, ColumnType)> = report
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.column_type))
        .collect();
    assert_eq!(
        types,
        vec![
            ("id".to_string(), ColumnType::Integer),
            ("price".to_string(), ColumnType::Decimal { scale: 2 }),
            ("active".to_string(), ColumnType::Boolean),
            ("day".to_string(), ColumnType::Date),
            ("seen_at".to_string(), ColumnType::Timestamp),
            ("name".to_string(), ColumnType::String),
        ]
    );
    assert_eq!(report.rows_sampled, 2);
    assert!(report.fields.iter().all(|f| f.sampled == 2 && !f.nullable));
}

#[test]
fn test_profile_leading_zeros_infer_string() {
    let report = profile(&["code"], &[&["007"], &["042"]]);

    let field = report.field("code").unwrap();
    assert_eq!(field.column_type, ColumnType::String);
    assert!(report.widenings.is_empty());
}

#[test]
fn test_profile_all_empty_is_nullable_string() {
    let report = profile(&["id", "blank"], &[&["1", ""], &["2", "NULL"], &["3", "  "]]);

    let field = report.field("blank").unwrap();
    assert_eq!(field.column_type, ColumnType::String);
    assert!(field.nullable);
    assert_eq!(field.nulls, 3);
    assert!(field.is_empty());

    assert_eq!(report.schema_without_empty().names(), vec!["id"]);
}

#[test]
fn test_profile_nulls_do_not_affect_type() {
    let report = profile(&["qty"], &[&["1"], &[""], &["\\N"], &["3"]]);

    let field = report.field("qty").unwrap();
    assert_eq!(field.column_type, ColumnType::Integer);
    assert!(field.nullable);
    assert_eq!(field.non_null(), 2);
}

#[test]
fn test_profile_widening_is_monotonic_and_recorded() {
    let report = profile(
        &["amount"],
        &[&["1"], &["2.5"], &["3"], &["n/a"], &["4"]],
    );

    let field = report.field("amount").unwrap();
    assert_eq!(field.column_type, ColumnType::String);

    let steps: Vec<(ColumnType, ColumnType, u64)> = report
        .widenings
        .iter()
        .map(|w| (w.from, w.to, w.line))
        .collect();
    assert_eq!(
        steps,
        vec![
            (ColumnType::Integer, ColumnType::Decimal { scale: 1 }, 3),
            (ColumnType::Decimal { scale: 1 }, ColumnType::String, 5),
        ]
    );
    for w in &report.widenings {
        assert!(w.to.accepts(&w.from));
    }
    assert_eq!(report.widenings[1].value, "n/a");
}

#[test]
fn test_profile_type_never_narrower_than_any_value() {
    let values = ["12", "true", "2024-03-01", "3.25", "", "x"];
    for (i, _) in values.iter().enumerate() {
        let data: Vec<&[&str]> = values[..=i].iter().map(std::slice::from_ref).collect();
        let report = profile(&["v"], &data);
        let inferred = report.fields[0].column_type;
        for value in &values[..=i] {
            if value.is_empty() {
                continue;
            }
            assert!(
                inferred.accepts(&value::classify(value)),
                "{inferred} must accept '{value}'"
            );
        }
    }
}

#[test]
fn test_profile_decimal_precision_overflow_becomes_string() {
    let report = profile(
        &["amt"],
        &[&["1234567890123456789"], &["0.12345678901234567890"]],
    );
    assert_eq!(report.fields[0].column_type, ColumnType::String);
    assert_eq!(report.widenings[0].to, ColumnType::String);

    // Wide integer part first, long fraction later
    let report = profile(
        &["amt"],
        &[&["12345678901234567890123"], &["0.5"], &["0.1234567890123456"]],
    );
    let steps: Vec<(ColumnType, ColumnType)> =
        report.widenings.iter().map(|w| (w.from, w.to)).collect();
    assert_eq!(
        steps,
        vec![
            (ColumnType::Decimal { scale: 0 }, ColumnType::Decimal { scale: 1 }),
            (ColumnType::Decimal { scale: 1 }, ColumnType::String),
        ]
    );
}

#[test]
fn test_profile_decimal_within_precision_stays_decimal() {
    let report = profile(
        &["amt"],
        &[&["123456789012345678901234"], &["0.12345"]],
    );
    assert_eq!(report.fields[0].column_type, ColumnType::Decimal { scale: 5 });
}

#[test]
fn test_profile_boolean_then_integer_becomes_string() {
    let report = profile(&["flag"], &[&["y"], &["1"]]);
    assert_eq!(report.fields[0].column_type, ColumnType::String);
}

#[test]
fn test_profile_skips_malformed_rows() {
    let report = profile(&["a", "b"], &[&["1", "2"], &["oops"], &["3", "4"]]);

    assert_eq!(report.rows_sampled, 2);
    assert_eq!(report.malformed_rows, 1);
    assert_eq!(report.fields[0].column_type, ColumnType::Integer);
}

#[test]
fn test_profile_sample_cap() {
    let data: Vec<&[&str]> = vec![&["1"], &["2"], &["text"]];
    let report = TypeProfiler::new()
        .with_sample_rows(2)
        .profile_rows(&headers(&["v"]), rows(&data), &markers())
        .unwrap();

    assert_eq!(report.rows_sampled, 2);
    assert!(report.truncated);
    assert_eq!(report.fields[0].column_type, ColumnType::Integer);

    let exact = TypeProfiler::new()
        .with_sample_rows(3)
        .profile_rows(&headers(&["v"]), rows(&data), &markers())
        .unwrap();
    assert!(!exact.truncated);
    assert_eq!(exact.fields[0].column_type, ColumnType::String);
}

#[test]
fn test_profile_no_rows() {
    let report = profile(&["a", "b"], &[]);

    assert!(report.has_no_rows());
    assert_eq!(report.fields.len(), 2);
    assert!(report
        .fields
        .iter()
        .all(|f| f.column_type == ColumnType::String && f.nullable));
}

#[test]
fn test_profile_sanitizes_headers() {
    let report = profile(&["Order ID", "order-id", "Amount ($)"], &[&["1", "2", "3"]]);

    assert_eq!(report.schema().names(), vec!["Order_ID", "order_id_2", "Amount_"]);
    assert_eq!(report.fields[2].source_name, "Amount ($)");
}

#[test]
fn test_profile_propagates_read_errors() {
    let mut data = rows(&[&["1"]]);
    data.push(Err(crate::Error::file_read("x.csv", "bad bytes")));

    let result = TypeProfiler::new().profile_rows(&headers(&["v"]), data, &markers());
    assert!(result.is_err());
}

#[test]
fn test_profile_custom_null_markers() {
    let profiler = TypeProfiler::new().with_null_markers(vec!["-".to_string()]);
    let report = profiler
        .profile_rows(&headers(&["v"]), rows(&[&["-"], &["5"]]), &["-".to_string()])
        .unwrap();

    assert_eq!(report.fields[0].column_type, ColumnType::Integer);
    assert!(report.fields[0].nullable);
}

// ============================================================================
// Reconciler Tests
// ============================================================================

#[test]
fn test_reconcile_create_when_absent() {
    let inferred = schema(&[("id", ColumnType::Integer, false)]);

    let plan = reconcile("orders", &inferred, None);

    assert_eq!(plan.action, ReconcileAction::Create);
    assert!(plan.requires_ddl());
    assert!(plan.target.columns().iter().all(|c| c.nullable));
}

#[test]
fn test_reconcile_superset_is_compatible() {
    let inferred = schema(&[
        ("id", ColumnType::Integer, false),
        ("price", ColumnType::Decimal { scale: 2 }, true),
        ("day", ColumnType::Date, true),
    ]);
    let existing = schema(&[
        ("ID", ColumnType::Decimal { scale: 0 }, true),
        ("price", ColumnType::Decimal { scale: 4 }, true),
        ("day", ColumnType::Timestamp, true),
        ("extra", ColumnType::Boolean, false),
    ]);

    let plan = reconcile("orders", &inferred, Some(&existing));

    assert_eq!(plan.action, ReconcileAction::Compatible);
    assert!(!plan.requires_ddl());
    assert_eq!(plan.target, existing);
}

#[test]
fn test_reconcile_exact_match_is_compatible() {
    let inferred = schema(&[
        ("id", ColumnType::Integer, true),
        ("name", ColumnType::String, true),
    ]);

    let plan = reconcile("t", &inferred, Some(&inferred.clone()));

    assert_eq!(plan.action, ReconcileAction::Compatible);
    assert!(plan.alterations.is_empty());
}

#[test]
fn test_reconcile_boolean_vs_string_rejects() {
    let inferred = schema(&[("flag", ColumnType::String, true)]);
    let existing = schema(&[("flag", ColumnType::Boolean, true)]);

    let plan = reconcile("t", &inferred, Some(&existing));

    assert_eq!(plan.action, ReconcileAction::Reject);
    assert!(plan.is_rejected());
    assert!(plan.alterations.is_empty());
    assert_eq!(plan.conflicts.len(), 1);
    assert_eq!(plan.conflict_error().kind(), crate::ErrorKind::SchemaConflict);
}

#[test]
fn test_reconcile_adds_missing_columns() {
    let inferred = schema(&[
        ("id", ColumnType::Integer, false),
        ("note", ColumnType::String, false),
    ]);
    let existing = schema(&[("id", ColumnType::Integer, true)]);

    let plan = reconcile("t", &inferred, Some(&existing));

    assert_eq!(plan.action, ReconcileAction::Widen);
    assert_eq!(
        plan.alterations,
        vec![Alteration::AddColumn(ColumnDef::new(
            "note",
            ColumnType::String,
            true
        ))]
    );
    assert_eq!(plan.target.names(), vec!["id", "note"]);
}

#[test]
fn test_reconcile_widens_columns() {
    let inferred = schema(&[
        ("qty", ColumnType::Decimal { scale: 2 }, true),
        ("seen", ColumnType::Timestamp, true),
    ]);
    let existing = schema(&[
        ("qty", ColumnType::Integer, true),
        ("seen", ColumnType::Date, true),
    ]);

    let plan = reconcile("t", &inferred, Some(&existing));

    assert_eq!(plan.action, ReconcileAction::Widen);
    assert_eq!(plan.alterations.len(), 2);
    assert_eq!(
        plan.target.get("qty").unwrap().column_type,
        ColumnType::Decimal { scale: 2 }
    );
    assert_eq!(plan.target.get("seen").unwrap().column_type, ColumnType::Timestamp);
}

#[test]
fn test_reconcile_integer_into_wide_scale_decimal_rejects() {
    let inferred = schema(&[("qty", ColumnType::Integer, true)]);
    let existing = schema(&[("qty", ColumnType::Decimal { scale: 25 }, true)]);

    let plan = reconcile("t", &inferred, Some(&existing));

    assert_eq!(plan.action, ReconcileAction::Reject);
    assert_eq!(plan.conflicts[0].column, "qty");
}

#[test]
fn test_reconcile_nulls_into_not_null_rejects() {
    let inferred = schema(&[("id", ColumnType::Integer, true)]);
    let existing = schema(&[("id", ColumnType::Integer, false)]);

    let plan = reconcile("t", &inferred, Some(&existing));

    assert_eq!(plan.action, ReconcileAction::Reject);
}

#[test]
fn test_reconcile_reject_wins_over_widen() {
    let inferred = schema(&[
        ("new_col", ColumnType::String, true),
        ("day", ColumnType::Integer, true),
    ]);
    let existing = schema(&[("day", ColumnType::Date, true)]);

    let plan = reconcile("t", &inferred, Some(&existing));

    assert_eq!(plan.action, ReconcileAction::Reject);
    assert!(plan.alterations.is_empty());
    assert_eq!(plan.target, existing);
}

#[test]
fn test_reconcile_after_create_is_compatible() {
    let report = profile(&["id", "amount"], &[&["1", "2.50"], &["2", ""]]);
    let inferred = report.schema();

    let created = reconcile("t", &inferred, None);
    let rerun = reconcile("t", &inferred, Some(&created.target));

    assert_eq!(rerun.action, ReconcileAction::Compatible);
}
