//! Conversion of source rows into destination values

use super::types::{ColumnMapping, RowRejection};
use crate::schema::value::{canonicalize, is_null};
use crate::source::SourceRow;

/// Convert one row into canonical values for `columns`
///
/// `width` is the header's field count; rows of any other width are
/// rejected whole. `None` stands for SQL NULL.
pub fn convert_row(
    row: &SourceRow,
    width: usize,
    columns: &[ColumnMapping],
    null_markers: &[String],
) -> Result<Vec<Option<String>>, RowRejection> {
    if row.fields.len() != width {
        return Err(RowRejection {
            line: row.line,
            column: None,
            value: None,
            reason: format!("expected {width} fields, found {}", row.fields.len()),
        });
    }

    columns
        .iter()
        .map(|mapping| {
            let raw = &row.fields[mapping.field_index];
            let column = &mapping.column;

            if is_null(raw, null_markers) {
                return if column.nullable {
                    Ok(None)
                } else {
                    Err(RowRejection {
                        line: row.line,
                        column: Some(column.name.clone()),
                        value: Some(raw.clone()),
                        reason: "NULL in a NOT NULL column".to_string(),
                    })
                };
            }

            canonicalize(raw, &column.column_type)
                .map(Some)
                .map_err(|reason| RowRejection {
                    line: row.line,
                    column: Some(column.name.clone()),
                    value: Some(raw.clone()),
                    reason,
                })
        })
        .collect()
}
