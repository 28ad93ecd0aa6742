//! Type profiling of delimited files

use super::names::unique_column_names;
use super::types::{ColumnType, FieldProfile, ProfileReport, Widening};
use super::value::{classify, integer_digits, is_null};
use crate::error::Result;
use crate::source::{CsvReader, SourceFile, SourceRow};

/// Default row cap for sampling
pub const DEFAULT_SAMPLE_ROWS: usize = 100_000;

/// Infers the narrowest safe column type of every field of a file
#[derive(Debug, Clone)]
pub struct TypeProfiler {
    /// Maximum data rows to sample (0 = whole file)
    sample_rows: usize,
    /// Values treated as NULL, replacing the file's own markers when set
    null_markers: Option<Vec<String>>,
}

impl Default for TypeProfiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Running state of one field while sampling
#[derive(Debug)]
struct FieldState {
    name: String,
    source_name: String,
    running: Option<ColumnType>,
    /// Widest integer part of any numeric value seen
    integer_digits: usize,
    sampled: usize,
    nulls: usize,
}

impl TypeProfiler {
    /// Create a profiler with the default row cap
    pub fn new() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            null_markers: None,
        }
    }

    /// Set the row cap (0 samples the whole file)
    #[must_use]
    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows;
        self
    }

    /// Override the null markers of the file format
    #[must_use]
    pub fn with_null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = Some(markers);
        self
    }

    /// Row cap in effect
    pub fn sample_rows(&self) -> usize {
        self.sample_rows
    }

    /// Profile a source file
    ///
    /// Fails only when the file cannot be read or decoded.
    pub fn profile(&self, source: &SourceFile) -> Result<ProfileReport> {
        let reader = CsvReader::open(source)?;
        let headers = reader.headers().to_vec();
        let markers = self
            .null_markers
            .clone()
            .unwrap_or_else(|| source.format.null_markers.clone());

        tracing::debug!(
            file = %source.display(),
            fields = headers.len(),
            sample_rows = self.sample_rows,
            "Profiling source file"
        );

        let report = self.profile_rows(&headers, reader, &markers)?;

        tracing::info!(
            file = %source.display(),
            fields = report.fields.len(),
            rows_sampled = report.rows_sampled,
            malformed_rows = report.malformed_rows,
            truncated = report.truncated,
            "Profiled source file"
        );
        Ok(report)
    }

    /// Profile rows that have already been split into fields
    ///
    /// Rows whose field count differs from the header are skipped and
    /// counted as malformed.
    pub fn profile_rows<I>(
        &self,
        headers: &[String],
        rows: I,
        null_markers: &[String],
    ) -> Result<ProfileReport>
    where
        I: IntoIterator<Item = Result<SourceRow>>,
    {
        let mut fields: Vec<FieldState> = unique_column_names(headers)
            .into_iter()
            .zip(headers)
            .map(|(name, source_name)| FieldState {
                name,
                source_name: source_name.clone(),
                running: None,
                integer_digits: 0,
                sampled: 0,
                nulls: 0,
            })
            .collect();

        let mut report = ProfileReport::default();
        let mut rows = rows.into_iter();

        while let Some(row) = rows.next() {
            let row = row?;
            if row.fields.len() != fields.len() {
                tracing::trace!(
                    line = row.line,
                    expected = fields.len(),
                    actual = row.fields.len(),
                    "Skipping malformed row"
                );
                report.malformed_rows += 1;
                continue;
            }

            for (state, value) in fields.iter_mut().zip(&row.fields) {
                state.sampled += 1;
                if is_null(value, null_markers) {
                    state.nulls += 1;
                    continue;
                }

                let seen = classify(value);
                if matches!(seen, ColumnType::Integer | ColumnType::Decimal { .. }) {
                    state.integer_digits = state.integer_digits.max(integer_digits(value));
                }
                let Some(current) = state.running else {
                    state.running = Some(seen);
                    continue;
                };

                let mut widened = current.join(seen);
                if !widened.holds_integer_digits(state.integer_digits) {
                    widened = ColumnType::String;
                }
                if widened != current {
                    tracing::trace!(
                        field = %state.name,
                        from = %current,
                        to = %widened,
                        line = row.line,
                        "Widening field type"
                    );
                    report.widenings.push(Widening {
                        field: state.name.clone(),
                        from: current,
                        to: widened,
                        line: row.line,
                        value: value.clone(),
                    });
                    state.running = Some(widened);
                }
            }

            report.rows_sampled += 1;
            if self.sample_rows > 0 && report.rows_sampled >= self.sample_rows {
                report.truncated = rows.next().is_some();
                break;
            }
        }

        report.fields = fields
            .into_iter()
            .enumerate()
            .map(|(ordinal, state)| FieldProfile {
                nullable: state.nulls > 0 || state.running.is_none(),
                column_type: state.running.unwrap_or(ColumnType::String),
                name: state.name,
                source_name: state.source_name,
                ordinal,
                sampled: state.sampled,
                nulls: state.nulls,
            })
            .collect();

        Ok(report)
    }
}
