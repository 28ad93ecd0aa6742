//! Streaming CSV reader over a [`SourceFile`]

use super::types::{Encoding, SourceFile};
use crate::error::{Error, Result};
use csv::{ByteRecord, ReaderBuilder};
use std::fs::File;

/// One data row of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    /// One-based line number where the record starts
    pub line: u64,
    /// Decoded field values
    pub fields: Vec<String>,
}

/// Reads the header and data rows of a delimited file
///
/// Rows whose field count differs from the header are returned as-is;
/// callers decide whether to skip or reject them.
pub struct CsvReader {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    encoding: Encoding,
    path: String,
    record: ByteRecord,
}

impl std::fmt::Debug for CsvReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvReader")
            .field("path", &self.path)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl CsvReader {
    /// Open a source file and read its header row
    pub fn open(source: &SourceFile) -> Result<Self> {
        let path = source.display();
        let mut reader = ReaderBuilder::new()
            .delimiter(source.format.delimiter)
            .quote(source.format.quote)
            .has_headers(true)
            .flexible(true)
            .from_path(&source.path)
            .map_err(|e| Error::file_read(&path, e.to_string()))?;

        let raw_headers = reader
            .byte_headers()
            .map_err(|e| Error::file_read(&path, e.to_string()))?
            .clone();
        if raw_headers.is_empty() {
            return Err(Error::file_read(&path, "missing header row"));
        }

        let headers = raw_headers
            .iter()
            .map(|field| decode(field, source.format.encoding, &path, 1))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            reader,
            headers,
            encoding: source.format.encoding,
            path,
            record: ByteRecord::new(),
        })
    }

    /// Header names as they appear in the file
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Read the next data row
    pub fn next_row(&mut self) -> Result<Option<SourceRow>> {
        let more = self
            .reader
            .read_byte_record(&mut self.record)
            .map_err(|e| Error::file_read(&self.path, e.to_string()))?;
        if !more {
            return Ok(None);
        }

        let line = self.record.position().map_or(0, csv::Position::line);
        let fields = self
            .record
            .iter()
            .map(|field| decode(field, self.encoding, &self.path, line))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(SourceRow { line, fields }))
    }
}

impl Iterator for CsvReader {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

fn decode(bytes: &[u8], encoding: Encoding, path: &str, line: u64) -> Result<String> {
    match encoding {
        Encoding::Utf8 => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| Error::file_read(path, format!("invalid UTF-8 at line {line}: {e}"))),
        Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}
