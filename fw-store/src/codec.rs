//! JSON and CSV persistence
//!
//! Saves are upserts: an existing record is backed up and replaced.

use fw_core::{DataFormat, FwError, FwResult, StorePath};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::FileStore;

/// CSV content split into an optional header row and data rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvTable {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { header: None, rows }
    }

    pub fn with_header(mut self, header: Vec<String>) -> Self {
        self.header = Some(header);
        self
    }
}

impl FileStore {
    pub fn save_json<T: Serialize + ?Sized>(
        &self,
        filename: &str,
        data: &T,
        subdir: Option<&str>,
    ) -> FwResult<StorePath> {
        let encoded = encode_json(data, self.config.json_indent)?;
        self.upsert(filename, &encoded, subdir)
    }

    pub fn load_json(&self, filename: &str, subdir: Option<&str>) -> FwResult<Value> {
        self.load_json_as(filename, subdir)
    }

    pub fn load_json_as<T: DeserializeOwned>(
        &self,
        filename: &str,
        subdir: Option<&str>,
    ) -> FwResult<T> {
        let data = self.read(filename, subdir)?;
        let value = serde_json::from_slice(&data).map_err(|e| FwError::decode(DataFormat::Json, e))?;
        debug!(file = filename, "JSON loaded");
        Ok(value)
    }

    pub fn save_csv(
        &self,
        filename: &str,
        rows: &[Vec<String>],
        header: Option<&[String]>,
        subdir: Option<&str>,
    ) -> FwResult<StorePath> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());

        if let Some(header) = header {
            writer.write_record(header).map_err(csv_error)?;
        }
        for row in rows {
            writer.write_record(row).map_err(csv_error)?;
        }
        let encoded = writer.into_inner().map_err(|e| FwError::Io(e.into_error()))?;

        self.upsert(filename, &encoded, subdir)
    }

    pub fn save_csv_table(
        &self,
        filename: &str,
        table: &CsvTable,
        subdir: Option<&str>,
    ) -> FwResult<StorePath> {
        self.save_csv(filename, &table.rows, table.header.as_deref(), subdir)
    }

    /// Every line of the file as a row, header included. A blank line is an
    /// empty row.
    pub fn load_csv(&self, filename: &str, subdir: Option<&str>) -> FwResult<Vec<Vec<String>>> {
        let data = self.read(filename, subdir)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&data[..]);

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let start = record_start(&record).map_or(data.len(), |s| s.min(data.len()));
            records.push((start, record));
        }

        let first = records.first().map_or(data.len(), |(start, _)| *start);
        let mut rows = vec![Vec::new(); line_breaks_at_end(&data[..first])];
        for (index, (start, record)) in records.iter().enumerate() {
            let end = records.get(index + 1).map_or(data.len(), |(next, _)| *next);
            let segment = &data[*start..end.max(*start)];

            if is_blank_line(segment, record) {
                rows.push(Vec::new());
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
            // Blank lines the reader stepped over
            let skipped = line_breaks_at_end(segment).saturating_sub(1);
            rows.extend(std::iter::repeat_with(Vec::new).take(skipped));
        }

        debug!(file = filename, rows = rows.len(), "CSV loaded");
        Ok(rows)
    }

    /// Load a CSV file, splitting off the first row when `has_header` is set.
    pub fn load_csv_table(
        &self,
        filename: &str,
        has_header: bool,
        subdir: Option<&str>,
    ) -> FwResult<CsvTable> {
        let mut rows = self.load_csv(filename, subdir)?;
        let header = if has_header && !rows.is_empty() {
            Some(rows.remove(0))
        } else {
            None
        };
        Ok(CsvTable { header, rows })
    }
}

fn encode_json<T: Serialize + ?Sized>(data: &T, indent: usize) -> FwResult<Vec<u8>> {
    let mut buf = Vec::new();
    let result = if indent == 0 {
        serde_json::to_writer(&mut buf, data)
    } else {
        let indent = vec![b' '; indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        data.serialize(&mut ser)
    };
    result.map_err(|e| FwError::decode(DataFormat::Json, e))?;
    Ok(buf)
}

fn record_start(record: &csv::StringRecord) -> Option<usize> {
    record
        .position()
        .and_then(|position| usize::try_from(position.byte()).ok())
}

/// A lone empty field read from a bare line terminator is an empty row; a
/// quoted `""` is a row holding one empty field.
fn is_blank_line(segment: &[u8], record: &csv::StringRecord) -> bool {
    record.len() == 1
        && record[0].is_empty()
        && matches!(segment.first(), None | Some(b'\n' | b'\r'))
}

/// Number of line terminators (`\n`, `\r` or `\r\n`) ending `bytes`.
fn line_breaks_at_end(bytes: &[u8]) -> usize {
    let mut count = 0;
    let mut end = bytes.len();
    while end > 0 {
        match bytes[end - 1] {
            b'\n' => {
                end -= 1;
                if end > 0 && bytes[end - 1] == b'\r' {
                    end -= 1;
                }
            }
            b'\r' => end -= 1,
            _ => break,
        }
        count += 1;
    }
    count
}

fn csv_error(err: csv::Error) -> FwError {
    if !err.is_io_error() {
        return FwError::decode(DataFormat::Csv, err);
    }
    match err.into_kind() {
        csv::ErrorKind::Io(e) => FwError::Io(e),
        other => FwError::decode(DataFormat::Csv, format!("{other:?}")),
    }
}
