use std::borrow::Cow;

use encoding_rs::{SHIFT_JIS, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::google::{FileStore, SheetWriter, sheets::column_letter};
use crate::model::layout::SheetLayout;

/// Display format applied to duration columns after the write.
pub const DURATION_PATTERN: &str = "[h]:mm:ss";

static TIME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}):(\d{2})").expect("valid regex"));

/// Rewrites `H:MM` durations (1-3 hour digits) to `H:MM:00` so the sheet
/// reads them as elapsed time.
///
/// Quote characters left over from the export are stripped first. Values
/// that do not start with a duration come back quote-stripped and otherwise
/// untouched, including plain numbers.
pub fn normalize_time_cell(value: &str) -> String {
    let value = value.replace('\'', "");
    match TIME_PREFIX.captures(&value) {
        Some(caps) => format!("{}:{}:00", &caps[1], &caps[2]),
        None => value,
    }
}

/// Decodes an export: UTF-8 (BOM optional) when valid, otherwise CP932.
///
/// Returns the text and the name of the encoding used.
pub fn decode_timesheet(bytes: &[u8]) -> AppResult<(String, &'static str)> {
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(
        bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes),
    ) {
        return Ok((text.into_owned(), UTF_8.name()));
    }
    match SHIFT_JIS.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => Ok((Cow::into_owned(text), SHIFT_JIS.name())),
        None => Err(AppError::Decode(
            "timesheet as UTF-8 or Shift_JIS (CP932)".to_string(),
        )),
    }
}

/// Header row plus data rows; short records are padded with blanks.
pub fn parse_timesheet(text: &str) -> AppResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::Decode(format!("CSV header: {e}")))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| AppError::Decode(format!("CSV row {}: {e}", line + 2)))?;
        let mut row: Vec<String> = record.iter().map(String::from).collect();
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        rows.push(row);
    }
    Ok((headers, rows))
}

/// Outcome of one import run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImportReport {
    pub file_id: String,
    pub filename: String,
    pub encoding: String,
    pub sheet: String,
    /// Data rows written, header excluded.
    pub rows: usize,
    /// A1 ranges that received the duration format.
    pub formatted_ranges: Vec<String>,
}

/// Full-overwrite import of a Drive CSV into the staging sheet.
#[instrument(name = "import_timesheet", skip(store, writer, layout))]
pub async fn run_import(
    store: &dyn FileStore,
    writer: &dyn SheetWriter,
    folder_id: &str,
    filename: &str,
    layout: &SheetLayout,
) -> AppResult<ImportReport> {
    if folder_id.trim().is_empty() {
        return Err(AppError::BadRequest("DRIVE_FOLDER_ID is not configured".into()));
    }

    let matches = store.find_by_name(folder_id, filename).await?;
    let Some(file) = matches.first() else {
        warn!(filename, "timesheet not found");
        return Err(AppError::FileNotFound(filename.to_string()));
    };
    if matches.len() > 1 {
        warn!(filename, count = matches.len(), "several files share the name, using the first");
    }
    info!(file_id = %file.id, "timesheet found");

    let bytes = store.download(&file.id).await?;
    let (text, encoding) = decode_timesheet(&bytes)?;
    let (headers, rows) = parse_timesheet(&text)?;

    let duration_columns: Vec<usize> = layout
        .time_columns
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == name))
        .collect();

    let mut values: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    values.push(headers.iter().map(|h| normalize_time_cell(h)).collect());
    values.extend(
        rows.iter()
            .map(|row| row.iter().map(|cell| normalize_time_cell(cell)).collect()),
    );

    let sheet = &layout.staging_sheet;
    writer.clear(sheet).await?;
    writer.write_rows(sheet, &values).await?;

    let mut formatted_ranges = Vec::new();
    if !rows.is_empty() && !duration_columns.is_empty() {
        let last_row = rows.len() + 1;
        writer
            .format_duration_columns(sheet, &duration_columns, 2, last_row, DURATION_PATTERN)
            .await?;
        formatted_ranges = duration_columns
            .iter()
            .map(|&col| {
                let letter = column_letter(col);
                format!("{letter}2:{letter}{last_row}")
            })
            .collect();
    }

    info!(rows = rows.len(), encoding, "staging sheet replaced");

    Ok(ImportReport {
        file_id: file.id.clone(),
        filename: file.name.clone(),
        encoding: encoding.to_string(),
        sheet: sheet.clone(),
        rows: rows.len(),
        formatted_ranges,
    })
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::AppResult;
    use crate::google::{DriveFile, FileStore, SheetWriter};

    #[derive(Default)]
    pub struct FakeDrive {
        pub files: Vec<(DriveFile, Vec<u8>)>,
    }

    #[async_trait]
    impl FileStore for FakeDrive {
        async fn find_by_name(&self, _folder_id: &str, name: &str) -> AppResult<Vec<DriveFile>> {
            Ok(self
                .files
                .iter()
                .filter(|(f, _)| f.name == name)
                .map(|(f, _)| f.clone())
                .collect())
        }

        async fn download(&self, file_id: &str) -> AppResult<Vec<u8>> {
            Ok(self
                .files
                .iter()
                .find(|(f, _)| f.id == file_id)
                .map(|(_, bytes)| bytes.clone())
                .unwrap_or_default())
        }
    }

    /// Records every call in order.
    #[derive(Default)]
    pub struct RecordingSheet {
        pub calls: Mutex<Vec<String>>,
        pub written: Mutex<Vec<Vec<String>>>,
        pub formatted: Mutex<Vec<(Vec<usize>, usize, usize, String)>>,
    }

    #[async_trait]
    impl SheetWriter for RecordingSheet {
        async fn clear(&self, sheet: &str) -> AppResult<()> {
            self.calls.lock().unwrap().push(format!("clear {sheet}"));
            Ok(())
        }

        async fn write_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
            self.calls.lock().unwrap().push(format!("write {sheet}"));
            *self.written.lock().unwrap() = rows.to_vec();
            Ok(())
        }

        async fn format_duration_columns(
            &self,
            sheet: &str,
            columns: &[usize],
            first_row: usize,
            last_row: usize,
            pattern: &str,
        ) -> AppResult<()> {
            self.calls.lock().unwrap().push(format!("format {sheet}"));
            self.formatted
                .lock()
                .unwrap()
                .push((columns.to_vec(), first_row, last_row, pattern.to_string()));
            Ok(())
        }
    }

    pub fn csv_file(name: &str, bytes: Vec<u8>) -> (DriveFile, Vec<u8>) {
        (
            DriveFile {
                id: format!("id-{name}"),
                name: name.to_string(),
            },
            bytes,
        )
    }
}
