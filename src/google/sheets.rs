use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{SHEETS_API, TokenProvider, error_body};
use crate::error::{AppError, AppResult};

static SPREADSHEET_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("valid regex"));

/// Extracts the spreadsheet ID from a share / edit URL. A bare ID is
/// accepted as well.
pub fn spreadsheet_id_from_url(url: &str) -> Option<String> {
    if let Some(caps) = SPREADSHEET_ID.captures(url) {
        return Some(caps[1].to_string());
    }
    let trimmed = url.trim();
    let bare = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    bare.then(|| trimmed.to_string())
}

/// Zero-based column index to A1 letters: 0 → A, 25 → Z, 26 → AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Sheet title quoted for use in an A1 range.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read access to a spreadsheet.
#[async_trait]
pub trait SpreadsheetSource: Send + Sync {
    async fn sheet_titles(&self) -> AppResult<Vec<String>>;

    /// All values of a sheet as displayed, row-major.
    async fn read_values(&self, sheet: &str) -> AppResult<Vec<Vec<String>>>;
}

/// Write access used by the import adapter.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    async fn clear(&self, sheet: &str) -> AppResult<()>;

    /// Writes `rows` starting at A1, parsed as if typed by a user.
    async fn write_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()>;

    /// Applies a TIME number format to the given zero-based columns over the
    /// one-based, inclusive row span.
    async fn format_duration_columns(
        &self,
        sheet: &str,
        columns: &[usize],
        first_row: usize,
        last_row: usize,
        pattern: &str,
    ) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google Sheets v4 client bound to one spreadsheet.
pub struct SheetsClient {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenProvider>, spreadsheet_url: &str) -> AppResult<Self> {
        let spreadsheet_id = spreadsheet_id_from_url(spreadsheet_url).ok_or_else(|| {
            AppError::remote(
                "Google Sheets",
                format!("{spreadsheet_url:?} is not a spreadsheet URL"),
            )
        })?;
        Ok(Self {
            http,
            tokens,
            spreadsheet_id,
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{SHEETS_API}/{}{suffix}", self.spreadsheet_id)
    }

    fn values_url(&self, sheet: &str, action: &str) -> String {
        self.url(&format!(
            "/values/{}{action}",
            urlencoding::encode(&quote_sheet(sheet))
        ))
    }

    /// Turns a non-2xx response into an error naming the likely cause.
    async fn checked(&self, resp: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = error_body(resp).await;
        let hint = match status {
            StatusCode::NOT_FOUND => "spreadsheet not found, check the URL".to_string(),
            StatusCode::FORBIDDEN => format!(
                "permission denied, share the spreadsheet with {}",
                self.tokens.client_email()
            ),
            _ => "request rejected".to_string(),
        };
        Err(AppError::remote("Google Sheets", format!("{hint} ({body})")))
    }

    async fn properties(&self) -> AppResult<Vec<SheetProperties>> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(self.url(""))
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .bearer_auth(token)
            .send()
            .await?;
        let meta: SpreadsheetMeta = self.checked(resp).await?.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn sheet_id(&self, sheet: &str) -> AppResult<i64> {
        self.properties()
            .await?
            .into_iter()
            .find(|p| p.title == sheet)
            .map(|p| p.sheet_id)
            .ok_or_else(|| AppError::MissingSheet(sheet.to_string()))
    }
}

#[async_trait]
impl SpreadsheetSource for SheetsClient {
    async fn sheet_titles(&self) -> AppResult<Vec<String>> {
        Ok(self.properties().await?.into_iter().map(|p| p.title).collect())
    }

    #[instrument(name = "sheets_read", skip(self))]
    async fn read_values(&self, sheet: &str) -> AppResult<Vec<Vec<String>>> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(self.values_url(sheet, ""))
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ])
            .bearer_auth(token)
            .send()
            .await?;
        let range: ValueRange = self.checked(resp).await?.json().await?;
        debug!(rows = range.values.len(), "sheet values fetched");
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

#[async_trait]
impl SheetWriter for SheetsClient {
    #[instrument(name = "sheets_clear", skip(self))]
    async fn clear(&self, sheet: &str) -> AppResult<()> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .post(self.values_url(sheet, ":clear"))
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        self.checked(resp).await?;
        Ok(())
    }

    #[instrument(name = "sheets_write", skip(self, rows), fields(rows = rows.len()))]
    async fn write_rows(&self, sheet: &str, rows: &[Vec<String>]) -> AppResult<()> {
        let token = self.tokens.access_token().await?;
        let range = format!("{}!A1", quote_sheet(sheet));
        let resp = self
            .http
            .put(self.url(&format!("/values/{}", urlencoding::encode(&range))))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(token)
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await?;
        self.checked(resp).await?;
        Ok(())
    }

    #[instrument(name = "sheets_format", skip(self))]
    async fn format_duration_columns(
        &self,
        sheet: &str,
        columns: &[usize],
        first_row: usize,
        last_row: usize,
        pattern: &str,
    ) -> AppResult<()> {
        if columns.is_empty() || last_row < first_row {
            return Ok(());
        }
        let sheet_id = self.sheet_id(sheet).await?;
        let requests: Vec<Value> = columns
            .iter()
            .map(|&col| {
                json!({
                    "repeatCell": {
                        "range": {
                            "sheetId": sheet_id,
                            "startRowIndex": first_row - 1,
                            "endRowIndex": last_row,
                            "startColumnIndex": col,
                            "endColumnIndex": col + 1,
                        },
                        "cell": {
                            "userEnteredFormat": {
                                "numberFormat": { "type": "TIME", "pattern": pattern }
                            }
                        },
                        "fields": "userEnteredFormat.numberFormat",
                    }
                })
            })
            .collect();

        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .post(self.url(":batchUpdate"))
            .bearer_auth(token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        self.checked(resp).await?;
        Ok(())
    }
}
