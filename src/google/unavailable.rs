use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::google::{DriveFile, FileStore, SheetWriter, SpreadsheetSource};

/// Installed in place of the Google clients when no service credential
/// could be resolved at startup. Every call reports the credential problem.
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> AppResult<T> {
        Err(AppError::Credential(self.reason.clone()))
    }
}

#[async_trait]
impl SpreadsheetSource for Unavailable {
    async fn sheet_titles(&self) -> AppResult<Vec<String>> {
        self.fail()
    }

    async fn read_values(&self, _sheet: &str) -> AppResult<Vec<Vec<String>>> {
        self.fail()
    }
}

#[async_trait]
impl SheetWriter for Unavailable {
    async fn clear(&self, _sheet: &str) -> AppResult<()> {
        self.fail()
    }

    async fn write_rows(&self, _sheet: &str, _rows: &[Vec<String>]) -> AppResult<()> {
        self.fail()
    }

    async fn format_duration_columns(
        &self,
        _sheet: &str,
        _columns: &[usize],
        _first_row: usize,
        _last_row: usize,
        _pattern: &str,
    ) -> AppResult<()> {
        self.fail()
    }
}

#[async_trait]
impl FileStore for Unavailable {
    async fn find_by_name(&self, _folder_id: &str, _name: &str) -> AppResult<Vec<DriveFile>> {
        self.fail()
    }

    async fn download(&self, _file_id: &str) -> AppResult<Vec<u8>> {
        self.fail()
    }
}
